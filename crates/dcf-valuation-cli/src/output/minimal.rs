use serde_json::Value;

use super::cell_text;

/// Print just the key answer from the output.
///
/// Scenario prices print one per line; otherwise the first well-known field
/// present wins, then the first field of the result.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(Value::Array(scenarios)) = result_obj.get("scenarios") {
        for s in scenarios {
            let label = s.get("scenario").map(|v| cell_text(v, "")).unwrap_or_default();
            let price = s.get("dcf_price").map(|v| cell_text(v, "null")).unwrap_or_default();
            println!("{}: {}", label, price);
        }
        return;
    }

    if let Some(Value::Array(path)) = result_obj.get("path") {
        let growth: Vec<String> = path
            .iter()
            .filter_map(|p| p.get("growth"))
            .map(|g| cell_text(g, "null"))
            .collect();
        println!("{}", growth.join(","));
        return;
    }

    let priority_keys = ["dcf_price", "wacc", "valued"];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", cell_text(val, "null"));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, cell_text(val, "null"));
            return;
        }
    }

    println!("{}", cell_text(result_obj, "null"));
}
