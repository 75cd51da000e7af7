use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{cell_text, is_row_set, ROW_SET_KEYS};

/// Format output as tables using the tabled crate.
///
/// Scalar result fields go into one Field/Value table; each row set
/// (scenarios, grid rows, growth path) gets a table of its own.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    if let Value::Object(res_map) = result {
        let scalars: Map<String, Value> = res_map
            .iter()
            .filter(|(_, v)| !is_row_set(v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !scalars.is_empty() {
            print_flat_object(&scalars);
        }
        for key in ROW_SET_KEYS {
            if let Some(Value::Array(rows)) = res_map.get(key) {
                if is_row_set(&res_map[key]) {
                    println!("\n{}:", key);
                    print_array_table(rows);
                }
            }
        }
    } else {
        print_flat_object(envelope);
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        other => cell_text(other, "-"),
    }
}
