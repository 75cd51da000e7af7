use serde_json::Value;
use std::io;

use super::{cell_text, is_row_set, ROW_SET_KEYS};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// The first row set in the result (scenarios, grid rows, growth path) is
/// written as a table; otherwise the result becomes field,value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            let result = map.get("result").unwrap_or(value);
            let row_set = ROW_SET_KEYS
                .iter()
                .filter_map(|key| result.get(*key))
                .find(|v| is_row_set(v));
            match (row_set, result) {
                (Some(Value::Array(rows)), _) => write_array_csv(&mut wtr, rows),
                (_, Value::Object(fields)) => {
                    let _ = wtr.write_record(["field", "value"]);
                    for (key, val) in fields {
                        let _ = wtr.write_record([key.as_str(), &cell_text(val, "")]);
                    }
                }
                _ => {
                    let _ = wtr.write_record([&cell_text(result, "")]);
                }
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&cell_text(value, "")]);
        }
    }

    let _ = wtr.flush();
}

fn write_array_csv(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(|v| cell_text(v, "")).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&cell_text(item, "")]);
        }
    }
}
