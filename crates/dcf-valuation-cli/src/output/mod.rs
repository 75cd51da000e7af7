pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Result fields holding row sets, in the order formatters look for them.
pub(crate) const ROW_SET_KEYS: [&str; 5] = ["scenarios", "rows", "sensitivity", "path", "failures"];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

/// Render a scalar JSON value for a cell; `null` renders as `null_text`.
pub(crate) fn cell_text(value: &Value, null_text: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => null_text.to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// True for a non-empty array whose first element is an object.
pub(crate) fn is_row_set(value: &Value) -> bool {
    matches!(value, Value::Array(items) if matches!(items.first(), Some(Value::Object(_))))
}
