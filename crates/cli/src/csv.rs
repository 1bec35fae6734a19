//! CSV emission for preview output.
//!
//! Columns are the union of row field names in first-seen order (row
//! field order is already the plan's output order). Quoting follows
//! RFC 4180: fields containing commas, quotes, or newlines are quoted,
//! with embedded quotes doubled. Null renders empty; nested arrays and
//! objects render as compact JSON.

use serde_json::Value;
use tabula_engine::Row;

/// Render rows as a CSV document with a header line.
pub fn write_rows(rows: &[Row]) -> String {
    let columns = column_order(rows);

    let mut out = String::new();
    out.push_str(
        &columns
            .iter()
            .map(|c| escape(c))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');

    for row in rows {
        let line = columns
            .iter()
            .map(|c| render(row.get(c)))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn column_order(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => escape(s),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(nested @ (Value::Array(_) | Value::Object(_))) => {
            escape(&serde_json::to_string(nested).unwrap_or_default())
        }
    }
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
