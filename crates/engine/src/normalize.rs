//! Shape normalizer: turns a document (or a located part of one) into an
//! ordered sequence of rows plus a representative sample row.
//!
//! An empty result set is a valid outcome, not an error; only a root
//! value that cannot be interpreted as a record set at all (a bare
//! string, number, or boolean) is rejected.

use crate::value::{type_name, Row};
use serde_json::Value;
use std::fmt;

/// Errors from shape normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// The input is a primitive that cannot be a record set.
    WrongShape { found: &'static str },
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::WrongShape { found } => {
                write!(
                    f,
                    "cannot interpret {} as a record set (expected array or object)",
                    found
                )
            }
        }
    }
}

impl std::error::Error for NormalizeError {}

/// Normalization output: the rows, a sample row for field resolution
/// (first row, or a synthesized empty row if there are none), and any
/// warnings about irregular elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub rows: Vec<Row>,
    pub sample: Row,
    pub warnings: Vec<String>,
}

/// Normalize a document into rows.
///
/// Array ⇒ one row per element (non-object elements are wrapped as
/// `{ "value": element }` and flagged); object ⇒ a one-row sequence;
/// null ⇒ an empty sequence; any other primitive ⇒ [`NormalizeError::WrongShape`].
pub fn normalize(document: &Value) -> Result<Normalized, NormalizeError> {
    let mut warnings = Vec::new();

    let rows = match document {
        Value::Array(elements) => {
            let mut rows = Vec::with_capacity(elements.len());
            for (i, elem) in elements.iter().enumerate() {
                match elem {
                    Value::Object(fields) => rows.push(fields.clone()),
                    other => {
                        warnings.push(format!(
                            "element {} is {} rather than an object; wrapped as {{\"value\": ...}}",
                            i,
                            type_name(other)
                        ));
                        let mut row = Row::new();
                        row.insert("value".to_string(), other.clone());
                        rows.push(row);
                    }
                }
            }
            rows
        }
        Value::Object(fields) => vec![fields.clone()],
        Value::Null => Vec::new(),
        other => {
            return Err(NormalizeError::WrongShape {
                found: type_name(other),
            })
        }
    };

    let sample = rows.first().cloned().unwrap_or_default();
    Ok(Normalized {
        rows,
        sample,
        warnings,
    })
}

/// Resolve `record_path` (a JSON Pointer; "" addresses the whole
/// document) and normalize whatever lives there. A pointer that matches
/// nothing behaves like null: an empty row sequence, successfully.
pub fn extract_and_normalize(
    document: &Value,
    record_path: &str,
) -> Result<Normalized, NormalizeError> {
    match document.pointer(record_path) {
        Some(target) => normalize(target),
        None => Ok(Normalized {
            rows: Vec::new(),
            sample: Row::new(),
            warnings: vec![format!("record path '{}' matched nothing", record_path)],
        }),
    }
}
