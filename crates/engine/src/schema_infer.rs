//! Permissive schema inference: derive a JSON Schema describing the
//! executor's output by merging observed types across all rows.
//!
//! The inferred schema never rejects a row for having extra fields --
//! object nodes always permit additional properties, because input
//! shapes are not contractually fixed.

use crate::value::Row;
use serde_json::{json, Value};
use tracing::debug;

/// The JSON Schema type name observed for one value.
fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else if n.as_f64().is_some_and(|f| f.fract() == 0.0) {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Infer a permissive array-of-objects schema from result rows.
///
/// Per-field type is computed from every row's value for that field; a
/// field whose type varies across rows gets a union (`"type": [...]`)
/// in first-observed order, never an error. Empty input yields an
/// object schema with no declared properties.
pub fn infer_schema(rows: &[Row]) -> Value {
    // Field name -> distinct observed types, both in first-seen order.
    let mut fields: Vec<(String, Vec<&'static str>)> = Vec::new();

    for row in rows {
        for (name, value) in row {
            let t = json_type(value);
            match fields.iter_mut().find(|(n, _)| n == name) {
                Some((_, types)) => {
                    if !types.contains(&t) {
                        debug!(field = %name, widened_to = t, "field type union widened");
                        types.push(t);
                    }
                }
                None => fields.push((name.clone(), vec![t])),
            }
        }
    }

    let mut properties = serde_json::Map::new();
    for (name, types) in fields {
        let type_value = if types.len() == 1 {
            json!(types[0])
        } else {
            json!(types)
        };
        properties.insert(name, json!({ "type": type_value }));
    }

    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": properties,
            "additionalProperties": true
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows_of(values: Vec<Value>) -> Vec<Row> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().expect("test rows are objects"))
            .collect()
    }

    #[test]
    fn scalar_types() {
        let rows = rows_of(vec![json!({
            "name": "x", "count": 3, "ratio": 1.5, "ok": true, "gone": null
        })]);
        let schema = infer_schema(&rows);
        let props = &schema["items"]["properties"];
        assert_eq!(props["name"]["type"], json!("string"));
        assert_eq!(props["count"]["type"], json!("integer"));
        assert_eq!(props["ratio"]["type"], json!("number"));
        assert_eq!(props["ok"]["type"], json!("boolean"));
        assert_eq!(props["gone"]["type"], json!("null"));
    }

    #[test]
    fn whole_float_is_integer() {
        let rows = rows_of(vec![json!({ "v": 3.0 })]);
        let schema = infer_schema(&rows);
        assert_eq!(schema["items"]["properties"]["v"]["type"], json!("integer"));
    }

    #[test]
    fn varying_types_become_a_union() {
        let rows = rows_of(vec![
            json!({ "v": 1 }),
            json!({ "v": "two" }),
            json!({ "v": 1 }),
            json!({ "v": null }),
        ]);
        let schema = infer_schema(&rows);
        assert_eq!(
            schema["items"]["properties"]["v"]["type"],
            json!(["integer", "string", "null"])
        );
    }

    #[test]
    fn nested_values_are_typed_as_container() {
        let rows = rows_of(vec![json!({ "tags": ["a"], "meta": { "k": 1 } })]);
        let schema = infer_schema(&rows);
        assert_eq!(schema["items"]["properties"]["tags"]["type"], json!("array"));
        assert_eq!(schema["items"]["properties"]["meta"]["type"], json!("object"));
    }

    #[test]
    fn always_permissive_including_empty_input() {
        let empty = infer_schema(&[]);
        assert_eq!(empty["type"], json!("array"));
        assert_eq!(empty["items"]["type"], json!("object"));
        assert_eq!(empty["items"]["additionalProperties"], json!(true));
        assert_eq!(empty["items"]["properties"], json!({}));

        let some = infer_schema(&rows_of(vec![json!({ "a": 1 })]));
        assert_eq!(some["items"]["additionalProperties"], json!(true));
    }

    #[test]
    fn fields_missing_from_some_rows_keep_observed_types_only() {
        let rows = rows_of(vec![json!({ "a": 1 }), json!({ "b": "x" })]);
        let schema = infer_schema(&rows);
        assert_eq!(schema["items"]["properties"]["a"]["type"], json!("integer"));
        assert_eq!(schema["items"]["properties"]["b"]["type"], json!("string"));
    }

    #[test]
    fn property_order_follows_first_observation() {
        let rows = rows_of(vec![json!({ "z": 1, "a": 2 }), json!({ "m": 3 })]);
        let schema = infer_schema(&rows);
        let keys: Vec<_> = schema["items"]["properties"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
