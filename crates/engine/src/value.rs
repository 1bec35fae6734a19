//! JSON value helpers shared across the engine.
//!
//! Every component operates on `serde_json::Value` (the recursive
//! null/bool/number/string/array/object sum type) and on [`Row`], an
//! insertion-ordered field map. The helpers here centralize the coercion
//! and comparison rules so the executor, expression interpreter, and
//! aggregator all agree on them.

use serde_json::Value;
use std::cmp::Ordering;

/// One flattened record: field name to JSON value, insertion-ordered.
/// Field order becomes CSV column order.
pub type Row = serde_json::Map<String, Value>;

/// Human-readable type name for error and warning messages.
pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Coerce a value to a number for arithmetic, filtering, and aggregation.
///
/// Numbers pass through; numeric strings parse (external APIs routinely
/// quote numbers). Everything else is not a number.
pub fn to_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Wrap an f64 result as a JSON number, preferring the integer
/// representation for whole values so that computed and aggregated
/// integers stay integers on the wire.
pub fn number_value(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= 9_007_199_254_740_992.0 {
        Value::from(f as i64)
    } else {
        serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

/// Truthiness for filter conditions and ternary expressions: false for
/// null, false, zero, and the empty string; true otherwise.
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Ordering between two values for sorting.
///
/// Numbers compare numerically, strings lexicographically, booleans with
/// false < true. Null and cross-type pairs are non-comparable (`None`);
/// the sort places them last regardless of direction.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_names() {
        assert_eq!(type_name(&json!(null)), "null");
        assert_eq!(type_name(&json!(true)), "boolean");
        assert_eq!(type_name(&json!(1.5)), "number");
        assert_eq!(type_name(&json!("x")), "string");
        assert_eq!(type_name(&json!([])), "array");
        assert_eq!(type_name(&json!({})), "object");
    }

    #[test]
    fn to_number_coerces_numeric_strings() {
        assert_eq!(to_number(&json!(42)), Some(42.0));
        assert_eq!(to_number(&json!(-1.5)), Some(-1.5));
        assert_eq!(to_number(&json!("19.90")), Some(19.9));
        assert_eq!(to_number(&json!(" 7 ")), Some(7.0));
        assert_eq!(to_number(&json!("abc")), None);
        assert_eq!(to_number(&json!(true)), None);
        assert_eq!(to_number(&json!(null)), None);
    }

    #[test]
    fn number_value_keeps_whole_numbers_integral() {
        assert_eq!(number_value(30.0), json!(30));
        assert_eq!(number_value(-4.0), json!(-4));
        assert_eq!(number_value(2.5), json!(2.5));
        assert_eq!(number_value(f64::NAN), Value::Null);
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("no")));
        assert!(is_truthy(&json!([])));
    }

    #[test]
    fn compare_numbers_and_strings() {
        assert_eq!(compare(&json!(1), &json!(2)), Some(Ordering::Less));
        assert_eq!(compare(&json!(2.5), &json!(2.5)), Some(Ordering::Equal));
        assert_eq!(compare(&json!("a"), &json!("b")), Some(Ordering::Less));
        assert_eq!(compare(&json!(false), &json!(true)), Some(Ordering::Less));
    }

    #[test]
    fn compare_cross_type_is_none() {
        assert_eq!(compare(&json!(1), &json!("1")), None);
        assert_eq!(compare(&json!(null), &json!(null)), None);
        assert_eq!(compare(&json!(1), &json!(null)), None);
    }
}
