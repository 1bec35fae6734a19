//! Deserialization from plan JSON into typed structs.
//!
//! The main entry point is [`from_plan_json`], which takes a
//! `&serde_json::Value` and produces a [`TransformPlan`]. Steps dispatch
//! on the `op` tag; unknown ops are a hard error (a malformed plan is a
//! synthesis bug, not tolerated input).

use crate::types::*;
use std::fmt;

/// Errors during plan JSON deserialization or validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// The plan is missing a required top-level field.
    MissingField { field: String },
    /// A step has an unknown `op` tag.
    UnknownOp { index: usize, op: String },
    /// A step is missing or has a malformed field.
    StepError {
        index: usize,
        op: String,
        message: String,
    },
    /// A condition node is malformed.
    InvalidCondition { message: String },
    /// The plan violates a structural invariant.
    InvalidPlan(String),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::MissingField { field } => {
                write!(f, "plan missing required field: '{}'", field)
            }
            PlanError::UnknownOp { index, op } => {
                write!(f, "step {}: unknown op '{}'", index, op)
            }
            PlanError::StepError { index, op, message } => {
                write!(f, "step {} ({}): {}", index, op, message)
            }
            PlanError::InvalidCondition { message } => {
                write!(f, "invalid condition: {}", message)
            }
            PlanError::InvalidPlan(msg) => {
                write!(f, "invalid plan: {}", msg)
            }
        }
    }
}

impl std::error::Error for PlanError {}

/// Deserialize a plan JSON value into a [`TransformPlan`].
///
/// Performs shape checks only; structural invariants (step ordering,
/// non-empty field lists) are checked separately by
/// [`validate`](crate::validate::validate).
pub fn from_plan_json(plan: &serde_json::Value) -> Result<TransformPlan, PlanError> {
    let plan_version = plan
        .get("planVersion")
        .and_then(|v| v.as_str())
        .ok_or_else(|| PlanError::MissingField {
            field: "planVersion".to_string(),
        })?
        .to_string();

    let record_path = plan
        .get("source")
        .and_then(|s| s.get("recordPath"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| PlanError::MissingField {
            field: "source.recordPath".to_string(),
        })?
        .to_string();

    let steps_arr = plan
        .get("steps")
        .and_then(|s| s.as_array())
        .ok_or_else(|| PlanError::MissingField {
            field: "steps".to_string(),
        })?;

    let mut steps = Vec::with_capacity(steps_arr.len());
    for (index, obj) in steps_arr.iter().enumerate() {
        let op = obj
            .get("op")
            .and_then(|o| o.as_str())
            .ok_or_else(|| PlanError::StepError {
                index,
                op: "?".to_string(),
                message: "missing 'op' tag".to_string(),
            })?;

        let step = match op {
            "select" => parse_select(index, obj)?,
            "filter" => parse_filter(index, obj)?,
            "compute" => parse_compute(index, obj)?,
            "sort" => parse_sort(index, obj)?,
            "groupBy" => parse_group_by(index, obj)?,
            "aggregate" => parse_aggregate(index, obj)?,
            "limit" => parse_limit(index, obj)?,
            other => {
                return Err(PlanError::UnknownOp {
                    index,
                    op: other.to_string(),
                })
            }
        };
        steps.push(step);
    }

    Ok(TransformPlan {
        plan_version,
        source: RecordSource { record_path },
        steps,
    })
}

// ── Step parsers ────────────────────────────────────────────────────

fn step_err(index: usize, op: &str, message: impl Into<String>) -> PlanError {
    PlanError::StepError {
        index,
        op: op.to_string(),
        message: message.into(),
    }
}

fn parse_select(index: usize, obj: &serde_json::Value) -> Result<PlanStep, PlanError> {
    let fields_arr = obj
        .get("fields")
        .and_then(|f| f.as_array())
        .ok_or_else(|| step_err(index, "select", "missing 'fields' array"))?;

    let mut fields = Vec::with_capacity(fields_arr.len());
    for f in fields_arr {
        let from = f
            .get("from")
            .and_then(|v| v.as_str())
            .ok_or_else(|| step_err(index, "select", "field spec missing 'from'"))?
            .to_string();
        let alias = f
            .get("as")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| from.clone());
        fields.push(FieldSpec { from, alias });
    }
    Ok(PlanStep::Select { fields })
}

fn parse_filter(index: usize, obj: &serde_json::Value) -> Result<PlanStep, PlanError> {
    let where_val = obj
        .get("where")
        .ok_or_else(|| step_err(index, "filter", "missing 'where' condition"))?;
    let predicate = parse_condition(where_val)?;
    Ok(PlanStep::Filter { predicate })
}

fn parse_compute(index: usize, obj: &serde_json::Value) -> Result<PlanStep, PlanError> {
    let specs_arr = obj
        .get("compute")
        .and_then(|c| c.as_array())
        .ok_or_else(|| step_err(index, "compute", "missing 'compute' array"))?;

    let mut specs = Vec::with_capacity(specs_arr.len());
    for c in specs_arr {
        let alias = c
            .get("as")
            .and_then(|v| v.as_str())
            .ok_or_else(|| step_err(index, "compute", "compute spec missing 'as'"))?
            .to_string();
        let expr = c
            .get("expr")
            .and_then(|v| v.as_str())
            .ok_or_else(|| step_err(index, "compute", "compute spec missing 'expr'"))?
            .to_string();
        specs.push(ComputeSpec { alias, expr });
    }
    Ok(PlanStep::Compute { specs })
}

fn parse_sort(index: usize, obj: &serde_json::Value) -> Result<PlanStep, PlanError> {
    let by = obj
        .get("by")
        .and_then(|v| v.as_str())
        .ok_or_else(|| step_err(index, "sort", "missing 'by' field"))?
        .to_string();
    let dir_str = obj.get("dir").and_then(|v| v.as_str()).unwrap_or("asc");
    let dir = SortDir::parse(dir_str)
        .ok_or_else(|| step_err(index, "sort", format!("invalid dir '{}'", dir_str)))?;
    Ok(PlanStep::Sort { by, dir })
}

fn parse_group_by(index: usize, obj: &serde_json::Value) -> Result<PlanStep, PlanError> {
    let keys = obj
        .get("keys")
        .and_then(|k| k.as_array())
        .ok_or_else(|| step_err(index, "groupBy", "missing 'keys' array"))?
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect::<Vec<_>>();
    Ok(PlanStep::GroupBy { keys })
}

fn parse_aggregate(index: usize, obj: &serde_json::Value) -> Result<PlanStep, PlanError> {
    let metrics_arr = obj
        .get("metrics")
        .and_then(|m| m.as_array())
        .ok_or_else(|| step_err(index, "aggregate", "missing 'metrics' array"))?;

    let mut metrics = Vec::with_capacity(metrics_arr.len());
    for m in metrics_arr {
        let alias = m
            .get("as")
            .and_then(|v| v.as_str())
            .ok_or_else(|| step_err(index, "aggregate", "metric missing 'as'"))?
            .to_string();
        let fn_str = m
            .get("fn")
            .and_then(|v| v.as_str())
            .ok_or_else(|| step_err(index, "aggregate", "metric missing 'fn'"))?;
        let func = MetricFn::parse(fn_str)
            .ok_or_else(|| step_err(index, "aggregate", format!("unknown fn '{}'", fn_str)))?;
        let field = m
            .get("field")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        metrics.push(MetricSpec { alias, func, field });
    }
    Ok(PlanStep::Aggregate { metrics })
}

fn parse_limit(index: usize, obj: &serde_json::Value) -> Result<PlanStep, PlanError> {
    let n = obj
        .get("n")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| step_err(index, "limit", "missing or negative 'n'"))?;
    Ok(PlanStep::Limit { n: n as usize })
}

// ── Condition parsing ───────────────────────────────────────────────

/// Parse a condition tree. Comparison nodes carry operands; and/or carry
/// two sub-conditions; not carries one.
pub fn parse_condition(val: &serde_json::Value) -> Result<Condition, PlanError> {
    let op = val
        .get("op")
        .and_then(|o| o.as_str())
        .ok_or_else(|| PlanError::InvalidCondition {
            message: "missing 'op'".to_string(),
        })?;

    if let Some(cmp) = CmpOp::parse(op) {
        let left = parse_operand(val.get("left").ok_or_else(|| {
            PlanError::InvalidCondition {
                message: format!("'{}' missing 'left' operand", op),
            }
        })?)?;
        let right = parse_operand(val.get("right").ok_or_else(|| {
            PlanError::InvalidCondition {
                message: format!("'{}' missing 'right' operand", op),
            }
        })?)?;
        return Ok(Condition::Compare {
            op: cmp,
            left,
            right,
        });
    }

    match op {
        "and" | "or" => {
            let left = val
                .get("left")
                .ok_or_else(|| PlanError::InvalidCondition {
                    message: format!("'{}' missing 'left' condition", op),
                })
                .and_then(parse_condition)?;
            let right = val
                .get("right")
                .ok_or_else(|| PlanError::InvalidCondition {
                    message: format!("'{}' missing 'right' condition", op),
                })
                .and_then(parse_condition)?;
            if op == "and" {
                Ok(Condition::And {
                    left: Box::new(left),
                    right: Box::new(right),
                })
            } else {
                Ok(Condition::Or {
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
        }
        "not" => {
            let operand = val
                .get("operand")
                .ok_or_else(|| PlanError::InvalidCondition {
                    message: "'not' missing 'operand'".to_string(),
                })
                .and_then(parse_condition)?;
            Ok(Condition::Not {
                operand: Box::new(operand),
            })
        }
        other => Err(PlanError::InvalidCondition {
            message: format!("unknown condition op '{}'", other),
        }),
    }
}

fn parse_operand(val: &serde_json::Value) -> Result<Operand, PlanError> {
    if let Some(field) = val.get("field").and_then(|f| f.as_str()) {
        return Ok(Operand::Field(field.to_string()));
    }
    if let Some(value) = val.get("value") {
        return Ok(Operand::Literal(value.clone()));
    }
    Err(PlanError::InvalidCondition {
        message: "operand must have 'field' or 'value'".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_plan(steps: Vec<serde_json::Value>) -> serde_json::Value {
        json!({
            "planVersion": "1.0",
            "source": { "recordPath": "/items" },
            "steps": steps
        })
    }

    #[test]
    fn empty_plan() {
        let plan = from_plan_json(&make_plan(vec![])).unwrap();
        assert_eq!(plan.plan_version, "1.0");
        assert_eq!(plan.source.record_path, "/items");
        assert!(plan.steps.is_empty());
    }

    #[test]
    fn missing_plan_version() {
        let result = from_plan_json(&json!({
            "source": { "recordPath": "" },
            "steps": []
        }));
        match result.unwrap_err() {
            PlanError::MissingField { field } => assert_eq!(field, "planVersion"),
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn missing_record_path() {
        let result = from_plan_json(&json!({
            "planVersion": "1.0",
            "source": {},
            "steps": []
        }));
        match result.unwrap_err() {
            PlanError::MissingField { field } => assert_eq!(field, "source.recordPath"),
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn parse_select_step() {
        let plan = from_plan_json(&make_plan(vec![json!({
            "op": "select",
            "fields": [
                { "from": "nome", "as": "name" },
                { "from": "price" }
            ]
        })]))
        .unwrap();
        match &plan.steps[0] {
            PlanStep::Select { fields } => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].from, "nome");
                assert_eq!(fields[0].alias, "name");
                // Missing "as" defaults to the source name
                assert_eq!(fields[1].alias, "price");
            }
            other => panic!("expected Select, got {:?}", other),
        }
    }

    #[test]
    fn parse_filter_step_with_nested_condition() {
        let plan = from_plan_json(&make_plan(vec![json!({
            "op": "filter",
            "where": {
                "op": "and",
                "left": {
                    "op": "gte",
                    "left": { "field": "price" },
                    "right": { "value": 20 }
                },
                "right": {
                    "op": "not",
                    "operand": {
                        "op": "eq",
                        "left": { "field": "status" },
                        "right": { "value": "discontinued" }
                    }
                }
            }
        })]))
        .unwrap();
        match &plan.steps[0] {
            PlanStep::Filter { predicate } => match predicate {
                Condition::And { left, right } => {
                    assert!(matches!(
                        **left,
                        Condition::Compare { op: CmpOp::Gte, .. }
                    ));
                    assert!(matches!(**right, Condition::Not { .. }));
                }
                other => panic!("expected And, got {:?}", other),
            },
            other => panic!("expected Filter, got {:?}", other),
        }
    }

    #[test]
    fn parse_compute_sort_limit() {
        let plan = from_plan_json(&make_plan(vec![
            json!({ "op": "compute", "compute": [ { "as": "total", "expr": "price * quantity" } ] }),
            json!({ "op": "sort", "by": "total", "dir": "desc" }),
            json!({ "op": "limit", "n": 5 }),
        ]))
        .unwrap();
        assert!(matches!(&plan.steps[0], PlanStep::Compute { specs } if specs[0].expr == "price * quantity"));
        assert!(matches!(
            &plan.steps[1],
            PlanStep::Sort { dir: SortDir::Desc, .. }
        ));
        assert!(matches!(&plan.steps[2], PlanStep::Limit { n: 5 }));
    }

    #[test]
    fn sort_dir_defaults_to_asc() {
        let plan = from_plan_json(&make_plan(vec![json!({ "op": "sort", "by": "price" })])).unwrap();
        assert!(matches!(
            &plan.steps[0],
            PlanStep::Sort { dir: SortDir::Asc, .. }
        ));
    }

    #[test]
    fn parse_group_by_aggregate() {
        let plan = from_plan_json(&make_plan(vec![
            json!({ "op": "groupBy", "keys": ["category"] }),
            json!({ "op": "aggregate", "metrics": [
                { "as": "total", "fn": "sum", "field": "value" },
                { "as": "n", "fn": "count" }
            ] }),
        ]))
        .unwrap();
        match &plan.steps[1] {
            PlanStep::Aggregate { metrics } => {
                assert_eq!(metrics[0].func, MetricFn::Sum);
                assert_eq!(metrics[0].field.as_deref(), Some("value"));
                assert_eq!(metrics[1].func, MetricFn::Count);
                assert!(metrics[1].field.is_none());
            }
            other => panic!("expected Aggregate, got {:?}", other),
        }
    }

    #[test]
    fn unknown_op_is_an_error() {
        let result = from_plan_json(&make_plan(vec![json!({ "op": "join", "on": "id" })]));
        match result.unwrap_err() {
            PlanError::UnknownOp { index, op } => {
                assert_eq!(index, 0);
                assert_eq!(op, "join");
            }
            other => panic!("expected UnknownOp, got {:?}", other),
        }
    }

    #[test]
    fn unknown_metric_fn_is_an_error() {
        let result = from_plan_json(&make_plan(vec![json!({
            "op": "aggregate",
            "metrics": [ { "as": "m", "fn": "median", "field": "x" } ]
        })]));
        assert!(matches!(result.unwrap_err(), PlanError::StepError { .. }));
    }

    #[test]
    fn negative_limit_is_an_error() {
        let result = from_plan_json(&make_plan(vec![json!({ "op": "limit", "n": -1 })]));
        assert!(matches!(result.unwrap_err(), PlanError::StepError { .. }));
    }

    #[test]
    fn operand_requires_field_or_value() {
        let result = from_plan_json(&make_plan(vec![json!({
            "op": "filter",
            "where": { "op": "eq", "left": {}, "right": { "value": 1 } }
        })]));
        assert!(matches!(
            result.unwrap_err(),
            PlanError::InvalidCondition { .. }
        ));
    }

    #[test]
    fn error_display() {
        let err = PlanError::UnknownOp {
            index: 2,
            op: "pivot".to_string(),
        };
        assert_eq!(err.to_string(), "step 2: unknown op 'pivot'");

        let err = PlanError::MissingField {
            field: "steps".to_string(),
        };
        assert_eq!(err.to_string(), "plan missing required field: 'steps'");
    }
}
