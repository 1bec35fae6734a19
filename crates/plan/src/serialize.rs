//! Serialization of typed plans back to the JSON wire format.
//!
//! The output of [`TransformPlan::to_json`] round-trips through
//! [`from_plan_json`](crate::deserialize::from_plan_json) and validates
//! against schema/plan-schema.json.

use crate::types::*;
use serde_json::{json, Value};

impl TransformPlan {
    /// Serialize to the camelCase JSON wire format.
    pub fn to_json(&self) -> Value {
        json!({
            "planVersion": self.plan_version,
            "source": { "recordPath": self.source.record_path },
            "steps": self.steps.iter().map(|s| s.to_json()).collect::<Vec<_>>(),
        })
    }
}

impl PlanStep {
    pub fn to_json(&self) -> Value {
        match self {
            PlanStep::Select { fields } => json!({
                "op": "select",
                "fields": fields
                    .iter()
                    .map(|f| json!({ "from": f.from, "as": f.alias }))
                    .collect::<Vec<_>>(),
            }),
            PlanStep::Filter { predicate } => json!({
                "op": "filter",
                "where": predicate.to_json(),
            }),
            PlanStep::Compute { specs } => json!({
                "op": "compute",
                "compute": specs
                    .iter()
                    .map(|c| json!({ "as": c.alias, "expr": c.expr }))
                    .collect::<Vec<_>>(),
            }),
            PlanStep::Sort { by, dir } => json!({
                "op": "sort",
                "by": by,
                "dir": dir.as_str(),
            }),
            PlanStep::GroupBy { keys } => json!({
                "op": "groupBy",
                "keys": keys,
            }),
            PlanStep::Aggregate { metrics } => json!({
                "op": "aggregate",
                "metrics": metrics.iter().map(metric_to_json).collect::<Vec<_>>(),
            }),
            PlanStep::Limit { n } => json!({
                "op": "limit",
                "n": n,
            }),
        }
    }
}

fn metric_to_json(m: &MetricSpec) -> Value {
    match &m.field {
        Some(field) => json!({ "as": m.alias, "fn": m.func.as_str(), "field": field }),
        None => json!({ "as": m.alias, "fn": m.func.as_str() }),
    }
}

impl Condition {
    pub fn to_json(&self) -> Value {
        match self {
            Condition::Compare { op, left, right } => json!({
                "op": op.as_str(),
                "left": left.to_json(),
                "right": right.to_json(),
            }),
            Condition::And { left, right } => json!({
                "op": "and",
                "left": left.to_json(),
                "right": right.to_json(),
            }),
            Condition::Or { left, right } => json!({
                "op": "or",
                "left": left.to_json(),
                "right": right.to_json(),
            }),
            Condition::Not { operand } => json!({
                "op": "not",
                "operand": operand.to_json(),
            }),
        }
    }
}

impl Operand {
    pub fn to_json(&self) -> Value {
        match self {
            Operand::Field(name) => json!({ "field": name }),
            Operand::Literal(value) => json!({ "value": value }),
        }
    }
}
