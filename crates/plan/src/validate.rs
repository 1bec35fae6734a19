//! Structural validation of transform plans.
//!
//! A structurally invalid plan fails fast, before any row is processed.
//! These checks cover step ordering and shape only; data-content problems
//! (missing fields, bad operands) are handled softly at execution time.

use crate::deserialize::PlanError;
use crate::types::{MetricFn, PlanStep, TransformPlan};

/// Check the plan's structural invariants.
///
/// - `groupBy` must be immediately followed by exactly one `aggregate`.
/// - `select` needs at least one field; `compute` at least one spec;
///   `groupBy` at least one key; `aggregate` at least one metric.
/// - Every non-count metric needs a `field`.
/// - Field specs and compute specs need non-empty names.
pub fn validate(plan: &TransformPlan) -> Result<(), PlanError> {
    for (i, step) in plan.steps.iter().enumerate() {
        match step {
            PlanStep::Select { fields } => {
                if fields.is_empty() {
                    return Err(invalid(i, "select has no fields"));
                }
                for f in fields {
                    if f.from.is_empty() || f.alias.is_empty() {
                        return Err(invalid(i, "select field has an empty name"));
                    }
                }
            }
            PlanStep::Compute { specs } => {
                if specs.is_empty() {
                    return Err(invalid(i, "compute has no specs"));
                }
                for c in specs {
                    if c.alias.is_empty() {
                        return Err(invalid(i, "compute spec has an empty output name"));
                    }
                    if c.expr.trim().is_empty() {
                        return Err(invalid(i, "compute spec has an empty expression"));
                    }
                }
            }
            PlanStep::Sort { by, .. } => {
                if by.is_empty() {
                    return Err(invalid(i, "sort has an empty 'by' field"));
                }
            }
            PlanStep::GroupBy { keys } => {
                if keys.is_empty() {
                    return Err(invalid(i, "groupBy has no keys"));
                }
                match plan.steps.get(i + 1) {
                    Some(PlanStep::Aggregate { .. }) => {}
                    _ => {
                        return Err(invalid(
                            i,
                            "groupBy must be immediately followed by an aggregate step",
                        ))
                    }
                }
            }
            PlanStep::Aggregate { metrics } => {
                if metrics.is_empty() {
                    return Err(invalid(i, "aggregate has no metrics"));
                }
                for m in metrics {
                    if m.alias.is_empty() {
                        return Err(invalid(i, "metric has an empty output name"));
                    }
                    if m.func != MetricFn::Count && m.field.is_none() {
                        return Err(invalid(
                            i,
                            format!("metric '{}' ({}) needs a field", m.alias, m.func.as_str()),
                        ));
                    }
                }
            }
            PlanStep::Filter { .. } | PlanStep::Limit { .. } => {}
        }
    }
    Ok(())
}

fn invalid(index: usize, message: impl Into<String>) -> PlanError {
    PlanError::InvalidPlan(format!("step {}: {}", index, message.into()))
}
