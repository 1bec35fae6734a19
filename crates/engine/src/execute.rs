//! Plan executor: runs an ordered pipeline of steps over rows.
//!
//! The executor resolves the plan's record path via the shape
//! normalizer, then folds steps left-to-right; each step consumes the
//! previous step's row sequence and produces a new one.
//!
//! Failure asymmetry: a structurally invalid plan fails fast with a
//! typed error before any row is processed; per-row problems (missing
//! field, bad operand, division by zero) degrade to null or row-drop
//! and processing continues. Malformed plans are a synthesis bug;
//! malformed data is the normal case this engine exists to tolerate.

use crate::expr;
use crate::normalize::{extract_and_normalize, NormalizeError};
use crate::resolve::resolve_field_with;
use crate::value::{compare, number_value, to_number, Row};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use tabula_plan::{
    validate, CmpOp, ComputeSpec, Condition, FieldSpec, MetricFn, MetricSpec, Operand, PlanError,
    PlanStep, SortDir, TransformPlan,
};
use tracing::debug;

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Structural execution errors. Data-content problems never appear
/// here; they become warnings on the [`Execution`] result.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecError {
    /// The plan failed structural validation.
    Plan(PlanError),
    /// The document root cannot be interpreted as a record set.
    Normalize(NormalizeError),
    /// A compute expression failed to parse.
    Expression { step: usize, message: String },
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::Plan(e) => write!(f, "plan error: {}", e),
            ExecError::Normalize(e) => write!(f, "input error: {}", e),
            ExecError::Expression { step, message } => {
                write!(f, "step {}: {}", step, message)
            }
        }
    }
}

impl std::error::Error for ExecError {}

impl From<PlanError> for ExecError {
    fn from(e: PlanError) -> Self {
        ExecError::Plan(e)
    }
}

impl From<NormalizeError> for ExecError {
    fn from(e: NormalizeError) -> Self {
        ExecError::Normalize(e)
    }
}

/// Execution outcome: the result rows plus warnings accumulated from
/// normalization, resolution misses, and irregular data.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub rows: Vec<Row>,
    pub warnings: Vec<String>,
}

// ──────────────────────────────────────────────
// Executor
// ──────────────────────────────────────────────

/// Execute a plan against a document.
pub fn execute(plan: &TransformPlan, document: &Value) -> Result<Execution, ExecError> {
    execute_with_aliases(plan, document, &[])
}

/// [`execute`] with caller-supplied alias pairs (e.g. from a config
/// file) extending the built-in resolver dictionary.
pub fn execute_with_aliases(
    plan: &TransformPlan,
    document: &Value,
    extra_aliases: &[(String, String)],
) -> Result<Execution, ExecError> {
    validate(plan)?;

    let normalized = extract_and_normalize(document, &plan.source.record_path)?;
    let mut warnings = normalized.warnings;
    let mut rows = normalized.rows;

    let mut i = 0;
    while i < plan.steps.len() {
        match &plan.steps[i] {
            PlanStep::Select { fields } => {
                rows = apply_select(fields, rows, &mut warnings, extra_aliases);
            }
            PlanStep::Filter { predicate } => {
                let before = rows.len();
                rows.retain(|row| eval_condition_with(predicate, row, extra_aliases) == Some(true));
                debug!(kept = rows.len(), dropped = before - rows.len(), "filter applied");
            }
            PlanStep::Compute { specs } => {
                rows = apply_compute(i, specs, rows, extra_aliases)?;
            }
            PlanStep::Sort { by, dir } => {
                apply_sort(by, *dir, &mut rows, &mut warnings, extra_aliases);
            }
            PlanStep::GroupBy { keys } => {
                // Validation guarantees the next step is aggregate; the
                // pair executes as one unit.
                let metrics = match plan.steps.get(i + 1) {
                    Some(PlanStep::Aggregate { metrics }) => metrics,
                    _ => {
                        return Err(ExecError::Plan(PlanError::InvalidPlan(format!(
                            "step {}: groupBy must be immediately followed by an aggregate step",
                            i
                        ))))
                    }
                };
                rows = apply_group_aggregate(Some(keys), metrics, rows, &mut warnings, extra_aliases);
                i += 2;
                continue;
            }
            PlanStep::Aggregate { metrics } => {
                rows = apply_group_aggregate(None, metrics, rows, &mut warnings, extra_aliases);
            }
            PlanStep::Limit { n } => {
                rows.truncate(*n);
            }
        }
        i += 1;
    }

    Ok(Execution { rows, warnings })
}

// ──────────────────────────────────────────────
// Steps
// ──────────────────────────────────────────────

/// Project each row down to exactly the requested output names, in
/// request order. Field references resolve once against the first row
/// as the representative sample; unresolved references yield null for
/// every row.
fn apply_select(
    fields: &[FieldSpec],
    rows: Vec<Row>,
    warnings: &mut Vec<String>,
    extra_aliases: &[(String, String)],
) -> Vec<Row> {
    let sample = rows.first().cloned().unwrap_or_default();

    let resolutions: Vec<(String, String)> = fields
        .iter()
        .map(|f| {
            let res = resolve_field_with(&f.from, &sample, extra_aliases);
            warnings.extend(res.warnings.iter().cloned());
            (res.resolved_field, f.alias.clone())
        })
        .collect();

    rows.into_iter()
        .map(|row| {
            let mut out = Row::new();
            for (resolved, alias) in &resolutions {
                let value = row.get(resolved).cloned().unwrap_or(Value::Null);
                out.insert(alias.clone(), value);
            }
            out
        })
        .collect()
}

fn apply_compute(
    step: usize,
    specs: &[ComputeSpec],
    rows: Vec<Row>,
    extra_aliases: &[(String, String)],
) -> Result<Vec<Row>, ExecError> {
    let parsed: Vec<(String, expr::Expr)> = specs
        .iter()
        .map(|c| {
            expr::parse(&c.expr)
                .map(|e| (c.alias.clone(), e))
                .map_err(|e| ExecError::Expression {
                    step,
                    message: e.to_string(),
                })
        })
        .collect::<Result<_, _>>()?;

    Ok(rows
        .into_iter()
        .map(|mut row| {
            for (alias, e) in &parsed {
                let value = expr::eval_with(e, &row, extra_aliases);
                row.insert(alias.clone(), value);
            }
            row
        })
        .collect())
}

/// Stable sort by one field. Null and non-comparable values sort last
/// regardless of direction.
fn apply_sort(
    by: &str,
    dir: SortDir,
    rows: &mut [Row],
    warnings: &mut Vec<String>,
    extra_aliases: &[(String, String)],
) {
    let sample = rows.first().cloned().unwrap_or_default();
    let res = resolve_field_with(by, &sample, extra_aliases);
    warnings.extend(res.warnings.iter().cloned());
    let field = res.resolved_field;

    rows.sort_by(|ra, rb| {
        let ka = ra.get(&field).filter(|v| !v.is_null());
        let kb = rb.get(&field).filter(|v| !v.is_null());
        match (ka, kb) {
            (Some(a), Some(b)) => {
                let ord = compare(a, b).unwrap_or(Ordering::Equal);
                match dir {
                    SortDir::Asc => ord,
                    SortDir::Desc => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

/// Partition rows by the tuple of resolved key values (exact JSON
/// equality) and emit one row per group: the keys, then one field per
/// metric. With no keys the whole row set is a single group.
fn apply_group_aggregate(
    keys: Option<&[String]>,
    metrics: &[MetricSpec],
    rows: Vec<Row>,
    warnings: &mut Vec<String>,
    extra_aliases: &[(String, String)],
) -> Vec<Row> {
    let sample = rows.first().cloned().unwrap_or_default();

    let key_fields: Vec<String> = keys
        .unwrap_or_default()
        .iter()
        .map(|k| {
            let res = resolve_field_with(k, &sample, extra_aliases);
            warnings.extend(res.warnings.iter().cloned());
            res.resolved_field
        })
        .collect();

    let metric_fields: Vec<Option<String>> = metrics
        .iter()
        .map(|m| {
            m.field.as_ref().map(|f| {
                let res = resolve_field_with(f, &sample, extra_aliases);
                warnings.extend(res.warnings.iter().cloned());
                res.resolved_field
            })
        })
        .collect();

    // Groups preserve first-seen order.
    let mut group_index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Vec<Value>, Vec<Row>)> = Vec::new();

    if keys.is_none() {
        groups.push((Vec::new(), rows));
    } else {
        for row in rows {
            let key_vals: Vec<Value> = key_fields
                .iter()
                .map(|k| row.get(k).cloned().unwrap_or(Value::Null))
                .collect();
            let canonical = serde_json::to_string(&key_vals).unwrap_or_default();
            match group_index.get(&canonical) {
                Some(&idx) => groups[idx].1.push(row),
                None => {
                    group_index.insert(canonical, groups.len());
                    groups.push((key_vals, vec![row]));
                }
            }
        }
    }

    groups
        .into_iter()
        .map(|(key_vals, members)| {
            let mut out = Row::new();
            for (field, val) in key_fields.iter().zip(key_vals) {
                out.insert(field.clone(), val);
            }
            for (m, resolved_field) in metrics.iter().zip(&metric_fields) {
                out.insert(
                    m.alias.clone(),
                    apply_metric(m.func, resolved_field.as_deref(), &members),
                );
            }
            out
        })
        .collect()
}

/// Compute one metric over a group. sum/avg/min/max ignore non-numeric
/// and missing values; a group with nothing aggregatable yields null.
/// count counts rows regardless of field presence.
fn apply_metric(func: MetricFn, field: Option<&str>, members: &[Row]) -> Value {
    if func == MetricFn::Count {
        return Value::from(members.len());
    }

    let Some(field) = field else {
        return Value::Null;
    };
    let values: Vec<f64> = members
        .iter()
        .filter_map(|r| r.get(field))
        .filter_map(to_number)
        .collect();
    if values.is_empty() {
        return Value::Null;
    }

    match func {
        MetricFn::Sum => number_value(values.iter().sum()),
        MetricFn::Avg => number_value(values.iter().sum::<f64>() / values.len() as f64),
        MetricFn::Min => number_value(values.iter().cloned().fold(f64::INFINITY, f64::min)),
        MetricFn::Max => number_value(values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)),
        MetricFn::Count => Value::from(members.len()),
    }
}

// ──────────────────────────────────────────────
// Conditions
// ──────────────────────────────────────────────

/// Evaluate a filter condition against one row.
///
/// Returns None when a field operand fails to resolve: the row is
/// dropped (fail-closed), which is distinct from the condition being
/// false. Short-circuits follow the usual and/or rules.
pub fn eval_condition(cond: &Condition, row: &Row) -> Option<bool> {
    eval_condition_with(cond, row, &[])
}

/// [`eval_condition`] with caller-supplied alias pairs.
pub fn eval_condition_with(
    cond: &Condition,
    row: &Row,
    extra_aliases: &[(String, String)],
) -> Option<bool> {
    match cond {
        Condition::Compare { op, left, right } => {
            let l = resolve_operand(left, row, extra_aliases)?;
            let r = resolve_operand(right, row, extra_aliases)?;
            Some(compare_with_op(*op, &l, &r))
        }
        Condition::And { left, right } => {
            let l = eval_condition_with(left, row, extra_aliases)?;
            if !l {
                return Some(false);
            }
            eval_condition_with(right, row, extra_aliases)
        }
        Condition::Or { left, right } => {
            let l = eval_condition_with(left, row, extra_aliases)?;
            if l {
                return Some(true);
            }
            eval_condition_with(right, row, extra_aliases)
        }
        Condition::Not { operand } => eval_condition_with(operand, row, extra_aliases).map(|b| !b),
    }
}

fn resolve_operand(operand: &Operand, row: &Row, extra_aliases: &[(String, String)]) -> Option<Value> {
    match operand {
        Operand::Literal(v) => Some(v.clone()),
        Operand::Field(name) => {
            let res = resolve_field_with(name, row, extra_aliases);
            if !res.was_resolved {
                return None;
            }
            Some(row.get(&res.resolved_field).cloned().unwrap_or(Value::Null))
        }
    }
}

/// Comparison semantics: numeric when both sides coerce to number
/// (numeric strings included); eq/neq fall back to exact JSON equality;
/// ordering over non-numeric pairs is false.
fn compare_with_op(op: CmpOp, left: &Value, right: &Value) -> bool {
    if let (Some(l), Some(r)) = (to_number(left), to_number(right)) {
        return match op {
            CmpOp::Eq => l == r,
            CmpOp::Neq => l != r,
            CmpOp::Gt => l > r,
            CmpOp::Gte => l >= r,
            CmpOp::Lt => l < r,
            CmpOp::Lte => l <= r,
        };
    }
    match op {
        CmpOp::Eq => left == right,
        CmpOp::Neq => left != right,
        _ => false,
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
