//! Typed representation of a transform plan.
//!
//! A plan is a value object: a serializable, declarative description of a
//! pipeline of row operations. It is produced once (by the template
//! synthesizer or an external collaborator), executed any number of times,
//! and never mutated in place. The JSON wire format uses camelCase keys
//! (`planVersion`, `recordPath`, `groupBy`); the structs here use Rust
//! naming and convert at the (de)serialization boundary.

/// A complete transform plan: where the records live plus the ordered
/// pipeline of steps to run over them.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformPlan {
    /// Plan format version (e.g. "1.0").
    pub plan_version: String,
    pub source: RecordSource,
    pub steps: Vec<PlanStep>,
}

/// Identifies where the record array lives inside the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSource {
    /// JSON Pointer to the record array ("" for a root-level array).
    pub record_path: String,
}

/// One pipeline step. Steps run strictly in declared order; each consumes
/// the previous step's row sequence and produces a new one.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanStep {
    Select { fields: Vec<FieldSpec> },
    Filter { predicate: Condition },
    Compute { specs: Vec<ComputeSpec> },
    Sort { by: String, dir: SortDir },
    GroupBy { keys: Vec<String> },
    Aggregate { metrics: Vec<MetricSpec> },
    Limit { n: usize },
}

impl PlanStep {
    /// The wire-format `op` tag for this step.
    pub fn op_name(&self) -> &'static str {
        match self {
            PlanStep::Select { .. } => "select",
            PlanStep::Filter { .. } => "filter",
            PlanStep::Compute { .. } => "compute",
            PlanStep::Sort { .. } => "sort",
            PlanStep::GroupBy { .. } => "groupBy",
            PlanStep::Aggregate { .. } => "aggregate",
            PlanStep::Limit { .. } => "limit",
        }
    }
}

/// A projected field: copy the value found at `from` under the output
/// name `alias` (wire key "as").
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub from: String,
    pub alias: String,
}

/// A computed field: evaluate `expr` per row and store under `alias`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeSpec {
    pub alias: String,
    pub expr: String,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }

    pub fn parse(s: &str) -> Option<SortDir> {
        match s {
            "asc" => Some(SortDir::Asc),
            "desc" => Some(SortDir::Desc),
            _ => None,
        }
    }
}

/// Comparison operator for filter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Eq => "eq",
            CmpOp::Neq => "neq",
            CmpOp::Gt => "gt",
            CmpOp::Gte => "gte",
            CmpOp::Lt => "lt",
            CmpOp::Lte => "lte",
        }
    }

    pub fn parse(s: &str) -> Option<CmpOp> {
        match s {
            "eq" => Some(CmpOp::Eq),
            "neq" => Some(CmpOp::Neq),
            "gt" => Some(CmpOp::Gt),
            "gte" => Some(CmpOp::Gte),
            "lt" => Some(CmpOp::Lt),
            "lte" => Some(CmpOp::Lte),
            _ => None,
        }
    }
}

/// A filter condition tree: comparisons over operands, composed with
/// and/or/not.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        op: CmpOp,
        left: Operand,
        right: Operand,
    },
    And {
        left: Box<Condition>,
        right: Box<Condition>,
    },
    Or {
        left: Box<Condition>,
        right: Box<Condition>,
    },
    Not {
        operand: Box<Condition>,
    },
}

/// A comparison operand: a field reference (resolved per row) or a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(String),
    Literal(serde_json::Value),
}

/// Aggregation function for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricFn {
    Sum,
    Count,
    Avg,
    Min,
    Max,
}

impl MetricFn {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricFn::Sum => "sum",
            MetricFn::Count => "count",
            MetricFn::Avg => "avg",
            MetricFn::Min => "min",
            MetricFn::Max => "max",
        }
    }

    pub fn parse(s: &str) -> Option<MetricFn> {
        match s {
            "sum" => Some(MetricFn::Sum),
            "count" => Some(MetricFn::Count),
            "avg" => Some(MetricFn::Avg),
            "min" => Some(MetricFn::Min),
            "max" => Some(MetricFn::Max),
            _ => None,
        }
    }
}

/// One aggregate output: `func` over `field`, stored under `alias`
/// (wire keys "fn" and "as"). `field` is None only for count.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec {
    pub alias: String,
    pub func: MetricFn,
    pub field: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_names_round_trip_through_wire_tags() {
        let steps = vec![
            PlanStep::Select { fields: vec![] },
            PlanStep::Filter {
                predicate: Condition::Compare {
                    op: CmpOp::Eq,
                    left: Operand::Field("a".to_string()),
                    right: Operand::Literal(serde_json::json!(1)),
                },
            },
            PlanStep::Compute { specs: vec![] },
            PlanStep::Sort {
                by: "a".to_string(),
                dir: SortDir::Asc,
            },
            PlanStep::GroupBy { keys: vec![] },
            PlanStep::Aggregate { metrics: vec![] },
            PlanStep::Limit { n: 3 },
        ];
        let names: Vec<_> = steps.iter().map(|s| s.op_name()).collect();
        assert_eq!(
            names,
            vec!["select", "filter", "compute", "sort", "groupBy", "aggregate", "limit"]
        );
    }

    #[test]
    fn sort_dir_parse() {
        assert_eq!(SortDir::parse("asc"), Some(SortDir::Asc));
        assert_eq!(SortDir::parse("desc"), Some(SortDir::Desc));
        assert_eq!(SortDir::parse("up"), None);
        assert_eq!(SortDir::Desc.as_str(), "desc");
    }

    #[test]
    fn cmp_op_parse_all() {
        for op in ["eq", "neq", "gt", "gte", "lt", "lte"] {
            let parsed = CmpOp::parse(op).unwrap();
            assert_eq!(parsed.as_str(), op);
        }
        assert_eq!(CmpOp::parse("like"), None);
    }

    #[test]
    fn metric_fn_parse_all() {
        for f in ["sum", "count", "avg", "min", "max"] {
            let parsed = MetricFn::parse(f).unwrap();
            assert_eq!(parsed.as_str(), f);
        }
        assert_eq!(MetricFn::parse("median"), None);
    }
}
