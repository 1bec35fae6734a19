//! tabula-plan: transform plan types, JSON interchange, and validation.
//!
//! A [`TransformPlan`] is the unit of work the executor runs: a record
//! path plus an ordered pipeline of relational-style steps. Plans travel
//! as JSON (produced by the template synthesizer or an external
//! collaborator, stored and replayed by the service layer); this crate
//! owns the wire format.
//!
//! # Public API
//!
//! - [`from_plan_json`] -- parse a `serde_json::Value` into a typed plan
//! - [`TransformPlan::to_json`] -- serialize back to the wire format
//! - [`validate`] -- fail-fast structural checks (step ordering, shape)
//! - [`PlanError`] -- the shared error type for all three

/// Plan wire-format version emitted by this crate.
pub const PLAN_VERSION: &str = "1.0";

pub mod deserialize;
pub mod serialize;
pub mod types;
pub mod validate;

pub use deserialize::{from_plan_json, parse_condition, PlanError};
pub use types::{
    CmpOp, ComputeSpec, Condition, FieldSpec, MetricFn, MetricSpec, Operand, PlanStep,
    RecordSource, SortDir, TransformPlan,
};
pub use validate::validate;
