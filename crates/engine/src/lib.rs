//! tabula-engine: the transformation core -- accepts an arbitrary JSON
//! document, locates the record array inside it, and runs a declarative
//! plan over the rows.
//!
//! Every component here is a pure, synchronous computation over
//! immutable inputs: nothing mutates the document, nothing blocks on
//! I/O, and nothing keeps state across calls. Concurrent executions
//! are independent; the caller may parallelize freely. The one async
//! boundary is [`PlanSource`], the injected external collaborator that
//! may supply plan text -- the engine itself never calls out.
//!
//! # Public API
//!
//! - [`discover`] -- find the best record path in a document
//! - [`normalize`] / [`extract_and_normalize`] -- document to rows
//! - [`resolve_field`] -- map a loose field reference onto a sample row
//! - [`execute`] -- run a plan over a document
//! - [`infer_schema`] -- permissive JSON Schema from result rows
//! - [`synthesize`] -- deterministic plan from a goal description
//! - [`plan_or_synthesize`] -- provider plan with template fallback

pub mod discover;
pub mod execute;
pub mod expr;
pub mod normalize;
pub mod plan_source;
pub mod resolve;
pub mod schema_infer;
pub mod synthesize;
pub mod value;

pub use discover::{discover, score_candidate, DiscoverError, Discovery, RecordPathCandidate};
pub use execute::{
    eval_condition, eval_condition_with, execute, execute_with_aliases, ExecError, Execution,
};
pub use normalize::{extract_and_normalize, normalize, Normalized, NormalizeError};
pub use plan_source::{
    plan_or_synthesize, PlanOrigin, PlanSource, PlanSourceError, StaticPlanSource,
};
pub use resolve::{resolve_field, resolve_field_with, FieldResolution};
pub use schema_infer::infer_schema;
pub use synthesize::synthesize;
pub use value::Row;

// ──────────────────────────────────────────────
// Integration tests
// ──────────────────────────────────────────────
