//! Plan source trait and implementations.
//!
//! A `PlanSource` asynchronously supplies candidate plan text for a
//! goal -- the boundary to the external language-model collaborator.
//! The core never calls out itself: it accepts a plan or its absence,
//! and falls back to the deterministic template synthesizer whenever
//! the provider is silent, errors, or returns text that does not parse
//! and validate as a plan.

use crate::synthesize::synthesize;
use crate::value::Row;
use async_trait::async_trait;
use std::fmt;
use tabula_plan::{from_plan_json, validate, TransformPlan};
use tracing::warn;

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors that can occur when a plan source produces plan text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanSourceError {
    /// The provider could not be reached or timed out.
    Transport(String),
    /// The provider responded with something unusable at the protocol
    /// level (empty body, wrong content type).
    Malformed(String),
}

impl PlanSourceError {
    /// Whether a caller-side retry could plausibly succeed. Transport
    /// failures are retryable; a malformed response is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlanSourceError::Transport(_) => true,
            PlanSourceError::Malformed(_) => false,
        }
    }
}

impl fmt::Display for PlanSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanSourceError::Transport(msg) => write!(f, "plan source transport error: {}", msg),
            PlanSourceError::Malformed(msg) => write!(f, "plan source malformed response: {}", msg),
        }
    }
}

impl std::error::Error for PlanSourceError {}

// ──────────────────────────────────────────────
// Trait
// ──────────────────────────────────────────────

/// Asynchronous provider of candidate plan text.
///
/// Implementations call out to whatever produces plans (a language
/// model, a cache, a fixture file). `Ok(None)` means the provider has
/// nothing to offer; the caller falls back to template synthesis.
#[async_trait]
pub trait PlanSource: Send + Sync {
    /// Produce candidate plan JSON text for a goal and sample row.
    async fn try_get_plan(
        &self,
        goal: &str,
        sample: &Row,
    ) -> Result<Option<String>, PlanSourceError>;
}

// ──────────────────────────────────────────────
// StaticPlanSource
// ──────────────────────────────────────────────

/// A plan source that returns a fixed response on every call. Useful
/// for tests and offline runs.
pub struct StaticPlanSource {
    response: Option<String>,
}

impl StaticPlanSource {
    /// Always returns the given plan text.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }

    /// Never returns a plan.
    pub fn empty() -> Self {
        Self { response: None }
    }
}

#[async_trait]
impl PlanSource for StaticPlanSource {
    async fn try_get_plan(
        &self,
        _goal: &str,
        _sample: &Row,
    ) -> Result<Option<String>, PlanSourceError> {
        Ok(self.response.clone())
    }
}

// ──────────────────────────────────────────────
// Fallback
// ──────────────────────────────────────────────

/// Where the final plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOrigin {
    /// The external provider's plan parsed and validated.
    Provider,
    /// The deterministic template synthesizer.
    Template,
}

/// Obtain a plan from the source, falling back to template synthesis.
///
/// The provider's text must parse as JSON, deserialize as a plan, and
/// pass structural validation; any failure (including a provider
/// error) falls back. This function never retries -- retry policy
/// belongs to the caller, informed by
/// [`PlanSourceError::is_retryable`].
pub async fn plan_or_synthesize(
    source: &dyn PlanSource,
    goal: &str,
    record_path: &str,
    sample: &Row,
) -> (TransformPlan, PlanOrigin) {
    match source.try_get_plan(goal, sample).await {
        Ok(Some(text)) => match parse_and_validate(&text) {
            Ok(plan) => return (plan, PlanOrigin::Provider),
            Err(reason) => {
                warn!(%reason, "provider plan rejected; synthesizing");
            }
        },
        Ok(None) => {}
        Err(e) => {
            warn!(error = %e, retryable = e.is_retryable(), "plan source failed; synthesizing");
        }
    }
    (synthesize(goal, record_path, sample), PlanOrigin::Template)
}

fn parse_and_validate(text: &str) -> Result<TransformPlan, String> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| format!("not JSON: {}", e))?;
    let plan = from_plan_json(&json).map_err(|e| e.to_string())?;
    validate(&plan).map_err(|e| e.to_string())?;
    Ok(plan)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
