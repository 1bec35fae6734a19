//! Record path discovery: scan a JSON document for the best candidate
//! location of a homogeneous array of row-like objects.
//!
//! Every array node in the document becomes a candidate; a pure scoring
//! function ranks them. Ties break on depth (shallower wins), then on
//! first-seen document order, so discovery is fully deterministic.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Errors from discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoverError {
    /// No array of objects (and no root array) anywhere in the document.
    /// An expected outcome for malformed or irrelevant inputs.
    NoRecordsetFound,
}

impl fmt::Display for DiscoverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoverError::NoRecordsetFound => {
                write!(f, "no recordset found: document contains no array of objects")
            }
        }
    }
}

impl std::error::Error for DiscoverError {}

/// One candidate location. Ephemeral: produced during discovery, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPathCandidate {
    /// JSON Pointer to the array ("" for a root-level array).
    pub path: String,
    pub array_length: usize,
    /// Fields per element (first object element), 0 if elements are
    /// primitives.
    pub object_field_count: usize,
    pub score: f64,
}

/// Discovery outcome: the winning path plus the full ranked candidate
/// list for inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discovery {
    pub record_path: String,
    pub score: f64,
    pub candidates: Vec<RecordPathCandidate>,
}

/// Well-known collection field names that earn a fixed bonus.
const COLLECTION_WORDS: &[&str] = &[
    "items", "results", "data", "records", "list", "rows", "entries", "values", "forecast",
    "products", "users",
];

/// Score a candidate. Pure: same inputs, same score.
///
/// Components: capped array-length contribution, a large fixed bonus for
/// arrays of objects (and penalty for arrays of primitives), a fixed
/// bonus for well-known collection names, and a goal-text boost that is
/// strong enough to dominate the collection-word bonus (the same
/// document resolves differently under different phrasings).
pub fn score_candidate(
    array_length: usize,
    object_field_count: usize,
    name: Option<&str>,
    ancestors: &[String],
    goal_text: Option<&str>,
) -> f64 {
    let mut score = (array_length.min(100) as f64) * 0.05;

    if object_field_count > 0 {
        score += 5.0 + (object_field_count.min(20) as f64) * 0.25;
    } else {
        score -= 5.0;
    }

    if let Some(n) = name {
        if COLLECTION_WORDS.contains(&n.to_lowercase().as_str()) {
            score += 3.0;
        }
    }

    if let Some(goal) = goal_text {
        let tokens = goal_tokens(goal);
        let own_match = name.is_some_and(|n| tokens.contains(&n.to_lowercase()));
        if own_match {
            score += 6.0;
        } else if ancestors
            .iter()
            .any(|a| tokens.contains(&a.to_lowercase()))
        {
            score += 2.0;
        }
    }

    score
}

fn goal_tokens(goal: &str) -> Vec<String> {
    goal.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Escape one JSON Pointer segment (RFC 6901).
fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Find the best record path in a document.
pub fn discover(document: &Value, goal_text: Option<&str>) -> Result<Discovery, DiscoverError> {
    let mut candidates = Vec::new();
    walk(document, &mut Vec::new(), goal_text, &mut candidates);

    // Rank: score desc, depth asc, document order asc.
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        let (ca, cb) = (&candidates[a], &candidates[b]);
        cb.score
            .partial_cmp(&ca.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| depth_of(&ca.path).cmp(&depth_of(&cb.path)))
            .then_with(|| a.cmp(&b))
    });
    let ranked: Vec<RecordPathCandidate> = order.iter().map(|&i| candidates[i].clone()).collect();

    // Only an array of objects -- or a root array -- may win.
    let winner = ranked
        .iter()
        .find(|c| c.object_field_count > 0 || c.path.is_empty())
        .ok_or(DiscoverError::NoRecordsetFound)?;

    debug!(
        path = %winner.path,
        score = winner.score,
        candidates = ranked.len(),
        "record path discovered"
    );

    Ok(Discovery {
        record_path: winner.path.clone(),
        score: winner.score,
        candidates: ranked,
    })
}

fn depth_of(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.matches('/').count()
    }
}

fn walk(
    node: &Value,
    segments: &mut Vec<String>,
    goal_text: Option<&str>,
    out: &mut Vec<RecordPathCandidate>,
) {
    match node {
        Value::Array(elements) => {
            let field_count = elements
                .iter()
                .find_map(|e| e.as_object())
                .map_or(0, |o| o.len());
            let name = segments.last().map(|s| s.as_str());
            let ancestors: Vec<String> = if segments.is_empty() {
                Vec::new()
            } else {
                segments[..segments.len() - 1].to_vec()
            };
            let score =
                score_candidate(elements.len(), field_count, name, &ancestors, goal_text);
            let path = segments
                .iter()
                .map(|s| format!("/{}", escape_segment(s)))
                .collect::<String>();
            out.push(RecordPathCandidate {
                path,
                array_length: elements.len(),
                object_field_count: field_count,
                score,
            });

            for (i, elem) in elements.iter().enumerate() {
                segments.push(i.to_string());
                walk(elem, segments, goal_text, out);
                segments.pop();
            }
        }
        Value::Object(fields) => {
            for (key, child) in fields {
                segments.push(key.clone());
                walk(child, segments, goal_text, out);
                segments.pop();
            }
        }
        // Primitives have no children and are never candidates.
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}
