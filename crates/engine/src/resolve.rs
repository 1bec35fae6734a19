//! Field resolver: maps a requested field reference onto an actual field
//! present in a sample row.
//!
//! Requests arrive in whatever language, case, or naming convention the
//! goal author (or an external collaborator) used; the data has whatever
//! names the upstream API chose. Resolution order, first match wins:
//! exact, case-insensitive, alias table (both directions). Resolution
//! failure is never fatal -- the caller treats an unresolved field as
//! absent, producing null.

use crate::value::Row;
use serde::Serialize;

/// Outcome of one resolution attempt. Ephemeral: produced per lookup,
/// never cached across unrelated rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldResolution {
    pub original_field: String,
    pub resolved_field: String,
    pub resolved_path: String,
    pub was_resolved: bool,
    pub warnings: Vec<String>,
}

/// Fixed bidirectional dictionary of domain synonyms across languages.
/// Tried in both directions: a request for "nome" finds "name" and a
/// request for "name" finds "nome".
const ALIASES: &[(&str, &str)] = &[
    ("nome", "name"),
    ("cidade", "city"),
    ("preco", "price"),
    ("preço", "price"),
    ("valor", "value"),
    ("quantidade", "quantity"),
    ("descricao", "description"),
    ("descrição", "description"),
    ("categoria", "category"),
    ("data", "date"),
    ("estado", "state"),
    ("pais", "country"),
    ("país", "country"),
    ("temperatura", "temperature"),
    ("previsao", "forecast"),
    ("previsão", "forecast"),
    ("usuario", "user"),
    ("usuário", "user"),
    ("endereco", "address"),
    ("endereço", "address"),
    ("telefone", "phone"),
    ("idade", "age"),
];

/// Resolve a field reference against a sample row.
pub fn resolve_field(reference: &str, sample: &Row) -> FieldResolution {
    resolve_field_with(reference, sample, &[])
}

/// Resolve with caller-supplied alias pairs tried after the built-in
/// table (configuration extends, never overrides, the fixed dictionary).
pub fn resolve_field_with(
    reference: &str,
    sample: &Row,
    extra_aliases: &[(String, String)],
) -> FieldResolution {
    // 1. Exact match
    if sample.contains_key(reference) {
        return resolved(reference, reference);
    }

    // 2. Case-insensitive match
    if let Some(found) = find_case_insensitive(reference, sample) {
        return resolved(reference, &found);
    }

    // 3. Alias table, both directions; the alias target must itself be
    // present in the sample (exactly or case-insensitively).
    for candidate in alias_candidates(reference, extra_aliases) {
        if sample.contains_key(&candidate) {
            return resolved(reference, &candidate);
        }
        if let Some(found) = find_case_insensitive(&candidate, sample) {
            return resolved(reference, &found);
        }
    }

    FieldResolution {
        original_field: reference.to_string(),
        resolved_field: reference.to_string(),
        resolved_path: format!("/{}", reference),
        was_resolved: false,
        warnings: vec![format!(
            "field '{}' not found in sample row (checked exact, case-insensitive, and alias matches)",
            reference
        )],
    }
}

fn resolved(original: &str, field: &str) -> FieldResolution {
    FieldResolution {
        original_field: original.to_string(),
        resolved_field: field.to_string(),
        resolved_path: format!("/{}", field),
        was_resolved: true,
        warnings: Vec::new(),
    }
}

fn find_case_insensitive(reference: &str, sample: &Row) -> Option<String> {
    let lower = reference.to_lowercase();
    sample
        .keys()
        .find(|k| k.to_lowercase() == lower)
        .map(|k| k.to_string())
}

/// All alias targets for a reference, built-in table first, then
/// caller-supplied pairs, both directions, in table order.
fn alias_candidates(reference: &str, extra: &[(String, String)]) -> Vec<String> {
    let lower = reference.to_lowercase();
    let mut out = Vec::new();
    for (a, b) in ALIASES {
        if *a == lower {
            out.push(b.to_string());
        } else if *b == lower {
            out.push(a.to_string());
        }
    }
    for (a, b) in extra {
        if a.to_lowercase() == lower {
            out.push(b.clone());
        } else if b.to_lowercase() == lower {
            out.push(a.clone());
        }
    }
    out
}
