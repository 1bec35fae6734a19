//! Template synthesizer: deterministically build a plan from a goal
//! description when no external collaborator supplied one (or as the
//! validation fallback when what it supplied does not parse).
//!
//! Templates are tried in fixed priority order, most specific first;
//! the first match wins. This is a design decision, not a scored
//! contest: a goal that names an aggregation gets the aggregation
//! template even when it also happens to mention selectable fields.

use crate::resolve::resolve_field;
use crate::value::Row;
use tabula_plan::{
    FieldSpec, MetricFn, MetricSpec, PlanStep, RecordSource, TransformPlan, PLAN_VERSION,
};
use tracing::debug;

/// Aggregation keywords and the metric each one requests. Trigger-only
/// words (group, grouped) carry no metric.
const AGG_KEYWORDS: &[(&str, Option<MetricFn>)] = &[
    ("group", None),
    ("grouped", None),
    ("sum", Some(MetricFn::Sum)),
    ("total", Some(MetricFn::Sum)),
    ("count", Some(MetricFn::Count)),
    ("average", Some(MetricFn::Avg)),
    ("avg", Some(MetricFn::Avg)),
    ("mean", Some(MetricFn::Avg)),
    ("min", Some(MetricFn::Min)),
    ("minimum", Some(MetricFn::Min)),
    ("lowest", Some(MetricFn::Min)),
    ("max", Some(MetricFn::Max)),
    ("maximum", Some(MetricFn::Max)),
    ("highest", Some(MetricFn::Max)),
];

/// Synthesize a plan for a goal against a discovered record path and
/// sample row.
pub fn synthesize(goal_text: &str, record_path: &str, sample: &Row) -> TransformPlan {
    let tokens = tokenize(goal_text);
    let mentioned = mentioned_fields(&tokens, sample);

    let steps = if let Some(steps) = template_group_aggregate(&tokens, &mentioned) {
        debug!(template = "group-aggregate", "goal names an aggregation");
        steps
    } else if !mentioned.is_empty() {
        debug!(template = "select-mentioned", fields = mentioned.len(), "goal names fields");
        vec![PlanStep::Select {
            fields: mentioned
                .iter()
                .map(|(_, f)| FieldSpec {
                    from: f.clone(),
                    alias: f.clone(),
                })
                .collect(),
        }]
    } else if !sample.is_empty() {
        debug!(template = "select-all", "defaulting to select-all");
        vec![PlanStep::Select {
            fields: sample
                .keys()
                .map(|k| FieldSpec {
                    from: k.clone(),
                    alias: k.clone(),
                })
                .collect(),
        }]
    } else {
        // No sample fields to enumerate: pass rows through unchanged.
        debug!(template = "select-all", "empty sample; passing rows through");
        Vec::new()
    };

    TransformPlan {
        plan_version: PLAN_VERSION.to_string(),
        source: RecordSource {
            record_path: record_path.to_string(),
        },
        steps,
    }
}

fn tokenize(goal: &str) -> Vec<String> {
    goal.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Token positions that resolve to sample-row fields (directly or via
/// alias), deduplicated by resolved field, in token order.
fn mentioned_fields(tokens: &[String], sample: &Row) -> Vec<(usize, String)> {
    let mut out: Vec<(usize, String)> = Vec::new();
    for (pos, token) in tokens.iter().enumerate() {
        let res = resolve_field(token, sample);
        if res.was_resolved && !out.iter().any(|(_, f)| *f == res.resolved_field) {
            out.push((pos, res.resolved_field));
        }
    }
    out
}

/// The group-aggregate template: triggered by an aggregation keyword in
/// the goal. Builds groupBy over the grouping dimension (the field named
/// after "by", else the first mentioned field left over) plus one metric
/// per keyword/field pair.
fn template_group_aggregate(
    tokens: &[String],
    mentioned: &[(usize, String)],
) -> Option<Vec<PlanStep>> {
    let keywords: Vec<(usize, Option<MetricFn>)> = tokens
        .iter()
        .enumerate()
        .filter_map(|(pos, t)| {
            AGG_KEYWORDS
                .iter()
                .find(|(kw, _)| *kw == t.as_str())
                .map(|(_, func)| (pos, *func))
        })
        .collect();
    if keywords.is_empty() {
        return None;
    }

    // Grouping dimension: the first field mentioned after a "by" token.
    let group_key = tokens
        .iter()
        .position(|t| t == "by")
        .and_then(|by_pos| {
            mentioned
                .iter()
                .find(|(pos, _)| *pos > by_pos)
                .map(|(_, f)| f.clone())
        });

    // One metric per keyword: value metrics pair with the nearest
    // following mentioned field (skipping the grouping dimension);
    // count needs no field; a value metric with no field is skipped.
    let mut metrics: Vec<MetricSpec> = Vec::new();
    for (pos, func) in &keywords {
        let Some(func) = func else { continue };
        let spec = match func {
            MetricFn::Count => MetricSpec {
                alias: "count".to_string(),
                func: MetricFn::Count,
                field: None,
            },
            _ => {
                let target = mentioned
                    .iter()
                    .find(|(p, f)| *p > *pos && Some(f) != group_key.as_ref())
                    .map(|(_, f)| f.clone());
                match target {
                    Some(field) => MetricSpec {
                        alias: format!("{}_{}", func.as_str(), field),
                        func: *func,
                        field: Some(field),
                    },
                    None => continue,
                }
            }
        };
        if !metrics.iter().any(|m| m.alias == spec.alias) {
            metrics.push(spec);
        }
    }

    // Fall back to the field left over when "by" was never said.
    let group_key = group_key.or_else(|| {
        mentioned
            .iter()
            .find(|(_, f)| !metrics.iter().any(|m| m.field.as_ref() == Some(f)))
            .map(|(_, f)| f.clone())
    });

    if metrics.is_empty() {
        metrics.push(MetricSpec {
            alias: "count".to_string(),
            func: MetricFn::Count,
            field: None,
        });
    }

    let mut steps = Vec::new();
    if let Some(key) = group_key {
        steps.push(PlanStep::GroupBy { keys: vec![key] });
    }
    steps.push(PlanStep::Aggregate { metrics });
    Some(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(fields: &[&str]) -> Row {
        let mut row = Row::new();
        for f in fields {
            row.insert(f.to_string(), json!(1));
        }
        row
    }

    #[test]
    fn select_all_template_selects_every_sample_field() {
        let plan = synthesize("export everything", "/items", &sample(&["a", "b", "c"]));
        assert_eq!(plan.plan_version, PLAN_VERSION);
        assert_eq!(plan.source.record_path, "/items");
        match &plan.steps[0] {
            PlanStep::Select { fields } => {
                let names: Vec<_> = fields.iter().map(|f| f.from.as_str()).collect();
                assert_eq!(names, vec!["a", "b", "c"]);
            }
            other => panic!("expected Select, got {:?}", other),
        }
    }

    #[test]
    fn select_all_with_empty_sample_passes_rows_through() {
        let plan = synthesize("export everything", "", &Row::new());
        assert!(plan.steps.is_empty());
    }

    #[test]
    fn select_mentioned_fields_in_order() {
        let plan = synthesize(
            "show price and name",
            "",
            &sample(&["name", "price", "stock"]),
        );
        match &plan.steps[0] {
            PlanStep::Select { fields } => {
                let names: Vec<_> = fields.iter().map(|f| f.from.as_str()).collect();
                assert_eq!(names, vec!["price", "name"]);
            }
            other => panic!("expected Select, got {:?}", other),
        }
    }

    #[test]
    fn mentioned_fields_resolve_through_aliases() {
        // "preco" in the goal matches the sample's "price".
        let plan = synthesize("exportar preco", "", &sample(&["name", "price"]));
        match &plan.steps[0] {
            PlanStep::Select { fields } => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].from, "price");
            }
            other => panic!("expected Select, got {:?}", other),
        }
    }

    #[test]
    fn group_aggregate_with_sum() {
        let plan = synthesize(
            "sum value by category",
            "",
            &sample(&["category", "value", "id"]),
        );
        assert_eq!(plan.steps.len(), 2);
        match &plan.steps[0] {
            PlanStep::GroupBy { keys } => assert_eq!(keys, &vec!["category".to_string()]),
            other => panic!("expected GroupBy, got {:?}", other),
        }
        match &plan.steps[1] {
            PlanStep::Aggregate { metrics } => {
                assert_eq!(metrics.len(), 1);
                assert_eq!(metrics[0].func, MetricFn::Sum);
                assert_eq!(metrics[0].field.as_deref(), Some("value"));
                assert_eq!(metrics[0].alias, "sum_value");
            }
            other => panic!("expected Aggregate, got {:?}", other),
        }
    }

    #[test]
    fn count_metric_needs_no_field() {
        let plan = synthesize("count rows by category", "", &sample(&["category", "value"]));
        match &plan.steps[1] {
            PlanStep::Aggregate { metrics } => {
                assert_eq!(metrics[0].func, MetricFn::Count);
                assert!(metrics[0].field.is_none());
            }
            other => panic!("expected Aggregate, got {:?}", other),
        }
    }

    #[test]
    fn aggregation_without_group_key_covers_whole_set() {
        let plan = synthesize("average price", "", &sample(&["name", "price"]));
        assert_eq!(plan.steps.len(), 1);
        match &plan.steps[0] {
            PlanStep::Aggregate { metrics } => {
                assert_eq!(metrics[0].func, MetricFn::Avg);
                assert_eq!(metrics[0].field.as_deref(), Some("price"));
            }
            other => panic!("expected Aggregate, got {:?}", other),
        }
    }

    #[test]
    fn valueless_sum_falls_back_to_count() {
        // "sum" with no resolvable target field: the metric is skipped
        // and the count fallback applies.
        let plan = synthesize("sum by category", "", &sample(&["category"]));
        match plan.steps.last().unwrap() {
            PlanStep::Aggregate { metrics } => {
                assert_eq!(metrics.len(), 1);
                assert_eq!(metrics[0].func, MetricFn::Count);
            }
            other => panic!("expected Aggregate, got {:?}", other),
        }
    }

    #[test]
    fn multiple_metrics_from_one_goal() {
        let plan = synthesize(
            "sum value and count by category",
            "",
            &sample(&["category", "value"]),
        );
        match &plan.steps[1] {
            PlanStep::Aggregate { metrics } => {
                assert_eq!(metrics.len(), 2);
                assert_eq!(metrics[0].func, MetricFn::Sum);
                assert_eq!(metrics[1].func, MetricFn::Count);
            }
            other => panic!("expected Aggregate, got {:?}", other),
        }
    }

    #[test]
    fn aggregation_template_beats_field_selection() {
        // Both a group keyword and mentioned fields: aggregation wins.
        let plan = synthesize(
            "group by category and show value",
            "",
            &sample(&["category", "value"]),
        );
        assert!(plan
            .steps
            .iter()
            .any(|s| matches!(s, PlanStep::GroupBy { .. })));
        assert!(!plan
            .steps
            .iter()
            .any(|s| matches!(s, PlanStep::Select { .. })));
    }

    #[test]
    fn synthesis_is_deterministic() {
        let s = sample(&["category", "value"]);
        let a = synthesize("sum value by category", "/items", &s);
        let b = synthesize("sum value by category", "/items", &s);
        assert_eq!(a, b);
    }

    #[test]
    fn synthesized_plans_validate() {
        let goals = [
            "export everything",
            "show price and name",
            "sum value by category",
            "count by category",
            "average price",
        ];
        for goal in goals {
            let plan = synthesize(goal, "", &sample(&["name", "price", "category", "value"]));
            tabula_plan::validate(&plan)
                .unwrap_or_else(|e| panic!("goal '{}' produced invalid plan: {}", goal, e));
        }
    }
}
