//! Score-detail normalization for review approvals.
//!
//! Reviewers may attach a per-item score breakdown alongside (or instead
//! of) a single total. Items arrive as loosely-typed JSON; normalization
//! validates each item, applies its percent weight, and derives the total.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// One raw breakdown item as submitted by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreItem {
    #[serde(default)]
    pub item_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    /// Raw score; must be a non-negative integer.
    #[serde(default)]
    pub score: Option<Value>,
    /// Percent weight; defaults to 100.
    #[serde(default)]
    pub weight: Option<i64>,
    #[serde(default)]
    pub max_score: Option<i64>,
}

/// A validated breakdown item with its weighted contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item_id: Option<i64>,
    pub title: Option<String>,
    pub score: i64,
    pub weight: i64,
    pub max_score: Option<i64>,
    pub weighted_score: i64,
}

fn item_label(index: usize, item: &ScoreItem) -> String {
    match &item.title {
        Some(t) if !t.is_empty() => format!("'{t}'"),
        _ => format!("#{}", index + 1),
    }
}

fn integer_score(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        // Tolerate numeric strings from older clients.
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Validate a score breakdown and derive the review's total score.
///
/// Each item's weighted contribution is `round(score * weight / 100)`,
/// rounded per item before summing. An `explicit_score` overrides the
/// summed total but the breakdown is still validated and stored.
pub fn normalize_score_details(
    explicit_score: Option<i64>,
    items: &[ScoreItem],
) -> Result<(Option<i64>, Vec<ScoredItem>), CoreError> {
    let mut scored = Vec::with_capacity(items.len());
    let mut total: i64 = 0;

    for (index, item) in items.iter().enumerate() {
        let label = item_label(index, item);

        let raw = item.score.as_ref().filter(|v| !v.is_null()).ok_or_else(|| {
            CoreError::Validation(format!("score item {label} is missing a score"))
        })?;
        let score = integer_score(raw).ok_or_else(|| {
            CoreError::Validation(format!("score item {label} has a non-integer score"))
        })?;
        if score < 0 {
            return Err(CoreError::Validation(format!(
                "score item {label} has a negative score"
            )));
        }
        if let Some(max) = item.max_score {
            if score > max {
                return Err(CoreError::Validation(format!(
                    "score item {label} exceeds its maximum of {max}"
                )));
            }
        }

        let weight = item.weight.unwrap_or(100);
        let weighted = ((score * weight) as f64 / 100.0).round() as i64;
        total += weighted;

        scored.push(ScoredItem {
            item_id: item.item_id,
            title: item.title.clone(),
            score,
            weight,
            max_score: item.max_score,
            weighted_score: weighted,
        });
    }

    let final_score = match explicit_score {
        Some(s) => Some(s),
        None if scored.is_empty() => None,
        None => Some(total),
    };

    Ok((final_score, scored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn item(score: Value, weight: Option<i64>, max: Option<i64>) -> ScoreItem {
        ScoreItem {
            item_id: None,
            title: None,
            score: Some(score),
            weight,
            max_score: max,
        }
    }

    #[test]
    fn test_weighted_total_rounds_per_item() {
        let items = [
            item(json!(80), Some(50), None),
            item(json!(60), Some(50), None),
        ];
        let (total, scored) = normalize_score_details(None, &items).unwrap();
        assert_eq!(total, Some(70));
        assert_eq!(scored[0].weighted_score, 40);
        assert_eq!(scored[1].weighted_score, 30);
    }

    #[test]
    fn test_weight_defaults_to_full() {
        let items = [item(json!(85), None, None)];
        let (total, scored) = normalize_score_details(None, &items).unwrap();
        assert_eq!(total, Some(85));
        assert_eq!(scored[0].weight, 100);
    }

    #[test]
    fn test_explicit_score_overrides_sum() {
        let items = [item(json!(80), Some(50), None)];
        let (total, scored) = normalize_score_details(Some(95), &items).unwrap();
        assert_eq!(total, Some(95));
        assert_eq!(scored[0].weighted_score, 40);
    }

    #[test]
    fn test_no_items_and_no_explicit_score_yields_none() {
        let (total, scored) = normalize_score_details(None, &[]).unwrap();
        assert_eq!(total, None);
        assert!(scored.is_empty());
    }

    #[test]
    fn test_numeric_string_scores_are_tolerated() {
        let items = [item(json!("72"), None, None)];
        let (total, _) = normalize_score_details(None, &items).unwrap();
        assert_eq!(total, Some(72));
    }

    #[test]
    fn test_missing_score_names_the_item() {
        let items = [ScoreItem {
            title: Some("Feasibility".into()),
            ..Default::default()
        }];
        let err = normalize_score_details(None, &items).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) => {
            assert!(msg.contains("'Feasibility'"));
            assert!(msg.contains("missing a score"));
        });
    }

    #[test]
    fn test_non_integer_score_is_rejected() {
        let items = [item(json!(80.5), None, None)];
        let err = normalize_score_details(None, &items).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) => {
            assert!(msg.contains("non-integer"));
        });
    }

    #[test]
    fn test_negative_score_is_rejected() {
        let items = [item(json!(-5), None, None)];
        assert_matches!(
            normalize_score_details(None, &items),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn test_score_above_max_names_the_limit() {
        let items = [item(json!(110), None, Some(100))];
        let err = normalize_score_details(None, &items).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) => {
            assert!(msg.contains("maximum of 100"));
        });
    }
}
