//! Practice Prioritisation
//!
//! Ranks deficit areas by how urgently they need practice and previews the
//! difficulty the engine would pick for each one.

use std::collections::BTreeMap;

use crate::difficulty::{analyze_trend, compute_difficulty};
use crate::types::{round_to, AreaHistory, AreaRecommendation, DifficultyPreview, Trend};

const SEVERITY_WEIGHT: i32 = 2;
const UNDER_PRACTICED_SESSIONS: usize = 3;
const UNDER_PRACTICED_BONUS: i32 = 3;
const LIGHTLY_PRACTICED_SESSIONS: usize = 5;
const LIGHTLY_PRACTICED_BONUS: i32 = 1;
const DECLINING_BONUS: i32 = 2;
const MOMENTUM_BONUS: i32 = 1;
const MASTERED_ACCURACY: f64 = 0.90;
const MASTERED_SESSIONS: usize = 10;
const MASTERED_PENALTY: i32 = 2;

/// Priority score for a single area, floored at 1
pub fn area_priority(severity: i32, accuracies: &[f64], trend: Trend) -> i32 {
    let sessions = accuracies.len();
    let mut score = severity * SEVERITY_WEIGHT;

    if sessions < UNDER_PRACTICED_SESSIONS {
        score += UNDER_PRACTICED_BONUS;
    } else if sessions < LIGHTLY_PRACTICED_SESSIONS {
        score += LIGHTLY_PRACTICED_BONUS;
    }

    if trend == Trend::Declining {
        score += DECLINING_BONUS;
    }

    if trend == Trend::Improving && sessions >= 2 && accuracies[sessions - 1] > accuracies[sessions - 2] {
        score += MOMENTUM_BONUS;
    }

    if mean(accuracies) > MASTERED_ACCURACY && sessions >= MASTERED_SESSIONS {
        score -= MASTERED_PENALTY;
    }

    score.max(1)
}

/// Ranks areas by descending priority.
///
/// The sort is stable: areas with equal priority keep their input order.
pub fn prioritize_areas(areas: &[AreaHistory]) -> Vec<AreaRecommendation> {
    let mut ranked: Vec<AreaRecommendation> = areas
        .iter()
        .map(|history| {
            let trend = analyze_trend(&history.accuracies);
            AreaRecommendation {
                area: history.area.clone(),
                severity: history.severity,
                priority: area_priority(history.severity, &history.accuracies, trend),
                sessions_completed: history.accuracies.len(),
                avg_accuracy: round_to(mean(&history.accuracies), 2),
                trend,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.priority.cmp(&a.priority));
    ranked
}

/// Current and engine-recommended level for every area, keyed by area name
pub fn difficulty_preview(
    age: i32,
    current_levels: &BTreeMap<String, i32>,
    areas: &[AreaHistory],
) -> BTreeMap<String, DifficultyPreview> {
    areas
        .iter()
        .map(|history| {
            let current_level = current_levels.get(&history.area).copied().unwrap_or(1);
            let recent = &history.accuracies;
            let preview = DifficultyPreview {
                area: history.area.clone(),
                current_level,
                recommended_level: compute_difficulty(age, history.severity, current_level, recent),
                recent_accuracy: if recent.is_empty() {
                    None
                } else {
                    Some(round_to(mean(recent), 2))
                },
                trend: analyze_trend(recent),
                sessions_completed: recent.len(),
            };
            (history.area.clone(), preview)
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
