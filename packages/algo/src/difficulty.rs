//! Adaptive Difficulty Engine
//!
//! Picks the next difficulty level (1-10) for one student in one deficit area.
//!
//! Two branches:
//! - **Cold start**: no history, the level comes from age and severity only
//! - **Warm history**: the current level moves by a bounded delta derived from
//!   recency-weighted accuracy, streaks over the last three sessions and the
//!   half-to-half trend
//!
//! Every function here is pure and total over finite inputs.

use crate::types::{
    SessionParameters, Trend, DECLINE_CLAMP_ACCURACY, DECREASE_THRESHOLD,
    IMPROVE_NUDGE_ACCURACY, INCREASE_THRESHOLD, MAX_LEVEL, MIN_LEVEL,
    MIN_SESSIONS_BEFORE_INCREASE, MIN_TREND_SAMPLES, STREAK_HIGH, STREAK_LOW, STREAK_WINDOW,
    TREND_DELTA,
};

/// Starting level for an age bracket
pub fn base_level_for_age(age: i32) -> i32 {
    match age {
        ..=5 => 1,
        6..=7 => 2,
        8..=9 => 3,
        10..=11 => 4,
        12..=13 => 5,
        _ => 6,
    }
}

/// Severity 3 is neutral, milder deficits start higher, severe ones lower
pub fn severity_adjustment(severity: i32) -> f64 {
    match severity {
        1 => 1.0,
        2 => 0.5,
        3 => 0.0,
        4 => -0.5,
        5 => -1.0,
        _ => 0.0,
    }
}

/// Recency-weighted mean: sample `i` of `n` carries weight `(i + 1) / n`.
///
/// `None` for an empty history.
pub fn weighted_accuracy(history: &[f64]) -> Option<f64> {
    if history.is_empty() {
        return None;
    }

    let n = history.len() as f64;
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for (i, acc) in history.iter().enumerate() {
        let weight = (i as f64 + 1.0) / n;
        weighted_sum += acc * weight;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        Some(weighted_sum / total_weight)
    } else {
        None
    }
}

/// Compares the mean of the second half of the history with the first half.
///
/// The split point is `len / 2`, so an odd-length history puts the extra
/// sample in the second half.
pub fn analyze_trend(history: &[f64]) -> Trend {
    if history.len() < MIN_TREND_SAMPLES {
        return Trend::InsufficientData;
    }

    let mid = history.len() / 2;
    let (first, second) = history.split_at(mid);
    let diff = mean(second) - mean(first);

    if diff > TREND_DELTA {
        Trend::Improving
    } else if diff < -TREND_DELTA {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Next difficulty level for a student/area pair.
///
/// `history` holds completed-session accuracies oldest first. With an empty
/// history `current_level` is ignored.
pub fn compute_difficulty(age: i32, severity: i32, current_level: i32, history: &[f64]) -> i32 {
    if history.is_empty() {
        return cold_start_level(age, severity);
    }

    let Some(weighted) = weighted_accuracy(history) else {
        return current_level;
    };

    let warmed_up = history.len() >= MIN_SESSIONS_BEFORE_INCREASE;

    let mut delta = if warmed_up && weighted > INCREASE_THRESHOLD {
        1
    } else if weighted < DECREASE_THRESHOLD {
        -1
    } else {
        0
    };

    if history.len() >= STREAK_WINDOW {
        let tail = &history[history.len() - STREAK_WINDOW..];
        if tail.iter().all(|&a| a < STREAK_LOW) {
            delta = -2;
        } else if warmed_up && tail.iter().all(|&a| a > STREAK_HIGH) {
            delta = 2;
        }
    }

    match analyze_trend(history) {
        Trend::Declining if weighted < DECLINE_CLAMP_ACCURACY => {
            delta = delta.min(-1);
        }
        Trend::Improving if weighted > IMPROVE_NUDGE_ACCURACY && warmed_up && delta == 0 => {
            delta = 1;
        }
        _ => {}
    }

    (current_level + delta).clamp(MIN_LEVEL, MAX_LEVEL)
}

/// Session sizing for a difficulty level
pub fn session_parameters(level: i32) -> SessionParameters {
    SessionParameters {
        item_count: (8 + level * 2).clamp(10, 30),
        time_limit_seconds: (30 - level * 2).max(5),
        hints_available: (5 - level / 2).max(0),
        distractor_count: (1 + level / 3).min(3),
    }
}

fn cold_start_level(age: i32, severity: i32) -> i32 {
    let raw = base_level_for_age(age) as f64 + severity_adjustment(severity);
    // The sum is never negative, so truncation is a floor.
    (raw as i32).clamp(MIN_LEVEL, MAX_LEVEL)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
