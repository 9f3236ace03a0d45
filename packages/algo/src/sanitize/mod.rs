//! Data Sanitization
//!
//! Input guards for callers of the difficulty engine.
//!
//! The engine trusts its inputs. Anything read from storage or a request
//! goes through here first:
//! - Accuracy histories (non-finite samples, out-of-range values)
//! - Severity scores
//! - Stored difficulty levels

use crate::types::{MAX_LEVEL, MIN_LEVEL, NEUTRAL_SEVERITY};

/// True if the slice contains NaN or an infinity
pub fn has_invalid_values(arr: &[f64]) -> bool {
    arr.iter().any(|&x| x.is_nan() || x.is_infinite())
}

/// Drops non-finite samples and clamps the rest into [0, 1], keeping order
pub fn sanitize_accuracies(history: &[f64]) -> Vec<f64> {
    history
        .iter()
        .copied()
        .filter(|x| x.is_finite())
        .map(|x| x.clamp(0.0, 1.0))
        .collect()
}

/// Severity outside 1..=5 falls back to the neutral value
pub fn normalize_severity(severity: i64) -> i32 {
    if (1..=5).contains(&severity) {
        severity as i32
    } else {
        NEUTRAL_SEVERITY
    }
}

/// Stored level forced into the engine's range
pub fn clamp_level(level: i64) -> i32 {
    level.clamp(MIN_LEVEL as i64, MAX_LEVEL as i64) as i32
}

/// A single accuracy sample is usable as-is
pub fn is_valid_accuracy(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_invalid_values() {
        assert!(!has_invalid_values(&[0.1, 0.9]));
        assert!(has_invalid_values(&[0.1, f64::NAN]));
        assert!(has_invalid_values(&[f64::INFINITY]));
    }

    #[test]
    fn test_sanitize_accuracies_keeps_order() {
        let cleaned = sanitize_accuracies(&[0.2, f64::NAN, 1.4, -0.1, 0.7]);
        assert_eq!(cleaned, vec![0.2, 1.0, 0.0, 0.7]);
    }

    #[test]
    fn test_normalize_severity() {
        assert_eq!(normalize_severity(1), 1);
        assert_eq!(normalize_severity(5), 5);
        assert_eq!(normalize_severity(0), 3);
        assert_eq!(normalize_severity(17), 3);
    }

    #[test]
    fn test_clamp_level() {
        assert_eq!(clamp_level(0), 1);
        assert_eq!(clamp_level(7), 7);
        assert_eq!(clamp_level(99), 10);
    }

    #[test]
    fn test_is_valid_accuracy() {
        assert!(is_valid_accuracy(0.0));
        assert!(is_valid_accuracy(1.0));
        assert!(!is_valid_accuracy(1.01));
        assert!(!is_valid_accuracy(f64::NAN));
    }
}
