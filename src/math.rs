//! Guarded arithmetic helpers used for every ratio in the pipeline.
//!
//! Division by zero, a missing denominator, or a non-finite operand is a
//! defined outcome here, not an error: the caller supplies the default.

pub fn safe_divide(numerator: f64, denominator: f64, default: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return default;
    }
    numerator / denominator
}

/// Percentage change `((new - old) / old) * 100`, with `default` returned when
/// the old value is zero or not finite.
pub fn safe_pct_change(new_value: f64, old_value: f64, default: f64) -> f64 {
    if old_value == 0.0 || !old_value.is_finite() || !new_value.is_finite() {
        return default;
    }
    ((new_value - old_value) / old_value) * 100.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
