//! Shared rounding and clamping policy.
//!
//! Every persisted number passes through [`round3`] when a struct is built, so
//! scores, stresses and energies never carry more than three decimals.

/// Rounds to three decimals (half away from zero). Non-finite input is returned unchanged.
#[must_use]
pub fn round3(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    (value * 1_000.0).round() / 1_000.0
}

/// Clamps `value` into `[min, max]`, using `fallback` when the value is missing or non-finite.
///
/// When `max < min` the lower bound wins.
#[must_use]
pub fn clamp_or(value: Option<f64>, min: f64, max: f64, fallback: f64) -> f64 {
    match value {
        Some(value) if value.is_finite() => clamp_bounds(value, min, max),
        _ => fallback,
    }
}

/// Rounds half-up to an integer and clamps, using `fallback` for missing or non-finite input.
#[must_use]
pub fn clamp_int_or(value: Option<f64>, min: i64, max: i64, fallback: i64) -> i64 {
    match value {
        Some(value) if value.is_finite() => {
            let rounded = round_half_up(value);
            let rounded = if rounded > i64::MAX as f64 {
                i64::MAX
            } else if rounded < i64::MIN as f64 {
                i64::MIN
            } else {
                rounded as i64
            };
            rounded.clamp(min, max.max(min))
        }
        _ => fallback,
    }
}

/// Clamps with the lower bound taking priority over an inverted upper bound.
#[must_use]
pub fn clamp_bounds(value: f64, min: f64, max: f64) -> f64 {
    if max < min {
        return min;
    }
    value.max(min).min(max)
}

/// Rounds `.5` toward positive infinity.
#[must_use]
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Arithmetic mean; zero for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
