//! Mapping between backend ranges and the protocol's 0–100 domain

use serde_json::Value;

use crate::precision::Grid;

/// Lower bound of the normalized domain
pub const PERCENT_MIN: f64 = 0.0;
/// Upper bound of the normalized domain
pub const PERCENT_MAX: f64 = 100.0;

/// Map `value` from `[min, max]` into `0..=100`, rounded to an integer.
///
/// Returns `None` when `min >= max` or `value` lies outside `[min, max]`.
///
/// ```
/// # use vsh_conv::range::normalize;
/// assert_eq!(normalize(127.0, 0.0, 254.0), Some(50.0));
/// assert_eq!(normalize(300.0, 0.0, 254.0), None);
/// assert_eq!(normalize(5.0, 10.0, 10.0), None);
/// ```
pub fn normalize(value: f64, min: f64, max: f64) -> Option<f64> {
    if !(value.is_finite() && min.is_finite() && max.is_finite()) || min >= max {
        return None;
    }
    if value < min || value > max {
        return None;
    }
    Some(((value - min) / (max - min) * PERCENT_MAX).round())
}

/// Map a percentage back into `[min, max]`, rounded to the range's resolution.
///
/// Returns `None` when `min >= max` or `percent` lies outside `0..=100`.
///
/// ```
/// # use vsh_conv::range::denormalize;
/// assert_eq!(denormalize(50.0, 0.0, 254.0), Some(127.0));
/// assert_eq!(denormalize(30.0, 0.0, 1.0), Some(0.3));
/// ```
pub fn denormalize(percent: f64, min: f64, max: f64) -> Option<f64> {
    if !(percent.is_finite() && min.is_finite() && max.is_finite()) || min >= max {
        return None;
    }
    if !(PERCENT_MIN..=PERCENT_MAX).contains(&percent) {
        return None;
    }
    Some(Grid::for_range(min, max).snap(min + percent / PERCENT_MAX * (max - min)))
}

/// Clamp into the normalized domain
pub fn clamp_percent(value: f64) -> f64 {
    value.clamp(PERCENT_MIN, PERCENT_MAX)
}

/// Read a JSON value as a number, accepting numeric strings
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Read a JSON value as a boolean the way device backends tend to encode them
pub fn as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "on" | "yes"
        ),
        _ => false,
    }
}
