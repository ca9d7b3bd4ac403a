//! Decimal grids for backend values
//!
//! A percentage mapped into `[min, max]` lands on `127.50000000001` or
//! `0.30000000000000004`. A [`Grid`] snaps such values to the decimals one
//! percent of the range can actually express, and [`to_json_number`] emits
//! integers where the result has no fraction.

use serde_json::Value;

/// Decimal grid values are snapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    decimals: u8,
}

impl Grid {
    const MAX_DECIMALS: u8 = 6;

    /// Grid of one percent of `[min, max]`
    pub fn for_range(min: f64, max: f64) -> Self {
        Self::for_step((max - min) / 100.0)
    }

    /// Whole numbers for steps of one or more, else as many decimals as the
    /// shortest decimal form of `step` has
    ///
    /// ```
    /// # use vsh_conv::precision::Grid;
    /// assert_eq!(Grid::for_range(0.0, 254.0).decimals(), 0);
    /// assert_eq!(Grid::for_range(0.0, 1.0).decimals(), 2);
    /// assert_eq!(Grid::for_step(0.25).decimals(), 2);
    /// ```
    pub fn for_step(step: f64) -> Self {
        let step = step.abs();
        if step >= 1.0 {
            return Self { decimals: 0 };
        }
        if step == 0.0 || !step.is_finite() {
            return Self {
                decimals: Self::MAX_DECIMALS,
            };
        }
        // f64 Display prints the shortest form that reads back exactly
        let text = step.to_string();
        let fraction = text.split_once('.').map_or(0, |(_, digits)| digits.len());
        Self {
            decimals: u8::try_from(fraction)
                .unwrap_or(Self::MAX_DECIMALS)
                .min(Self::MAX_DECIMALS),
        }
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn snap(&self, value: f64) -> f64 {
        let factor = 10_f64.powi(i32::from(self.decimals));
        (value * factor).round() / factor
    }
}

/// Snap `value` to the grid of `step`
pub fn round_for_step(value: f64, step: f64) -> f64 {
    Grid::for_step(step).snap(value)
}

/// Emit a number as JSON, as an integer when it has no fractional part
pub fn to_json_number(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return Value::from(value as i64);
    }
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Snap to the grid of `step`, then emit as JSON
pub fn to_json_stepped(value: f64, step: f64) -> Value {
    to_json_number(round_for_step(value, step))
}
