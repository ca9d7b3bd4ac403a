//! Colour helpers: HSB ↔ RGB and colour temperature
//!
//! The protocol expresses colour as `{hue: 0..360, saturation: 0..1, brightness: 0..1}`
//! and colour temperature in kelvin. Backends use `#rrggbb` strings, hue
//! degrees in their own range, kelvin or mireds.

use serde::{Deserialize, Serialize};

use crate::error::{ConvError, ConvResult};

/// Colour temperatures the protocol steps through on increase/decrease
pub const COLOR_TEMPERATURE_STEPS: [u32; 5] = [2200, 2700, 4000, 5500, 7000];

/// Protocol colour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsb {
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
}

impl Hsb {
    pub fn new(hue: f64, saturation: f64, brightness: f64) -> Self {
        Self {
            hue,
            saturation,
            brightness,
        }
    }

    /// Parse from a JSON object, validating component ranges
    pub fn from_json(value: &serde_json::Value) -> ConvResult<Self> {
        let hsb: Hsb = serde_json::from_value(value.clone())
            .map_err(|e| ConvError::InvalidColor(format!("{value}: {e}")))?;
        if !(0.0..=360.0).contains(&hsb.hue)
            || !(0.0..=1.0).contains(&hsb.saturation)
            || !(0.0..=1.0).contains(&hsb.brightness)
        {
            return Err(ConvError::InvalidColor(value.to_string()));
        }
        Ok(hsb)
    }

    pub fn to_json(self) -> serde_json::Value {
        serde_json::json!({
            "hue": round3(self.hue),
            "saturation": round3(self.saturation),
            "brightness": round3(self.brightness),
        })
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Convert HSB to 8-bit RGB
pub fn hsb_to_rgb(color: Hsb) -> [u8; 3] {
    let h = (color.hue % 360.0) / 60.0;
    let s = color.saturation;
    let v = color.brightness;

    let c = v * s;
    let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    ]
}

/// Convert 8-bit RGB to HSB
pub fn rgb_to_hsb(rgb: [u8; 3]) -> Hsb {
    let r = f64::from(rgb[0]) / 255.0;
    let g = f64::from(rgb[1]) / 255.0;
    let b = f64::from(rgb[2]) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    Hsb::new(hue, saturation, max)
}

/// Parse `#rrggbb` (leading `#` optional)
pub fn parse_hex_rgb(s: &str) -> ConvResult<[u8; 3]> {
    let digits = s.trim().trim_start_matches('#');
    let bytes = hex::decode(digits).map_err(|_| ConvError::InvalidColor(s.to_string()))?;
    <[u8; 3]>::try_from(bytes.as_slice()).map_err(|_| ConvError::InvalidColor(s.to_string()))
}

/// Format as `#rrggbb`
pub fn format_hex_rgb(rgb: [u8; 3]) -> String {
    format!("#{}", hex::encode(rgb))
}

/// Kelvin ↔ mired (the conversion is its own inverse)
pub fn kelvin_mired(value: f64) -> f64 {
    if value <= 0.0 {
        0.0
    } else {
        (1_000_000.0 / value).round()
    }
}

/// Index of the table entry closest to `kelvin`
pub fn nearest_step_index(kelvin: f64) -> usize {
    let mut best = 0;
    let mut best_distance = f64::MAX;
    for (i, step) in COLOR_TEMPERATURE_STEPS.iter().enumerate() {
        let distance = (f64::from(*step) - kelvin).abs();
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

/// Next warmer (`up = false`) or cooler (`up = true`) table entry from `kelvin`
pub fn step_color_temperature(kelvin: f64, up: bool) -> u32 {
    let index = nearest_step_index(kelvin);
    let last = COLOR_TEMPERATURE_STEPS.len() - 1;
    let next = if up {
        (index + 1).min(last)
    } else {
        index.saturating_sub(1)
    };
    COLOR_TEMPERATURE_STEPS[next]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primary_colors() {
        assert_eq!(hsb_to_rgb(Hsb::new(0.0, 1.0, 1.0)), [255, 0, 0]);
        assert_eq!(hsb_to_rgb(Hsb::new(120.0, 1.0, 1.0)), [0, 255, 0]);
        assert_eq!(hsb_to_rgb(Hsb::new(240.0, 1.0, 1.0)), [0, 0, 255]);
        assert_eq!(hsb_to_rgb(Hsb::new(0.0, 0.0, 1.0)), [255, 255, 255]);
    }

    #[test]
    fn test_rgb_to_hsb() {
        let hsb = rgb_to_hsb([0, 0, 255]);
        assert_eq!(hsb.hue, 240.0);
        assert_eq!(hsb.saturation, 1.0);
        assert_eq!(hsb.brightness, 1.0);

        let grey = rgb_to_hsb([0, 0, 0]);
        assert_eq!(grey.saturation, 0.0);
    }

    #[test]
    fn test_hex_roundtrip() {
        assert_eq!(parse_hex_rgb("#ff8000").unwrap(), [255, 128, 0]);
        assert_eq!(format_hex_rgb([255, 128, 0]), "#ff8000");
        assert!(parse_hex_rgb("#ff80").is_err());
        assert!(parse_hex_rgb("zzzzzz").is_err());
    }

    #[test]
    fn test_hsb_from_json_validates() {
        assert!(Hsb::from_json(&json!({"hue": 350.5, "saturation": 0.7, "brightness": 0.6})).is_ok());
        assert!(Hsb::from_json(&json!({"hue": 400, "saturation": 0.7, "brightness": 0.6})).is_err());
        assert!(Hsb::from_json(&json!("red")).is_err());
    }

    #[test]
    fn test_color_temperature_steps() {
        assert_eq!(step_color_temperature(2700.0, true), 4000);
        assert_eq!(step_color_temperature(2700.0, false), 2200);
        assert_eq!(step_color_temperature(7000.0, true), 7000);
        assert_eq!(step_color_temperature(2000.0, false), 2200);
        // 3000K is closest to 2700K
        assert_eq!(step_color_temperature(3000.0, true), 4000);
    }

    #[test]
    fn test_kelvin_mired() {
        assert_eq!(kelvin_mired(2000.0), 500.0);
        assert_eq!(kelvin_mired(500.0), 2000.0);
    }
}
