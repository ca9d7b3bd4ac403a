//! Conversion strategies between protocol values and backend values
//!
//! A [`Conversion`] is a plain value: every parameter it needs (ranges, on/off
//! encodings, lookup tables) is captured when the control is wired, and both
//! directions are pure functions of the input.

use serde_json::{json, Map, Value};

use crate::color::{self, Hsb};
use crate::error::{ConvError, ConvResult};
use crate::precision::{round_for_step, to_json_number, to_json_stepped};
use crate::range::{as_bool, as_number, denormalize, normalize};

/// Protocol literal for a powered-on state
pub const ON: &str = "ON";
/// Protocol literal for a powered-off state
pub const OFF: &str = "OFF";

/// How a property's protocol value maps onto its backend data point
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    /// Values pass through untouched
    Identity,

    /// `"ON"`/`"OFF"` over a switch point written with `on`/`off`
    Power { on: Value, off: Value },

    /// `"ON"`/`"OFF"` over a level point: ON writes `on_level`, OFF writes
    /// `off_level`, anything above `off_level` reads as ON
    LevelPower { on_level: f64, off_level: f64 },

    /// `"ON"`/`"OFF"` over a mode point: OFF writes `off`, ON writes `on`
    /// (the control substitutes the remembered mode before writing)
    ModePower { on: Value, off: Value },

    /// Protocol booleans over a backend flag
    Flag,

    /// 0–100 percent over a numeric `[min, max]` range
    Percent { min: f64, max: f64 },

    /// 0–100 percent absorbed by a switch: anything above 0 switches on
    PercentSwitch,

    /// Kelvin over a kelvin or mired point, clamped to the backend range
    Kelvin { mired: bool, min: f64, max: f64 },

    /// Protocol colour over separate hue, saturation and brightness points.
    ///
    /// The backend value is an object keyed `hue`, `saturation` and
    /// `brightness`, each scaled to its point's range. Components without a
    /// range are not written and read back as full.
    HsbParts {
        hue: (f64, f64),
        saturation: Option<(f64, f64)>,
        brightness: Option<(f64, f64)>,
    },

    /// Protocol colour over a `#rrggbb` point
    HexColor,

    /// Enumerated protocol values over enumerated backend values.
    /// Pairs are `(protocol, backend)`.
    Lookup(Vec<(Value, Value)>),

    /// Plain number, clamped to optional bounds
    Numeric { min: Option<f64>, max: Option<f64> },
}

impl Conversion {
    /// Protocol value → backend value
    pub fn to_backend(&self, value: &Value) -> ConvResult<Value> {
        match self {
            Conversion::Identity => Ok(value.clone()),
            Conversion::Power { on, off } | Conversion::ModePower { on, off } => {
                if power_literal(value)? {
                    Ok(on.clone())
                } else {
                    Ok(off.clone())
                }
            }
            Conversion::LevelPower {
                on_level,
                off_level,
            } => {
                let level = if power_literal(value)? {
                    *on_level
                } else {
                    *off_level
                };
                Ok(to_json_number(level))
            }
            Conversion::Flag => Ok(Value::Bool(as_bool(value))),
            Conversion::Percent { min, max } => {
                let percent = number(value)?;
                check_range(*min, *max)?;
                denormalize(percent, *min, *max)
                    .map(to_json_number)
                    .ok_or(ConvError::OutOfRange {
                        value: percent,
                        min: 0.0,
                        max: 100.0,
                    })
            }
            Conversion::PercentSwitch => Ok(Value::Bool(number(value)? > 0.0)),
            Conversion::Kelvin { mired, min, max } => {
                let kelvin = number(value)?;
                let raw = if *mired {
                    color::kelvin_mired(kelvin)
                } else {
                    kelvin
                };
                Ok(to_json_number(raw.clamp(*min, *max).round()))
            }
            Conversion::HsbParts {
                hue,
                saturation,
                brightness,
            } => {
                let hsb = Hsb::from_json(value)?;
                let (min, max) = *hue;
                check_range(min, max)?;
                let mut parts = Map::new();
                parts.insert(
                    "hue".to_string(),
                    to_json_stepped(min + hsb.hue / 360.0 * (max - min), (max - min) / 360.0),
                );
                if let Some(range) = saturation {
                    parts.insert("saturation".to_string(), unit_to_range(hsb.saturation, *range)?);
                }
                if let Some(range) = brightness {
                    parts.insert("brightness".to_string(), unit_to_range(hsb.brightness, *range)?);
                }
                Ok(Value::Object(parts))
            }
            Conversion::HexColor => {
                let hsb = Hsb::from_json(value)?;
                Ok(Value::String(color::format_hex_rgb(color::hsb_to_rgb(hsb))))
            }
            Conversion::Lookup(table) => table
                .iter()
                .find(|(protocol, _)| loose_eq(protocol, value))
                .map(|(_, backend)| backend.clone())
                .ok_or_else(|| ConvError::UnknownValue(value.clone())),
            Conversion::Numeric { min, max } => {
                Ok(to_json_number(clamp_optional(number(value)?, *min, *max)))
            }
        }
    }

    /// Backend value → protocol value
    pub fn to_protocol(&self, value: &Value) -> ConvResult<Value> {
        match self {
            Conversion::Identity => Ok(value.clone()),
            Conversion::Power { off, .. } => Ok(power_value(is_on(value, off))),
            Conversion::ModePower { off, .. } => {
                Ok(power_value(!value.is_null() && !loose_eq(value, off)))
            }
            Conversion::LevelPower { off_level, .. } => {
                let level = as_number(value).unwrap_or(*off_level);
                Ok(power_value(level > *off_level))
            }
            Conversion::Flag => Ok(Value::Bool(as_bool(value))),
            Conversion::Percent { min, max } => {
                check_range(*min, *max)?;
                let raw = number(value)?;
                normalize(raw.clamp(*min, *max), *min, *max)
                    .map(to_json_number)
                    .ok_or(ConvError::OutOfRange {
                        value: raw,
                        min: *min,
                        max: *max,
                    })
            }
            Conversion::PercentSwitch => {
                Ok(to_json_number(if as_bool(value) { 100.0 } else { 0.0 }))
            }
            Conversion::Kelvin { mired, .. } => {
                let raw = number(value)?;
                let kelvin = if *mired {
                    color::kelvin_mired(raw)
                } else {
                    raw
                };
                Ok(to_json_number(kelvin.round()))
            }
            Conversion::HsbParts {
                hue,
                saturation,
                brightness,
            } => {
                let (min, max) = *hue;
                check_range(min, max)?;
                let raw = value
                    .get("hue")
                    .and_then(as_number)
                    .ok_or_else(|| ConvError::InvalidColor(value.to_string()))?
                    .clamp(min, max);
                let hue = round_for_step((raw - min) / (max - min) * 360.0, 0.1);
                Ok(Hsb::new(
                    hue,
                    range_to_unit(value.get("saturation"), *saturation)?,
                    range_to_unit(value.get("brightness"), *brightness)?,
                )
                .to_json())
            }
            Conversion::HexColor => {
                let text = value
                    .as_str()
                    .ok_or_else(|| ConvError::InvalidColor(value.to_string()))?;
                Ok(color::rgb_to_hsb(color::parse_hex_rgb(text)?).to_json())
            }
            Conversion::Lookup(table) => lookup_protocol(table, value),
            Conversion::Numeric { .. } => Ok(to_json_number(number(value)?)),
        }
    }

    /// Whether the protocol domain of this conversion is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Conversion::Percent { .. }
                | Conversion::PercentSwitch
                | Conversion::Kelvin { .. }
                | Conversion::Numeric { .. }
        )
    }
}

fn number(value: &Value) -> ConvResult<f64> {
    as_number(value).ok_or_else(|| ConvError::NotNumeric(value.clone()))
}

fn check_range(min: f64, max: f64) -> ConvResult<()> {
    if min < max {
        Ok(())
    } else {
        Err(ConvError::InvalidRange { min, max })
    }
}

/// 0–1 colour component → backend range
fn unit_to_range(unit: f64, (min, max): (f64, f64)) -> ConvResult<Value> {
    check_range(min, max)?;
    denormalize(unit * 100.0, min, max)
        .map(to_json_number)
        .ok_or(ConvError::OutOfRange {
            value: unit,
            min: 0.0,
            max: 1.0,
        })
}

/// Backend range → 0–1 colour component; missing parts are full
fn range_to_unit(raw: Option<&Value>, range: Option<(f64, f64)>) -> ConvResult<f64> {
    let (Some(raw), Some((min, max))) = (raw, range) else {
        return Ok(1.0);
    };
    check_range(min, max)?;
    let raw = number(raw)?.clamp(min, max);
    Ok(normalize(raw, min, max).map_or(1.0, |percent| percent / 100.0))
}

fn clamp_optional(value: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let value = min.map_or(value, |min| value.max(min));
    max.map_or(value, |max| value.min(max))
}

fn power_value(on: bool) -> Value {
    json!(if on { ON } else { OFF })
}

/// Parse `"ON"`/`"OFF"` (booleans accepted as well)
fn power_literal(value: &Value) -> ConvResult<bool> {
    match value {
        Value::String(s) if s.eq_ignore_ascii_case(ON) => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case(OFF) => Ok(false),
        Value::Bool(b) => Ok(*b),
        other => Err(ConvError::UnknownValue(other.clone())),
    }
}

/// Booleans compare by truthiness, numbers against the off encoding
fn is_on(value: &Value, off: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        other => match (as_number(other), as_number(off)) {
            (Some(v), Some(off)) => v != off,
            _ => as_bool(other),
        },
    }
}

/// Loose equality between JSON scalars: `1 == "1"`, `true == "true"`
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.eq_ignore_ascii_case(y),
        (Value::Bool(x), other) | (other, Value::Bool(x)) => match other {
            Value::Number(_) | Value::String(_) => {
                as_number(other).map(|n| (n != 0.0) == *x).unwrap_or(false)
                    || as_bool(other) == *x && other.as_str().is_some_and(is_bool_word)
            }
            _ => false,
        },
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
            _ => false,
        },
    }
}

fn is_bool_word(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "false" | "on" | "off"
    )
}

/// Exact match first, then the numerically nearest entry
fn lookup_protocol(table: &[(Value, Value)], value: &Value) -> ConvResult<Value> {
    if let Some((protocol, _)) = table.iter().find(|(_, backend)| loose_eq(backend, value)) {
        return Ok(protocol.clone());
    }
    let Some(raw) = as_number(value).filter(|_| !value.is_boolean()) else {
        return Err(ConvError::UnknownValue(value.clone()));
    };
    table
        .iter()
        .filter_map(|(protocol, backend)| {
            as_number(backend)
                .filter(|_| !backend.is_boolean())
                .map(|b| (protocol, (b - raw).abs()))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(protocol, _)| protocol.clone())
        .ok_or_else(|| ConvError::UnknownValue(value.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_power_switch() {
        let conv = Conversion::Power {
            on: json!(true),
            off: json!(false),
        };
        assert_eq!(conv.to_backend(&json!("ON")).unwrap(), json!(true));
        assert_eq!(conv.to_backend(&json!("OFF")).unwrap(), json!(false));
        assert_eq!(conv.to_protocol(&json!(true)).unwrap(), json!("ON"));
        assert_eq!(conv.to_protocol(&json!(0)).unwrap(), json!("OFF"));
        assert_eq!(conv.to_protocol(&json!(1)).unwrap(), json!("ON"));
        assert_eq!(conv.to_protocol(&Value::Null).unwrap(), json!("OFF"));
        assert!(conv.to_backend(&json!("MAYBE")).is_err());
    }

    #[test]
    fn test_level_power() {
        let conv = Conversion::LevelPower {
            on_level: 100.0,
            off_level: 0.0,
        };
        assert_eq!(conv.to_backend(&json!("ON")).unwrap(), json!(100));
        assert_eq!(conv.to_backend(&json!("OFF")).unwrap(), json!(0));
        assert_eq!(conv.to_protocol(&json!(37)).unwrap(), json!("ON"));
        assert_eq!(conv.to_protocol(&json!(0)).unwrap(), json!("OFF"));
    }

    #[test]
    fn test_mode_power() {
        let conv = Conversion::ModePower {
            on: json!(1),
            off: json!(0),
        };
        assert_eq!(conv.to_backend(&json!("OFF")).unwrap(), json!(0));
        assert_eq!(conv.to_protocol(&json!(3)).unwrap(), json!("ON"));
        assert_eq!(conv.to_protocol(&json!("0")).unwrap(), json!("OFF"));
    }

    #[test]
    fn test_percent_scaling() {
        let conv = Conversion::Percent {
            min: 0.0,
            max: 254.0,
        };
        assert_eq!(conv.to_backend(&json!(50)).unwrap(), json!(127));
        assert_eq!(conv.to_protocol(&json!(254)).unwrap(), json!(100));
        // backend overshoot is clamped before normalizing
        assert_eq!(conv.to_protocol(&json!(300)).unwrap(), json!(100));
        assert!(conv.to_backend(&json!(150)).is_err());
        assert!(conv.to_backend(&json!("bright")).is_err());
    }

    #[test]
    fn test_percent_degenerate_range() {
        let conv = Conversion::Percent { min: 5.0, max: 5.0 };
        assert_eq!(
            conv.to_protocol(&json!(5)),
            Err(ConvError::InvalidRange { min: 5.0, max: 5.0 })
        );
    }

    #[test]
    fn test_percent_switch() {
        let conv = Conversion::PercentSwitch;
        assert_eq!(conv.to_backend(&json!(30)).unwrap(), json!(true));
        assert_eq!(conv.to_backend(&json!(0)).unwrap(), json!(false));
        assert_eq!(conv.to_protocol(&json!(true)).unwrap(), json!(100));
    }

    #[test]
    fn test_kelvin_and_mired() {
        let kelvin = Conversion::Kelvin {
            mired: false,
            min: 2200.0,
            max: 6500.0,
        };
        assert_eq!(kelvin.to_backend(&json!(7000)).unwrap(), json!(6500));
        assert_eq!(kelvin.to_protocol(&json!(4000)).unwrap(), json!(4000));

        let mired = Conversion::Kelvin {
            mired: true,
            min: 153.0,
            max: 500.0,
        };
        assert_eq!(mired.to_backend(&json!(2500)).unwrap(), json!(400));
        assert_eq!(mired.to_protocol(&json!(250)).unwrap(), json!(4000));
    }

    #[test]
    fn test_hsb_hue_only() {
        let conv = Conversion::HsbParts {
            hue: (0.0, 65535.0),
            saturation: None,
            brightness: None,
        };
        let blue = json!({"hue": 240, "saturation": 0.5, "brightness": 1});
        let backend = conv.to_backend(&blue).unwrap();
        assert_eq!(backend, json!({"hue": 43690}));
        assert_eq!(
            conv.to_protocol(&backend).unwrap(),
            json!({"hue": 240.0, "saturation": 1.0, "brightness": 1.0})
        );
    }

    #[test]
    fn test_hsb_all_parts() {
        let conv = Conversion::HsbParts {
            hue: (0.0, 360.0),
            saturation: Some((0.0, 254.0)),
            brightness: Some((0.0, 100.0)),
        };
        let color = json!({"hue": 120, "saturation": 0.5, "brightness": 0.25});
        assert_eq!(
            conv.to_backend(&color).unwrap(),
            json!({"hue": 120, "saturation": 127, "brightness": 25})
        );
        assert_eq!(
            conv.to_protocol(&json!({"hue": 120, "saturation": 254, "brightness": 20}))
                .unwrap(),
            json!({"hue": 120.0, "saturation": 1.0, "brightness": 0.2})
        );
        // unread parts fall back to full
        assert_eq!(
            conv.to_protocol(&json!({"hue": 0})).unwrap(),
            json!({"hue": 0.0, "saturation": 1.0, "brightness": 1.0})
        );
        assert!(conv.to_protocol(&json!(120)).is_err());
    }

    #[test]
    fn test_hex_color() {
        let conv = Conversion::HexColor;
        let red = json!({"hue": 0, "saturation": 1, "brightness": 1});
        assert_eq!(conv.to_backend(&red).unwrap(), json!("#ff0000"));
        assert_eq!(
            conv.to_protocol(&json!("#00ff00")).unwrap(),
            json!({"hue": 120.0, "saturation": 1.0, "brightness": 1.0})
        );
        assert!(conv.to_protocol(&json!(42)).is_err());
    }

    #[test]
    fn test_lookup_exact_and_nearest() {
        let conv = Conversion::Lookup(vec![
            (json!("Position.Up"), json!(100)),
            (json!("Position.Down"), json!(0)),
        ]);
        assert_eq!(conv.to_backend(&json!("Position.Up")).unwrap(), json!(100));
        assert_eq!(conv.to_protocol(&json!("0")).unwrap(), json!("Position.Down"));
        assert_eq!(conv.to_protocol(&json!(70)).unwrap(), json!("Position.Up"));
        assert!(conv.to_backend(&json!("Position.Middle")).is_err());
    }

    #[test]
    fn test_lookup_over_booleans() {
        let conv = Conversion::Lookup(vec![
            (json!("LOCKED"), json!(false)),
            (json!("UNLOCKED"), json!(true)),
        ]);
        assert_eq!(conv.to_backend(&json!("LOCKED")).unwrap(), json!(false));
        assert_eq!(conv.to_protocol(&json!(true)).unwrap(), json!("UNLOCKED"));
        assert_eq!(conv.to_protocol(&json!(0)).unwrap(), json!("LOCKED"));
        assert!(conv.to_protocol(&json!("jammed")).is_err());
    }

    #[test]
    fn test_numeric_clamps() {
        let conv = Conversion::Numeric {
            min: Some(5.0),
            max: Some(30.0),
        };
        assert_eq!(conv.to_backend(&json!(35)).unwrap(), json!(30));
        assert_eq!(conv.to_backend(&json!(21.5)).unwrap(), json!(21.5));
        assert_eq!(conv.to_protocol(&json!("19")).unwrap(), json!(19));
    }

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!(true), &json!(1)));
        assert!(loose_eq(&json!(false), &json!("false")));
        assert!(loose_eq(&json!("auto"), &json!("AUTO")));
        assert!(!loose_eq(&json!(true), &json!("open")));
        assert!(!loose_eq(&json!(2), &json!("two")));
    }
}
