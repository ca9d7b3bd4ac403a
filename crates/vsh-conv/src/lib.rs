//! vsh-conv - Value-domain conversions for the voice smart-home bridge
//!
//! The voice protocol speaks in fixed domains: percentages 0–100, `"ON"`/`"OFF"`,
//! kelvin, HSB colour objects and enumerated mode names. Device backends speak
//! in whatever their hardware exposes: raw levels 0–254, booleans, mireds,
//! `#rrggbb` strings. This crate maps between the two.
//!
//! # Features
//!
//! - **Range scaling** - `normalize`/`denormalize` between `[min, max]` and 0–100
//! - **Precision-aware numbers** - no `0.30000000000000004` on the wire
//! - **Colour** - HSB ↔ RGB hex, kelvin ↔ mired, the colour-temperature step table
//! - **Conversion strategies** - [`Conversion`] values bound to each property
//!
//! # Quick Start
//!
//! ```rust
//! use vsh_conv::Conversion;
//! use serde_json::json;
//!
//! // A dimmer level point ranging 0..254
//! let brightness = Conversion::Percent { min: 0.0, max: 254.0 };
//!
//! assert_eq!(brightness.to_backend(&json!(50)).unwrap(), json!(127));
//! assert_eq!(brightness.to_protocol(&json!(254)).unwrap(), json!(100));
//! ```
//!
//! # Conversions
//!
//! | Strategy | Protocol | Backend |
//! |----------|----------|---------|
//! | Power | `"ON"`/`"OFF"` | switch value |
//! | LevelPower | `"ON"`/`"OFF"` | level (on level / minimum) |
//! | Percent | 0–100 | `[min, max]` |
//! | Kelvin | kelvin | kelvin or mired |
//! | HsbParts | HSB object | hue, saturation, brightness points |
//! | HexColor | HSB object | `#rrggbb` |
//! | Lookup | enum name | enum value |

pub mod color;
pub mod conversion;
pub mod error;
pub mod precision;
pub mod range;

// Re-export main types
pub use color::{Hsb, COLOR_TEMPERATURE_STEPS};
pub use conversion::{loose_eq, Conversion, OFF, ON};
pub use error::{ConvError, ConvResult};
pub use precision::{round_for_step, to_json_number, Grid};
pub use range::{as_bool, as_number, clamp_percent, denormalize, normalize};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::conversion::Conversion;
    pub use crate::error::{ConvError, ConvResult};
    pub use crate::range::{denormalize, normalize};
}
