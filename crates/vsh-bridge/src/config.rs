//! Bridge configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Manufacturer name announced in discovery
    #[serde(default = "default_manufacturer")]
    pub manufacturer_name: String,

    /// Write-quota ledger limits
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Discovery limits
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Defaults applied while wiring controls
    #[serde(default)]
    pub defaults: ControlDefaults,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            manufacturer_name: default_manufacturer(),
            rate_limit: RateLimitConfig::default(),
            discovery: DiscoveryConfig::default(),
            defaults: ControlDefaults::default(),
        }
    }
}

fn default_manufacturer() -> String {
    "vsh".to_string()
}

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Writes allowed per endpoint per hour (default: 60)
    #[serde(default = "default_hourly_limit")]
    pub hourly_limit: u32,

    /// Writes allowed across all endpoints per day (default: 1000)
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            hourly_limit: default_hourly_limit(),
            daily_limit: default_daily_limit(),
        }
    }
}

fn default_hourly_limit() -> u32 {
    60
}

fn default_daily_limit() -> u32 {
    1000
}

/// Discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Maximum endpoints returned in one discovery response (default: 300)
    #[serde(default = "default_max_endpoints")]
    pub max_endpoints: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_endpoints: default_max_endpoints(),
        }
    }
}

fn default_max_endpoints() -> usize {
    300
}

/// Temperature scale reported for sensor and setpoint values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemperatureScale {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureScale {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureScale::Celsius => "CELSIUS",
            TemperatureScale::Fahrenheit => "FAHRENHEIT",
        }
    }
}

/// Defaults used while wiring controls from descriptors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlDefaults {
    /// Level written when a dimmer without a power point is turned on (default: 100)
    #[serde(default = "default_dimmer_on_level")]
    pub dimmer_on_level: f64,

    /// Scale of temperature values (default: CELSIUS)
    #[serde(default)]
    pub temperature_scale: TemperatureScale,
}

impl Default for ControlDefaults {
    fn default() -> Self {
        Self {
            dimmer_on_level: default_dimmer_on_level(),
            temperature_scale: TemperatureScale::default(),
        }
    }
}

fn default_dimmer_on_level() -> f64 {
    100.0
}

impl BridgeConfig {
    /// Parse from a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the bridge cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.manufacturer_name.trim().is_empty() {
            return Err(ConfigError::Missing("manufacturer_name".to_string()));
        }
        if self.rate_limit.hourly_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "rate_limit.hourly_limit".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.rate_limit.daily_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "rate_limit.daily_limit".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.discovery.max_endpoints == 0 {
            return Err(ConfigError::Invalid {
                field: "discovery.max_endpoints".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        let level = self.defaults.dimmer_on_level;
        if level.is_nan() || level <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "defaults.dimmer_on_level".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}
