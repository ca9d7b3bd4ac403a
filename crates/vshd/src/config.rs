//! Daemon configuration file

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use vsh_bridge::BridgeConfig;
use vsh_memory::MemoryBackendConfig;

/// `vshd.toml`: a `[bridge]` and a `[backend]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub backend: MemoryBackendConfig,
}

impl DaemonConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config
            .bridge
            .validate()
            .with_context(|| format!("Invalid bridge config in {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use vsh_bridge::TemperatureScale;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_sections() {
        let file = write_config(
            r#"
[bridge]
manufacturer_name = "Home"

[bridge.rate_limit]
hourly_limit = 10

[bridge.defaults]
temperature_scale = "FAHRENHEIT"

[backend]
auto_ack = false

[[backend.controls]]
id = "plug"
type = "socket"

[backend.controls.states.SET]
id = "plug.on"
type = "boolean"
"#,
        );

        let config = DaemonConfig::load(file.path()).unwrap();
        assert_eq!(config.bridge.manufacturer_name, "Home");
        assert_eq!(config.bridge.rate_limit.hourly_limit, 10);
        assert_eq!(config.bridge.rate_limit.daily_limit, 1000);
        assert_eq!(
            config.bridge.defaults.temperature_scale,
            TemperatureScale::Fahrenheit
        );
        assert!(!config.backend.auto_ack);
        assert_eq!(config.backend.controls[0].id, "plug");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        assert_eq!(DaemonConfig::load(file.path()).unwrap(), DaemonConfig::default());
    }

    #[test]
    fn test_invalid_bridge_config_is_fatal() {
        let file = write_config("[bridge.rate_limit]\ndaily_limit = 0\n");
        let err = DaemonConfig::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid bridge config"));
    }
}
