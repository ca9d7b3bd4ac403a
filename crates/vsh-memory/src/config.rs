//! In-memory backend configuration and feed loading

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vsh_core::ControlDescriptor;

use crate::error::MemoryBackendError;

/// Configuration for a [`MemoryBackend`](crate::MemoryBackend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryBackendConfig {
    /// Initial data point values
    #[serde(default)]
    pub states: BTreeMap<String, Value>,

    /// Discovery feed
    #[serde(default)]
    pub controls: Vec<ControlDescriptor>,

    /// Simulated latency per call in milliseconds
    #[serde(default)]
    pub latency_ms: u64,

    /// Echo writes to subscribed points as acknowledged changes (default: true)
    #[serde(default = "default_auto_ack")]
    pub auto_ack: bool,
}

impl Default for MemoryBackendConfig {
    fn default() -> Self {
        Self {
            states: BTreeMap::new(),
            controls: Vec::new(),
            latency_ms: 0,
            auto_ack: default_auto_ack(),
        }
    }
}

fn default_auto_ack() -> bool {
    true
}

impl MemoryBackendConfig {
    /// Load from a `.toml`, `.yaml`/`.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MemoryBackendError> {
        parse_file(path.as_ref())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Feed {
    List(Vec<ControlDescriptor>),
    Wrapped { controls: Vec<ControlDescriptor> },
}

/// Load a standalone discovery feed.
///
/// YAML and JSON feeds may be a bare list; TOML feeds use `[[controls]]`.
pub fn load_feed(path: impl AsRef<Path>) -> Result<Vec<ControlDescriptor>, MemoryBackendError> {
    let feed: Feed = parse_file(path.as_ref())?;
    Ok(match feed {
        Feed::List(controls) | Feed::Wrapped { controls } => controls,
    })
}

fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T, MemoryBackendError> {
    let content = std::fs::read_to_string(path).map_err(|source| MemoryBackendError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_error = |message: String| MemoryBackendError::Parse {
        path: PathBuf::from(path),
        message,
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))
        }
        Some("json") => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
        _ => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
    }
}
