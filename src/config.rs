use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::scale::RadiusPresets;
use crate::view::MapViewConfig;

/// Runtime configuration, loaded from an optional JSON file.
///
/// ```json
/// {
///   "radius": { "unfiltered": [0, 25], "filtered": [3, 50] },
///   "map": { "center": [-71.09415, 42.36027], "zoom": 12 },
///   "http": { "timeout_secs": 30 }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BikewatchConfig {
    #[serde(default)]
    pub radius: RadiusPresets,
    #[serde(default)]
    pub map: MapViewConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds (default: 30)
    #[serde(default = "HttpConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Connect timeout in seconds (default: 10)
    #[serde(default = "HttpConfig::default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout_secs(),
            connect_timeout_secs: Self::default_connect_timeout_secs(),
        }
    }
}

impl HttpConfig {
    fn default_timeout_secs() -> u64 {
        30
    }
    fn default_connect_timeout_secs() -> u64 {
        10
    }
}

impl BikewatchConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
