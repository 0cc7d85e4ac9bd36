//! Daemon configuration
//!
//! Per-device constants that vary between panel SKUs: the FOD sensor
//! position/size reported to the system UI, and which illumination driver
//! the panel was built with. Loaded once at startup from a JSON file;
//! missing or malformed config degrades to the built-in defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default config path for a system daemon install.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fodhapticd/config.json";

fn default_pos_x() -> i32 {
    444
}
fn default_pos_y() -> i32 {
    1966
}
fn default_size() -> i32 {
    190
}

/// How the panel illuminates the under-display sensor.
///
/// Mutually exclusive hardware configurations selected when the panel
/// firmware was built: either the daemon toggles a dedicated sysfs
/// illumination node on press, or the system UI boosts panel brightness
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IlluminationDriver {
    /// The daemon writes the panel's FOD illumination node directly.
    Sysfs,
    /// The system UI boosts panel brightness; no sysfs node exists.
    #[default]
    Boost,
}

/// FOD sensor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FodConfig {
    /// Sensor center X on the panel, in pixels.
    #[serde(default = "default_pos_x")]
    pub position_x: i32,

    /// Sensor center Y on the panel, in pixels.
    #[serde(default = "default_pos_y")]
    pub position_y: i32,

    /// Sensor illumination circle diameter, in pixels.
    #[serde(default = "default_size")]
    pub size: i32,

    /// Illumination driver the panel was built with.
    #[serde(default)]
    pub illumination: IlluminationDriver,
}

impl Default for FodConfig {
    fn default() -> Self {
        Self {
            position_x: default_pos_x(),
            position_y: default_pos_y(),
            size: default_size(),
            illumination: IlluminationDriver::Boost,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// FOD sensor settings.
    #[serde(default)]
    pub fod: FodConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        serde_json::from_str(&contents).map_err(ConfigError::ParseError)
    }

    /// Load from `path`, falling back to defaults when the file is missing
    /// or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "Configuration loaded");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Using default configuration");
                Self::default()
            }
        }
    }
}

/// Configuration error type.
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "I/O error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.fod.position_x, 444);
        assert_eq!(config.fod.position_y, 1966);
        assert_eq!(config.fod.size, 190);
        assert_eq!(config.fod.illumination, IlluminationDriver::Boost);
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config =
            serde_json::from_str(r#"{"fod": {"illumination": "sysfs"}}"#).unwrap();
        assert_eq!(config.fod.illumination, IlluminationDriver::Sysfs);
        // Unspecified fields keep their defaults.
        assert_eq!(config.fod.position_x, 444);
        assert_eq!(config.fod.size, 190);
    }

    #[test]
    fn test_parse_full_config() {
        let config: Config = serde_json::from_str(
            r#"{"fod": {"position_x": 540, "position_y": 2100, "size": 200, "illumination": "boost"}}"#,
        )
        .unwrap();
        assert_eq!(config.fod.position_x, 540);
        assert_eq!(config.fod.position_y, 2100);
        assert_eq!(config.fod.size, 200);
        assert_eq!(config.fod.illumination, IlluminationDriver::Boost);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let config = Config::load_or_default(Path::new("/nonexistent/config.json"));
        assert_eq!(config.fod.position_x, 444);
    }
}
