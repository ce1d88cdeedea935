//! # Configuration Management Module
//!
//! Persistent application settings stored in platform-appropriate locations.
//! Handles loading, saving, and providing defaults for configuration options.
//!
//! ## Settings
//! - `enable_autoconnect`: Connect to the first battery a scan finds
//! - `data_source`: `bluetooth` or `simulated` (simulated starts the mock on launch)
//! - `name_prefixes` / `exact_names`: Advertised names treated as batteries
//! - `scan_seconds`: How long a discovery scan listens
//! - `simulation_interval_ms`: Simulated telemetry period
//! - `capacity_ah`: Nominal pack capacity for time estimates
//!
//! ## Storage Location
//! - macOS: ~/Library/Application Support/ionic-monitor/config.toml
//! - Linux: ~/.config/ionic-monitor/config.toml
//! - Windows: %APPDATA%\ionic-monitor\config.toml

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Bluetooth,
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enable_autoconnect: bool,
    pub data_source: DataSource,
    pub name_prefixes: Vec<String>,
    pub exact_names: Vec<String>,
    pub scan_seconds: u64,
    pub simulation_interval_ms: u64,
    pub capacity_ah: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_autoconnect: true,
            data_source: DataSource::Bluetooth,
            name_prefixes: vec!["IC-".to_string(), "Ionic".to_string()],
            exact_names: vec!["IC-24V50-EP".to_string()],
            scan_seconds: 5,
            simulation_interval_ms: 2000,
            capacity_ah: 50.0,
        }
    }
}

impl Config {
    /// Get the path to the config file
    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ionic-monitor")
            .join("config.toml")
    }

    /// Load config from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config = toml::from_str(&contents)
                    .map_err(ConfigError::ParseFailed)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File doesn't exist, create default
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::ReadFailed(e)),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(ConfigError::WriteFailed)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(ConfigError::SerializeFailed)?;
        fs::write(path, toml_string)
            .map_err(ConfigError::WriteFailed)?;

        Ok(())
    }

    /// True if an advertised name belongs to a battery we know how to talk to
    pub fn matches_name(&self, name: &str) -> bool {
        self.exact_names.iter().any(|exact| exact == name)
            || self.name_prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
    }

    pub fn scan_window(&self) -> Duration {
        Duration::from_secs(self.scan_seconds.max(1))
    }

    pub fn simulation_interval(&self) -> Duration {
        Duration::from_millis(self.simulation_interval_ms.max(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.enable_autoconnect);
        assert_eq!(config.data_source, DataSource::Bluetooth);
        assert_eq!(config.simulation_interval(), Duration::from_secs(2));
        assert_eq!(config.capacity_ah, 50.0);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            enable_autoconnect: false,
            data_source: DataSource::Simulated,
            ..Config::default()
        };

        let toml_str = toml::to_string(&config).expect("Failed to serialize");
        assert!(toml_str.contains("enable_autoconnect = false"));
        assert!(toml_str.contains("data_source = \"simulated\""));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = r#"
            data_source = "simulated"
            scan_seconds = 10
        "#;

        let config: Config = toml::from_str(toml_str).expect("Failed to deserialize");
        assert_eq!(config.data_source, DataSource::Simulated);
        assert_eq!(config.scan_window(), Duration::from_secs(10));
        assert!(config.enable_autoconnect);
        assert_eq!(config.name_prefixes, vec!["IC-", "Ionic"]);
    }

    #[test]
    fn test_invalid_config_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "data_source = \"carrier pigeon\"").unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(ConfigError::ParseFailed(_))));
    }

    #[test]
    fn test_config_load_creates_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ionic-monitor").join("config.toml");

        let config = Config::load_from(&path).expect("Failed to load config");
        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn test_config_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config {
            enable_autoconnect: false,
            name_prefixes: vec!["BT_".to_string()],
            capacity_ah: 100.0,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_name_matching() {
        let config = Config::default();
        assert!(config.matches_name("IC-24V50-EP"));
        assert!(config.matches_name("IC-12V100"));
        assert!(config.matches_name("Ionic Lithium"));
        assert!(!config.matches_name("Polar H10 1234"));
        assert!(!config.matches_name("ic-lowercase"));
    }

    #[test]
    fn test_intervals_have_floor() {
        let config = Config {
            scan_seconds: 0,
            simulation_interval_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.scan_window(), Duration::from_secs(1));
        assert_eq!(config.simulation_interval(), Duration::from_millis(100));
    }
}
