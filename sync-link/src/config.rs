//! Configuration loading for devsync links.
//!
//! Configuration is loaded from a TOML file (default: `devsync.toml`).
//! Every field has a default, so an empty file is a valid configuration.

use devsync_core::{BatterySettings, LockSettings};
use devsync_types::DeviceId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkConfig {
    /// This device's identity.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Battery sync configuration.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Lock sync configuration.
    #[serde(default)]
    pub lock: LockConfig,
}

/// This device's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device identifier (default: random).
    #[serde(default = "DeviceId::random")]
    pub id: DeviceId,
    /// Human-readable device name (default: "devsync").
    #[serde(default = "default_device_name")]
    pub name: String,
}

/// Battery sync configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryConfig {
    /// Charge percentage below which a discharging battery is reported Low (default: 15).
    #[serde(default = "default_low_threshold")]
    pub low_threshold: i32,
    /// Push local battery status when a link connects (default: true).
    #[serde(default = "default_true")]
    pub push_on_connect: bool,
    /// Ask the peer for its battery status when a link connects (default: true).
    #[serde(default = "default_true")]
    pub request_on_connect: bool,
}

/// Lock sync configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    /// Ask the peer for its lock state when a link connects (default: true).
    #[serde(default = "default_true")]
    pub request_on_connect: bool,
}

// Default value functions
fn default_device_name() -> String {
    "devsync".to_string()
}

fn default_low_threshold() -> i32 {
    15
}

fn default_true() -> bool {
    true
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: DeviceId::random(),
            name: default_device_name(),
        }
    }
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            low_threshold: default_low_threshold(),
            push_on_connect: default_true(),
            request_on_connect: default_true(),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            request_on_connect: default_true(),
        }
    }
}

impl From<&BatteryConfig> for BatterySettings {
    fn from(config: &BatteryConfig) -> Self {
        Self {
            low_threshold: config.low_threshold,
            push_on_connect: config.push_on_connect,
            request_on_connect: config.request_on_connect,
        }
    }
}

impl From<&LockConfig> for LockSettings {
    fn from(config: &LockConfig) -> Self {
        Self {
            request_on_connect: config.request_on_connect,
        }
    }
}

impl LinkConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }

    /// Write as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        let write = |path: &Path| -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)
        };
        write(path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=100).contains(&self.battery.low_threshold) {
            return Err(ConfigError::Invalid(format!(
                "battery.low_threshold must be within 0..=100, got {}",
                self.battery.low_threshold
            )));
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to write configuration file.
    #[error("failed to write config file {path}: {source}")]
    WriteError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to render configuration.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] toml::ser::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = LinkConfig::default();
        assert_eq!(config.device.name, "devsync");
        assert_eq!(config.battery.low_threshold, 15);
        assert!(config.battery.push_on_connect);
        assert!(config.battery.request_on_connect);
        assert!(config.lock.request_on_connect);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[device]
id = "laptop_01"
name = "Laptop"

[battery]
low_threshold = 20
push_on_connect = false
request_on_connect = false

[lock]
request_on_connect = false
"#;

        let config: LinkConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.device.id.as_str(), "laptop_01");
        assert_eq!(config.device.name, "Laptop");
        assert_eq!(config.battery.low_threshold, 20);
        assert!(!config.battery.push_on_connect);
        assert!(!config.battery.request_on_connect);
        assert!(!config.lock.request_on_connect);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: LinkConfig = toml::from_str("").unwrap();
        assert_eq!(config.battery.low_threshold, 15);
        assert!(config.lock.request_on_connect);
        assert!(!config.device.id.as_str().is_empty());
    }

    #[test]
    fn invalid_device_id_is_rejected() {
        let toml = r#"
[device]
id = "not valid!"
"#;
        assert!(toml::from_str::<LinkConfig>(toml).is_err());
    }

    #[test]
    fn settings_follow_config() {
        let config = LinkConfig {
            battery: BatteryConfig {
                low_threshold: 30,
                push_on_connect: false,
                request_on_connect: true,
            },
            ..LinkConfig::default()
        };
        let battery = BatterySettings::from(&config.battery);
        assert_eq!(battery.low_threshold, 30);
        assert!(!battery.push_on_connect);
        assert!(battery.request_on_connect);
        assert!(LockSettings::from(&config.lock).request_on_connect);
    }

    #[test]
    fn out_of_range_threshold_fails_validation() {
        let mut config = LinkConfig::default();
        config.battery.low_threshold = 150;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("devsync.toml");

        let config = LinkConfig::default();
        config.save(&path).unwrap();
        let loaded = LinkConfig::from_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devsync.toml");
        std::fs::write(&path, "[battery]\nlow_threshold = -5\n").unwrap();

        assert!(matches!(
            LinkConfig::from_file(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = LinkConfig::from_file(Path::new("/nonexistent/devsync.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
