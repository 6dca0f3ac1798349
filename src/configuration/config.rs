use super::types::*;
use crate::error_handling::types::ConfigError;
use log::debug;
use serde::Deserialize;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

const MAX_TIMEOUT_SECONDS: f64 = 3600.0;

/// Application configuration structure that defines all runtime parameters.
///
/// Loaded from a TOML file whose sections map onto the fields below. Every section
/// and every key is optional; missing values fall back to the defaults of the
/// section type.
///
/// # Examples
///
/// ```
/// use vpnwatch::configuration::config::Config;
///
/// let config = Config::from_toml_str("[management]\nport = 7506\n").unwrap();
/// assert_eq!(config.management.port, 7506);
/// assert_eq!(config.recorder.poll_interval_seconds, 60);
/// ```
///
/// # Fields Overview
///
/// - `management`: host, port and timeouts of the daemon's management socket
/// - `recorder`: polling period of the background traffic recorder
/// - `storage`: location of the SQLite database holding traffic samples
/// - `web`: whether and where to expose the HTTP control API
#[derive(Debug, Default, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub management: ManagementConfig,
    pub recorder: RecorderConfig,
    pub storage: StorageConfig,
    pub web: WebConfig,
}

/// Values given on the command line (or through their environment variables) that
/// take precedence over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub mgmt_host: Option<String>,
    pub mgmt_port: Option<u16>,
    pub database_path: Option<PathBuf>,
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        debug!("Read {} byte(s) of configuration from {}", content.len(), path.display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies command-line overrides, then re-validates.
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self, ConfigError> {
        if let Some(host) = overrides.mgmt_host {
            self.management.host = host;
        }
        if let Some(port) = overrides.mgmt_port {
            self.management.port = port;
        }
        if let Some(path) = overrides.database_path {
            self.storage.database_path = path;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.management.host.trim().is_empty() {
            return Err(ConfigError::BadIPFormatting(
                "management host must not be empty".to_string(),
            ));
        }
        if self.management.port == 0 {
            return Err(ConfigError::BadPort("management port must not be 0".to_string()));
        }
        let timeout = self.management.timeout_seconds;
        if !timeout.is_finite() || timeout <= 0.0 || timeout > MAX_TIMEOUT_SECONDS {
            return Err(ConfigError::NotInRange(format!(
                "timeout_seconds must be in (0, {}], got {}",
                MAX_TIMEOUT_SECONDS, timeout
            )));
        }
        if self.management.banner_wait().as_secs_f64() >= timeout {
            return Err(ConfigError::NotInRange(format!(
                "banner_wait_ms ({}) must be shorter than the exchange timeout",
                self.management.banner_wait_ms
            )));
        }
        if self.recorder.poll_interval_seconds == 0 {
            return Err(ConfigError::NotInRange(
                "poll_interval_seconds must be at least 1".to_string(),
            ));
        }
        if self.web.enabled {
            self.web
                .bind_address
                .parse::<IpAddr>()
                .map_err(|e| ConfigError::BadIPFormatting(format!("{}: {}", self.web.bind_address, e)))?;
            if self.web.port == 0 {
                return Err(ConfigError::BadPort("web port must not be 0".to_string()));
            }
        }
        Ok(())
    }
}
