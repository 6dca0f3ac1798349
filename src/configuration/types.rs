use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Where and how to reach the daemon's management interface.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct ManagementConfig {
    pub host: String,
    pub port: u16,
    /// Bound on one whole exchange: connect, greeting, command and reply.
    pub timeout_seconds: f64,
    /// How long to wait for more greeting bytes before sending the command anyway.
    pub banner_wait_ms: u64,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 7505,
            timeout_seconds: 5.0,
            banner_wait_ms: 250,
        }
    }
}

impl ManagementConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    pub fn banner_wait(&self) -> Duration {
        Duration::from_millis(self.banner_wait_ms)
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub poll_interval_seconds: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 60,
        }
    }
}

impl RecorderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("vpnwatch.sqlite3"),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: String::from("127.0.0.1"),
            port: 8000,
        }
    }
}
