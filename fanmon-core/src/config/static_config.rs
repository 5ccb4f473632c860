//! Static configuration loaded once at startup
//!
//! This configuration is read-only after the daemon starts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use super::paths::{default_data_dir, default_fan_config_path};
use crate::error::FanMonError;

/// Mode the monitor runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    /// Sensors seed their functional state from the inventory
    Init,
    /// Sensors start functional
    #[default]
    Monitor,
}

impl FromStr for MonitorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "init" => Ok(MonitorMode::Init),
            "monitor" => Ok(MonitorMode::Monitor),
            other => Err(format!("unknown mode '{}' (expected init or monitor)", other)),
        }
    }
}

impl MonitorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorMode::Init => "init",
            MonitorMode::Monitor => "monitor",
        }
    }
}

impl std::fmt::Display for MonitorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server hostname
    pub hostname: String,
    /// Server port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

/// Hardware polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Interval between tach input/target reads
    pub tach_interval_ms: u64,
    /// Interval between presence re-evaluations (GPIO lines are not event driven)
    pub presence_interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            tach_interval_ms: 1000,
            presence_interval_ms: 5000,
        }
    }
}

/// Static configuration for the fanmon daemon.
///
/// This is loaded once at startup and remains immutable during runtime.
/// Located at `~/.config/fanmon/config.toml` by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticConfig {
    /// Fan definition file (YAML, or JSON by extension)
    #[serde(default = "default_fan_config_path")]
    pub fan_config: PathBuf,

    /// Directory for the inventory snapshot and error log
    ///
    /// Defaults to `~/.local/share/fanmon` (XDG data directory).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub mode: MonitorMode,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub poll: PollConfig,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            fan_config: default_fan_config_path(),
            data_dir: default_data_dir(),
            mode: MonitorMode::default(),
            server: ServerConfig::default(),
            poll: PollConfig::default(),
        }
    }
}

impl StaticConfig {
    /// Create a new StaticConfig with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Parse StaticConfig from TOML string.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize StaticConfig to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Reject values the daemon cannot run with
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.poll.tach_interval_ms == 0 {
            return Err(FanMonError::Config(
                "poll.tach_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.poll.presence_interval_ms == 0 {
            return Err(FanMonError::Config(
                "poll.presence_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
