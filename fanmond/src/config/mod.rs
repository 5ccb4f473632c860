//! Daemon configuration loading
//!
//! Reads the static TOML config (created with defaults when missing) and
//! the fan definition file it points to. A fan definition that fails
//! validation is fatal: the daemon refuses to start.

use fanmon_core::{FanConfig, FanMonError, Result, StaticConfig};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Static configuration together with the validated fan definitions
pub(crate) struct RuntimeConfig {
    static_config: StaticConfig,
    fans: FanConfig,
}

impl RuntimeConfig {
    /// Load all configuration from disk.
    ///
    /// `fan_config` overrides the fan definition path from the static
    /// config. The data directory is created if it does not exist.
    pub async fn load(config_path: &Path, fan_config: Option<PathBuf>) -> Result<Self> {
        info!("Loading configuration from: {}", config_path.display());

        let mut static_config = Self::load_static_config(config_path).await?;
        if let Some(path) = fan_config {
            static_config.fan_config = path;
        }
        static_config.validate()?;

        Self::ensure_data_dir(&static_config.data_dir).await?;
        let fans = Self::load_fan_config(&static_config.fan_config).await?;

        Ok(Self {
            static_config,
            fans,
        })
    }

    /// Load static config from TOML file, creating with defaults if missing.
    async fn load_static_config(path: &Path) -> Result<StaticConfig> {
        if !path.exists() {
            info!(
                "Static config not found at {}. Creating with defaults.",
                path.display()
            );

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    FanMonError::Config(format!(
                        "Failed to create config directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }

            let config = StaticConfig::default();
            let toml_str = config
                .to_toml()
                .map_err(|e| FanMonError::Config(format!("Failed to serialize config: {}", e)))?;

            fs::write(path, &toml_str)
                .await
                .map_err(|e| FanMonError::Config(format!("Failed to write config file: {}", e)))?;

            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| FanMonError::Config(format!("Failed to read config file: {}", e)))?;

        StaticConfig::from_toml(&content)
            .map_err(|e| FanMonError::Config(format!("Failed to parse config file: {}", e)))
    }

    async fn ensure_data_dir(data_dir: &Path) -> Result<()> {
        if !data_dir.exists() {
            info!("Creating data directory: {}", data_dir.display());
            fs::create_dir_all(data_dir).await.map_err(|e| {
                FanMonError::Config(format!(
                    "Failed to create data directory '{}': {}. \
                     Please create it manually or check permissions.",
                    data_dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Read and validate the fan definitions; there are no defaults to fall back on
    async fn load_fan_config(path: &Path) -> Result<FanConfig> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            FanMonError::Config(format!(
                "Failed to read fan config '{}': {}",
                path.display(),
                e
            ))
        })?;

        let fans = FanConfig::parse_for_path(path, &content)?;
        for fan in &fans.fans {
            debug!(
                "Fan {} ({}): {} tach sensors, {} presence methods, policy {:?}",
                fan.name,
                fan.inventory,
                fan.sensors.len(),
                fan.presence.methods.len(),
                fan.presence.policy
            );
        }
        info!("Loaded {} fan definitions", fans.fans.len());
        Ok(fans)
    }

    pub fn static_config(&self) -> &StaticConfig {
        &self.static_config
    }

    pub fn data_dir(&self) -> &Path {
        &self.static_config.data_dir
    }

    pub fn fans(&self) -> &FanConfig {
        &self.fans
    }
}
