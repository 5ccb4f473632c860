//! hwmon tach providers
//!
//! Tach inputs and targets are plain integers in sysfs attributes such as
//! `/sys/class/hwmon/hwmon3/fan1_input` and `fan1_target`.

use async_trait::async_trait;
use fanmon_core::{FanMonError, Result};
use std::path::Path;
use tokio::fs;
use tracing::trace;

/// Source of tach readings
///
/// This trait lets the daemon poller run against mock sources in tests.
#[async_trait]
pub trait TachSource: Send + Sync {
    /// Read one numeric attribute
    async fn read_value(&self, path: &Path) -> Result<f64>;
}

/// Reads hwmon attributes from sysfs
#[derive(Debug, Clone, Copy, Default)]
pub struct HwmonTach;

impl HwmonTach {
    pub fn new() -> Self {
        Self
    }
}

/// Parse the contents of a numeric sysfs attribute
pub fn parse_attribute(contents: &str) -> Result<f64> {
    let trimmed = contents.trim();
    trimmed
        .parse::<f64>()
        .map_err(|e| FanMonError::Parse(format!("Invalid hwmon value '{}': {}", trimmed, e)))
}

#[async_trait]
impl TachSource for HwmonTach {
    async fn read_value(&self, path: &Path) -> Result<f64> {
        let contents = fs::read_to_string(path).await.map_err(|e| {
            FanMonError::Hardware(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let value = parse_attribute(&contents)?;
        trace!("hwmon {} = {}", path.display(), value);
        Ok(value)
    }
}
