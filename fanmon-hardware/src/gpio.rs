//! sysfs GPIO presence lines
//!
//! Reads the integer value exposed by a GPIO line file such as
//! `/sys/class/gpio/gpio42/value`. These reads hit already-latched kernel
//! state and return immediately, so they are done synchronously from the
//! monitor's evaluation path.

use fanmon_core::{FanMonError, LineReader, Result};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Line reader backed by sysfs value files
#[derive(Debug, Clone, Default)]
pub struct SysfsGpio {
    root: Option<PathBuf>,
}

impl SysfsGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve device paths relative to `root` (used for chroots and tests)
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, devpath: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(devpath.trim_start_matches('/')),
            None => PathBuf::from(devpath),
        }
    }
}

impl LineReader for SysfsGpio {
    fn read_line(&self, devpath: &str) -> Result<u32> {
        let path = self.resolve(devpath);
        let contents = fs::read_to_string(&path).map_err(|e| {
            FanMonError::Hardware(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let value = contents.trim().parse::<u32>().map_err(|e| {
            FanMonError::Hardware(format!(
                "Invalid line value '{}' in {}: {}",
                contents.trim(),
                path.display(),
                e
            ))
        })?;

        debug!("GPIO {} = {}", path.display(), value);
        Ok(value)
    }
}
