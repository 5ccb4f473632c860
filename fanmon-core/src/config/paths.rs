//! Default path resolution for configuration files
//!
//! Uses XDG Base Directory specification when available, with sensible fallbacks.

use std::path::PathBuf;

/// Returns the default path for the static configuration file.
///
/// Uses XDG config directory if available:
/// - Linux: `~/.config/fanmon/config.toml`
/// - Fallback: `/etc/fanmon/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join("fanmon")
        .join("config.toml")
}

/// Returns the default path for the fan definition file.
///
/// Lives next to the static configuration file.
pub fn default_fan_config_path() -> PathBuf {
    default_config_path().with_file_name("fans.yaml")
}

/// Returns the default data directory for the inventory snapshot and error log.
///
/// Uses XDG data directory if available:
/// - Linux: `~/.local/share/fanmon`
/// - Fallback: `/var/lib/fanmon`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/var/lib"))
        .join("fanmon")
}
