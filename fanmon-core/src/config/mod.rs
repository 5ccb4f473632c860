//! Configuration types for fanmon
//!
//! # Architecture
//!
//! Configuration is split into:
//! - [`StaticConfig`] - Daemon settings (TOML), loaded once at startup
//! - [`FanConfig`] - Fan, tach sensor and presence definitions (YAML or JSON),
//!   validated into immutable structs before any monitor object is built

mod fans;
mod paths;
mod static_config;

pub use fans::{
    FanConfig, FanDefinition, FaultMethod, HwmonBinding, PolicyKind, PresenceDefinition,
    PresenceMethod, RawFanConfig, TachRule, TachSensorDefinition, DEFAULT_DEVIATION,
};
pub use paths::{default_config_path, default_data_dir, default_fan_config_path};
pub use static_config::{MonitorMode, PollConfig, ServerConfig, StaticConfig};
