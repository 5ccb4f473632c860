//! fanmon core library
//!
//! The decision engine of the fan monitor: an object cache fed by bus
//! signals, presence sensors voted on by redundancy policies, and the
//! per-rotor fault detection state machine. Nothing in here performs I/O;
//! hardware access goes through the [`presence::LineReader`] trait and
//! external effects are returned as [`monitor::Action`]s.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod monitor;
pub mod presence;
pub mod signal;
pub mod types;

// Re-export commonly used types
pub use cache::ObjectCache;
pub use config::{
    default_config_path, default_data_dir, FanConfig, FanDefinition, MonitorMode, StaticConfig,
};
pub use error::*;
pub use monitor::{Action, Fan, SensorId, TachSensor};
pub use presence::{FanPresence, LineReader, Presence, PresenceSensor, RedundancyPolicy};
pub use types::*;
