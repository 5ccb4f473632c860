//! fanmon-hardware
//!
//! Hardware providers for the fan monitor.
//!
//! Public API:
//! - `gpio::SysfsGpio` - presence line reader implementing `fanmon_core::LineReader`
//! - `hwmon::HwmonTach` - async reader of hwmon tach input/target attributes
//! - `hwmon::TachSource` - trait the daemon poller reads through

pub mod gpio;
pub mod hwmon;

pub use gpio::SysfsGpio;
pub use hwmon::{parse_attribute, HwmonTach, TachSource};

