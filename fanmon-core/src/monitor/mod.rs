//! Fan functional monitoring
//!
//! [`TachSensor`] runs the per-rotor fault detection state machine and
//! [`Fan`] aggregates its rotors. Both report what must happen outside the
//! engine as [`Action`]s, which the owner applies to the inventory and the
//! error log.

mod fan;
mod tach_sensor;
mod timer;

pub use fan::{sensor_inventory_path, Fan};
pub use tach_sensor::{Expiry, TachSensor};
pub use timer::{DebounceTimer, Timer, TimerMode};

use crate::types::FaultRecord;

/// Handle of a tach sensor within the monitor's fan list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorId {
    pub fan: usize,
    pub sensor: usize,
}

/// Side effect requested by the monitor
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Update a rotor's `Functional` inventory property
    SetSensorFunctional { inventory: String, functional: bool },
    /// Update a fan's `Functional` inventory property
    SetFanFunctional { inventory: String, functional: bool },
    /// Update a fan's `Present` inventory property
    SetFanPresent { inventory: String, present: bool },
    /// Create a persistent error record
    CreateError(FaultRecord),
}
