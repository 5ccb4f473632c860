//! Core types and data structures for fanmon

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Object path prefix under which tach sensors are published
pub const FAN_SENSOR_PATH: &str = "/xyz/openbmc_project/sensors/fan_tach/";

/// Interface carrying a tach sensor's measured speed
pub const SENSOR_VALUE_INTERFACE: &str = "xyz.openbmc_project.Sensor.Value";

/// Property holding the measured speed
pub const SENSOR_VALUE_PROPERTY: &str = "Value";

/// Default interface carrying a tach sensor's commanded speed
pub const DEFAULT_TARGET_INTERFACE: &str = "xyz.openbmc_project.Control.FanSpeed";

/// Property holding the commanded speed
pub const TARGET_PROPERTY: &str = "Target";

/// Build the full object path of a tach sensor from its short name
pub fn sensor_object_path(name: &str) -> String {
    format!("{}{}", FAN_SENSOR_PATH, name)
}

/// Identifies one tracked property: (object path, interface, property)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyKey {
    pub path: String,
    pub interface: String,
    pub property: String,
}

impl PropertyKey {
    pub fn new(
        path: impl Into<String>,
        interface: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            interface: interface.into(),
            property: property.into(),
        }
    }

    /// Key of the `Value` property of the named tach sensor
    pub fn tach_input(sensor: &str) -> Self {
        Self::new(
            sensor_object_path(sensor),
            SENSOR_VALUE_INTERFACE,
            SENSOR_VALUE_PROPERTY,
        )
    }

    /// Key of the `Target` property of the named tach sensor
    pub fn tach_target(sensor: &str, interface: &str) -> Self {
        Self::new(sensor_object_path(sensor), interface, TARGET_PROPERTY)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}", self.path, self.interface, self.property)
    }
}

/// Value of a tracked property.
///
/// Closed over the wire types the monitor actually consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
}

impl PropertyValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(v) => Some(*v as f64),
            PropertyValue::UInt(v) => Some(*v as f64),
            PropertyValue::Double(v) => Some(*v),
            PropertyValue::Bool(_) | PropertyValue::String(_) => None,
        }
    }

    /// Unsigned integer view of the value, truncating doubles
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            PropertyValue::UInt(v) => Some(*v),
            PropertyValue::Int(v) if *v >= 0 => Some(*v as u64),
            PropertyValue::Double(v) if *v >= 0.0 => Some(*v as u64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<u64> for PropertyValue {
    fn from(v: u64) -> Self {
        PropertyValue::UInt(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Double(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

/// Property name -> value
pub type PropertyMap = HashMap<String, PropertyValue>;

/// Interface name -> properties
pub type InterfaceMap = HashMap<String, PropertyMap>;

/// Incoming bus notification
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    /// Properties of one interface on `path` changed
    PropertiesChanged {
        path: String,
        interface: String,
        changed: PropertyMap,
    },
    /// Interfaces (with their initial properties) appeared on `path`
    InterfacesAdded {
        path: String,
        interfaces: InterfaceMap,
    },
}

impl BusEvent {
    /// Object path the event was emitted for
    pub fn path(&self) -> &str {
        match self {
            BusEvent::PropertiesChanged { path, .. } => path,
            BusEvent::InterfacesAdded { path, .. } => path,
        }
    }
}

/// Persistent record created when a sensor fault outlives its error delay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultRecord {
    /// Fan owning the faulted sensor
    pub fan: String,
    /// Short sensor name
    pub sensor: String,
    /// Inventory path of the fan
    pub inventory: String,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    pub message: String,
}
