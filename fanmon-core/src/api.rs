//! API models for the fanmon status API
//!
//! Read-only views of the monitor's state, serialized by the daemon.

use serde::{Deserialize, Serialize};

use crate::presence::Presence;
use crate::types::FaultRecord;

/// Generic API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ApiResponse<T> {
    #[serde(rename = "success")]
    Success { data: T },
    #[serde(rename = "error")]
    Error { error: String },
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T) -> Self {
        Self::Success { data }
    }

    /// Create an error response
    pub fn error(error: String) -> Self {
        Self::Error { error }
    }
}

/// Daemon information response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub version: String,
    /// "monitor" or "init"
    pub mode: String,
    /// Uptime in seconds
    pub uptime: u64,
    pub fan_count: usize,
    pub sensor_count: usize,
    /// Number of watched (path, interface, property) entries
    pub watched_properties: usize,
}

/// State of one tach sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorStatus {
    pub name: String,
    pub functional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u64>,
    /// Consecutive out of range readings (count method)
    pub fault_count: usize,
}

/// State of one fan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanStatus {
    pub name: String,
    pub inventory: String,
    pub presence: Presence,
    pub functional: bool,
    pub sensors: Vec<SensorStatus>,
}

/// All fans
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanListResponse {
    pub fans: Vec<FanStatus>,
}

/// Error records created so far
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorListResponse {
    pub errors: Vec<FaultRecord>,
}
