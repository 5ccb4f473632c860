//! Error types for the fanmon system

use thiserror::Error;

/// Core error type for fanmon operations
#[derive(Error, Debug)]
pub enum FanMonError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Hardware access errors
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// A presence sensor could not be read
    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Fan not found
    #[error("Fan not found: {0}")]
    FanNotFound(String),

    /// Parsing errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for fanmon operations
pub type Result<T> = std::result::Result<T, FanMonError>;

impl From<serde_json::Error> for FanMonError {
    fn from(err: serde_json::Error) -> Self {
        FanMonError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for FanMonError {
    fn from(err: serde_yaml::Error) -> Self {
        FanMonError::Serialization(err.to_string())
    }
}

impl FanMonError {
    /// Whether this error means "could not read", as opposed to a hard failure
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            FanMonError::SensorUnavailable(_) | FanMonError::Hardware(_) | FanMonError::Io(_)
        )
    }
}
