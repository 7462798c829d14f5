//! # Error Types
//!
//! Custom error types for the relay using `thiserror`.
//!
//! Only startup failures are fatal. Everything raised inside an acquisition
//! cycle is recovered by the caller: unavailable sensors become unavailable
//! fields, parse failures drop the offending input, and transport or archive
//! failures are logged and isolated to that sink.

use thiserror::Error;

/// Main error type for the relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// A sensor produced no value within its time budget
    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    /// Inertial sensor bus or protocol errors
    #[error("IMU error: {0}")]
    Imu(String),

    /// Malformed position sentence or wire record
    #[error("Parse error: {0}")]
    Parse(String),

    /// Wire record could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A transport send failed
    #[error("Transport '{transport}' failed: {reason}")]
    Transport { transport: String, reason: String },

    /// A transport has no usable link this cycle
    #[error("Transport '{0}' unavailable")]
    TransportUnavailable(String),

    /// Archive write failure
    #[error("Archive error: {0}")]
    Archive(String),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Build a [`RelayError::Transport`] for the named transport
    pub fn transport(name: &str, reason: impl std::fmt::Display) -> Self {
        RelayError::Transport {
            transport: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for the relay
pub type Result<T> = std::result::Result<T, RelayError>;
