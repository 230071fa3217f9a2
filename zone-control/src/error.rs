use std::time::Duration;
use thiserror::Error;

/// Errors raised by zone players and the zone controller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// The zone player could not be reached
    #[error("Zone player unreachable: {0}")]
    Unreachable(String),

    /// The zone player answered but refused the command
    #[error("Zone player rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    /// The zone player did not answer within the operation ceiling
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// No zone carries the requested name
    #[error("Unknown zone: {0}")]
    UnknownZone(String),

    /// The directory lists no zones at all
    #[error("No zones available")]
    NoZones,
}

/// Result type for zone operations
pub type Result<T> = std::result::Result<T, ZoneError>;
