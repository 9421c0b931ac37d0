use std::io;
use thiserror::Error;

/// Error types for the setpoint client
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Unknown mode: {0}")]
    UnknownMode(String),

    #[error("Value {value} does not fit the {mode} display")]
    Overflow {
        /// Value that was rejected
        value: f64,
        /// Mode code whose digit width was exceeded
        mode: &'static str,
    },

    #[error("Transport lost: {0}")]
    TransportLost(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new malformed message error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedMessage(msg.into())
    }

    /// Creates a new unknown mode error
    pub fn unknown_mode(code: impl Into<String>) -> Self {
        Error::UnknownMode(code.into())
    }

    /// Creates a new overflow error
    pub fn overflow(value: f64, mode: &'static str) -> Self {
        Error::Overflow { value, mode }
    }

    /// Creates a new transport lost error
    pub fn transport_lost(msg: impl Into<String>) -> Self {
        Error::TransportLost(msg.into())
    }

    /// Creates a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::unknown_mode("XX");
        assert!(matches!(err, Error::UnknownMode(_)));
        assert_eq!(err.to_string(), "Unknown mode: XX");
    }

    #[test]
    fn test_overflow_message() {
        let err = Error::overflow(123.4, "CC");
        assert_eq!(err.to_string(), "Value 123.4 does not fit the CC display");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::Other, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
