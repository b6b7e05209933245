// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Errors returned by rostcp operations.
//!
//! Queue outcomes such as an overflow notification or an empty queue are
//! not errors; they are reported as [`crate::queue::QueueState`] values.

/// Errors returned by rostcp operations.
///
/// # Example
///
/// ```rust
/// use rostcp::{Error, OutgoingQueue};
/// # use rostcp::{WireMessage, WireSerializer};
/// # struct Empty;
/// # impl WireMessage for Empty { fn serialize_into(&self, _: &mut WireSerializer) {} }
///
/// match OutgoingQueue::<Empty>::new("/chatter", 0) {
///     Err(Error::InvalidCapacity(n)) => println!("bad capacity: {}", n),
///     Err(e) => println!("other error: {}", e),
///     Ok(_) => println!("created"),
/// }
/// ```
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Queue capacity must be at least 1.
    InvalidCapacity(usize),
    /// A configuration value is out of range or unparsable.
    InvalidConfig(String),
    /// Configuration file not found at specified path.
    ConfigFileNotFound(String),
    /// Configuration file could not be parsed.
    ConfigParse(String),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// I/O error from the byte sink.
    IoError(std::io::Error),

    // ========================================================================
    // Data Errors
    // ========================================================================
    /// System command parameters could not be encoded.
    SerializationError(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidCapacity(n) => {
                write!(f, "Invalid queue capacity: {} (must be >= 1)", n)
            }
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::ConfigFileNotFound(path) => write!(f, "Config file not found: {}", path),
            Error::ConfigParse(msg) => write!(f, "Config parse error: {}", msg),
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::SerializationError(msg) => write!(f, "Serialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

/// Convenient alias for results using the crate `Error` type.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display_variants() {
        assert_eq!(
            Error::InvalidCapacity(0).to_string(),
            "Invalid queue capacity: 0 (must be >= 1)"
        );
        assert_eq!(
            Error::ConfigFileNotFound("/tmp/x.yaml".into()).to_string(),
            "Config file not found: /tmp/x.yaml"
        );
        assert_eq!(
            Error::InvalidConfig("ROSTCP_QUEUE_SIZE=abc".into()).to_string(),
            "Invalid configuration: ROSTCP_QUEUE_SIZE=abc"
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer gone").into();
        assert!(matches!(err, Error::IoError(_)));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "I/O error: peer gone");
        assert!(Error::InvalidCapacity(0).source().is_none());
    }
}
