//! Error Module - heapgraph Error Types
//!
//! Defines the error types used while sizing and dumping objects.
//!
//! # Error Categories
//!
//! ## Dump Errors (terminal for the current dump)
//! - `Sink` - The output sink rejected a write
//! - `EscapeOverflow` - Escaped text would not fit the scratch buffer
//!
//! ## Setup Errors
//! - `Configuration` - Invalid dump configuration
//!
//! ## Adapter Errors (never surfaced by a dump)
//! - `ModelError` - A runtime capability failed or is unsupported.
//!   The estimator and the exclusion filter swallow these.

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for all heapgraph operations
///
/// # Examples
///
/// ```rust
/// use heapgraph::DumpError;
///
/// fn handle_error(err: DumpError) {
///     match err {
///         DumpError::Sink(io) => eprintln!("sink failed: {}", io),
///         DumpError::EscapeOverflow { needed, capacity } => {
///             eprintln!("escape needs {} bytes, buffer holds {}", needed, capacity);
///         }
///         other => eprintln!("other error: {}", other),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum DumpError {
    /// Sink write failed
    ///
    /// **When returned:** The sink returned an I/O error for any write
    ///
    /// **Recovery strategy:** None inside the dump. Bytes already written
    /// stay written; retrying is the caller's decision.
    #[error("Sink write failed: {0}")]
    Sink(#[source] std::io::Error),

    /// Escape buffer overflow
    ///
    /// **When returned:** An escaped string literal would exceed the bounded
    /// scratch buffer. The record is abandoned instead of being truncated
    /// mid-escape, which would corrupt the stream.
    #[error("Escape buffer overflow: needed {needed} bytes, capacity {capacity} bytes")]
    EscapeOverflow { needed: usize, capacity: usize },

    /// Configuration error
    ///
    /// **When returned:** `DumpConfig::validate` rejected the configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Internal error - indicates a bug in heapgraph
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DumpError {
    /// Check if this error is recoverable by retrying the dump
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DumpError::Sink(_))
    }

    /// Check if this error indicates a bug in the code
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            DumpError::EscapeOverflow { .. } | DumpError::Internal(_)
        )
    }
}

impl From<std::io::Error> for DumpError {
    fn from(err: std::io::Error) -> Self {
        DumpError::Sink(err)
    }
}

/// Errors reported by an object model adapter
///
/// None of these escape a dump: the size estimator falls through to its next
/// path and the exclusion filter treats them as "not excluded".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The runtime does not offer this capability for the object
    #[error("Unsupported capability: {0}")]
    Unsupported(&'static str),

    /// The object cannot take part in an equality membership probe
    #[error("Unhashable object of type {type_name}")]
    Unhashable { type_name: String },

    /// The runtime raised an error while answering
    #[error("Runtime failure: {0}")]
    Failed(String),
}

/// Result type alias for heapgraph operations
pub type Result<T> = std::result::Result<T, DumpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_error_is_recoverable() {
        let err = DumpError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "closed",
        ));
        assert!(err.is_recoverable());
        assert!(!err.is_bug());
    }

    #[test]
    fn test_escape_overflow_is_bug() {
        let err = DumpError::EscapeOverflow {
            needed: 2048,
            capacity: 1024,
        };
        assert!(err.is_bug());
        assert_eq!(
            err.to_string(),
            "Escape buffer overflow: needed 2048 bytes, capacity 1024 bytes"
        );
    }
}
