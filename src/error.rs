//! Error types for the connection pool.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use wirepool::{Pool, Result};
//!
//! async fn example(pool: &Pool) -> Result<()> {
//!     let mut conn = pool.acquire().await?;
//!     conn.write(b"ping").await?;
//!     pool.release(conn).await;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Admission | [`Error::PoolClosed`], [`Error::PoolTimeout`] |
//! | Dialing | [`Error::Dial`] |
//! | Transport I/O | [`Error::Timeout`], [`Error::Io`], [`Error::WebSocket`] |
//! | Framing | [`Error::InvalidFrame`] |
//! | Configuration | [`Error::Config`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Admission Errors
    // ========================================================================
    /// Pool has been closed.
    ///
    /// Returned by `acquire` after `close`; fatal to that call, not to
    /// connections already handed out.
    #[error("Pool is closed")]
    PoolClosed,

    /// Admission wait exceeded the configured timeout.
    ///
    /// Recoverable: the caller may retry. No admission slot was consumed.
    #[error("Pool timeout after {timeout_ms}ms waiting for a connection")]
    PoolTimeout {
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
    },

    // ========================================================================
    // Dial Errors
    // ========================================================================
    /// Dial strategy failed to establish a transport.
    ///
    /// The underlying transport error is preserved in the message.
    #[error("Dial failed: {message}")]
    Dial {
        /// Description of the dial failure.
        message: String,
    },

    // ========================================================================
    // Transport I/O Errors
    // ========================================================================
    /// Scoped read or write exceeded its deadline.
    ///
    /// Returned by `with_writer`/`with_reader` when a positive timeout was
    /// given and the operation did not complete in time.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Framing Errors
    // ========================================================================
    /// A framing strategy rejected a payload.
    ///
    /// Returned when a payload cannot be encoded as a frame (for example,
    /// a line frame containing an embedded newline).
    #[error("Invalid frame: {message}")]
    InvalidFrame {
        /// Description of the framing violation.
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when pool or client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a pool timeout error.
    #[inline]
    pub fn pool_timeout(timeout_ms: u64) -> Self {
        Self::PoolTimeout { timeout_ms }
    }

    /// Creates a dial error.
    #[inline]
    pub fn dial(message: impl Into<String>) -> Self {
        Self::Dial {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates an invalid frame error.
    #[inline]
    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::PoolTimeout { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if this error is retryable.
    ///
    /// Retryable errors may succeed on a later attempt: admission timeouts
    /// and dial failures leave the pool in a usable state.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PoolTimeout { .. } | Self::Dial { .. } | Self::Timeout { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::pool_timeout(5000);
        assert_eq!(
            err.to_string(),
            "Pool timeout after 5000ms waiting for a connection"
        );
    }

    #[test]
    fn test_pool_closed_display() {
        assert_eq!(Error::PoolClosed.to_string(), "Pool is closed");
    }

    #[test]
    fn test_dial_error() {
        let err = Error::dial("connection refused");
        assert_eq!(err.to_string(), "Dial failed: connection refused");
    }

    #[test]
    fn test_is_timeout() {
        let pool_timeout = Error::pool_timeout(100);
        let io_timeout = Error::timeout("write", 250);
        let other = Error::PoolClosed;

        assert!(pool_timeout.is_timeout());
        assert!(io_timeout.is_timeout());
        assert!(!other.is_timeout());
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::pool_timeout(100).is_retryable());
        assert!(Error::dial("refused").is_retryable());
        assert!(!Error::PoolClosed.is_retryable());
        assert!(!Error::config("bad capacity").is_retryable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
