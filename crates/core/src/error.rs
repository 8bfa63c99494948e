//! Error types for the key-value contract
//!
//! Every backend reports failures through [`KviError`]. We use `thiserror`
//! for automatic `Display` and `Error` trait implementations.
//!
//! ## Propagation
//!
//! - A missing key is never an error: `get` reports absence through `None`.
//! - An empty range is never an error: `get_range` returns an empty `Vec`.
//! - Nothing here is retried. Retry policy belongs to network backends.

use thiserror::Error;

use crate::key::KeyError;
use crate::limits::LimitError;

/// Result type alias for contract operations
pub type KviResult<T> = std::result::Result<T, KviError>;

/// Error taxonomy shared by all backends
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KviError {
    /// Malformed descriptor, bad options, or a backend that cannot be reached at open
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation on a handle that has already been closed
    #[error("Handle is closed")]
    Closed,

    /// Unsupported transaction operator, malformed key or range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unlock attempted by a session that does not hold the lock
    #[error("Distributed lock is not held by this session")]
    NotHeld,

    /// Opaque failure surfaced from a backend
    #[error("Backend error: {0}")]
    Backend(String),
}

impl KviError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        KviError::Connection(msg.into())
    }

    /// Create an invalid-argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        KviError::InvalidArgument(msg.into())
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        KviError::Backend(msg.into())
    }

    /// True if this error was caused by using a closed handle
    pub fn is_closed(&self) -> bool {
        matches!(self, KviError::Closed)
    }

    /// True if the caller passed something the contract rejects
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, KviError::InvalidArgument(_))
    }
}

impl From<KeyError> for KviError {
    fn from(e: KeyError) -> Self {
        KviError::InvalidArgument(e.to_string())
    }
}

impl From<LimitError> for KviError {
    fn from(e: LimitError) -> Self {
        KviError::InvalidArgument(e.to_string())
    }
}
