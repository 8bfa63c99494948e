//! Key validation
//!
//! Rules enforced on every key that names an entry:
//! - Keys must not be empty
//! - Keys must not contain NUL bytes (\0)
//! - Keys must not exceed `max_key_bytes` (default: 1024)
//!
//! Range bounds are looser: an empty bound is allowed and means "unbounded
//! on that side" for the start key.

use crate::limits::Limits;
use thiserror::Error;

/// Validate a key using default limits
///
/// # Examples
///
/// ```
/// use hmkv_core::key::validate_key;
///
/// assert!(validate_key("key_0001").is_ok());
/// assert!(validate_key("/hms/v1/nodes/x0c0s0b0n0").is_ok());
///
/// assert!(validate_key("").is_err());
/// assert!(validate_key("a\x00b").is_err());
/// ```
pub fn validate_key(key: &str) -> Result<(), KeyError> {
    validate_key_with_limits(key, &Limits::default())
}

/// Validate a key with custom limits
pub fn validate_key_with_limits(key: &str, limits: &Limits) -> Result<(), KeyError> {
    if key.is_empty() {
        return Err(KeyError::Empty);
    }
    validate_range_bound(key, limits)
}

/// Validate one endpoint of a range query
///
/// Same as [`validate_key_with_limits`] except that the empty string is accepted.
pub fn validate_range_bound(bound: &str, limits: &Limits) -> Result<(), KeyError> {
    if bound.contains('\x00') {
        return Err(KeyError::ContainsNul);
    }

    let len = bound.len();
    if len > limits.max_key_bytes {
        return Err(KeyError::TooLong {
            actual: len,
            max: limits.max_key_bytes,
        });
    }

    Ok(())
}

/// Key validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// Key is empty (length 0)
    #[error("Key cannot be empty")]
    Empty,

    /// Key contains NUL byte (\0)
    #[error("Key cannot contain NUL bytes")]
    ContainsNul,

    /// Key exceeds maximum length
    #[error("Key too long: {actual} bytes exceeds maximum {max}")]
    TooLong {
        /// Actual key length in bytes
        actual: usize,
        /// Maximum allowed length
        max: usize,
    },
}
