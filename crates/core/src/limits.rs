//! Size limits for keys and values
//!
//! Limits are enforced by the store facade before any mutation reaches the
//! key space. Violations surface as `InvalidArgument` errors.

use thiserror::Error;

/// Default maximum key length in bytes
pub const DEFAULT_MAX_KEY_BYTES: usize = 1024;

/// Default maximum value length in bytes (1.5 MiB, the usual cluster request cap)
pub const DEFAULT_MAX_VALUE_BYTES: usize = 1536 * 1024;

/// Size limits for keys and values
///
/// Key length is checked by [`validate_key_with_limits`](crate::key::validate_key_with_limits)
/// together with the other key rules; values are checked here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum key length in bytes (default: 1024)
    pub max_key_bytes: usize,

    /// Maximum value length in bytes (default: 1.5 MiB)
    pub max_value_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_key_bytes: DEFAULT_MAX_KEY_BYTES,
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
        }
    }
}

impl Limits {
    /// Create limits with small values for testing
    pub fn with_small_limits() -> Self {
        Limits {
            max_key_bytes: 16,
            max_value_bytes: 64,
        }
    }

    /// Validate a value length
    pub fn validate_value(&self, value: &str) -> Result<(), LimitError> {
        let len = value.len();
        if len > self.max_value_bytes {
            return Err(LimitError::ValueTooLarge {
                actual: len,
                max: self.max_value_bytes,
            });
        }
        Ok(())
    }
}

/// Limit validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimitError {
    /// Value exceeds maximum length
    #[error("Value too large: {actual} bytes exceeds maximum {max}")]
    ValueTooLarge {
        /// Actual value length in bytes
        actual: usize,
        /// Maximum allowed length
        max: usize,
    },
}
