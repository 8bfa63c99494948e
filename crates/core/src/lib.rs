//! Core types and traits for hmkv
//!
//! This crate defines the foundational types used throughout the system:
//! - Kvi: The backend-agnostic store contract
//! - Entry, ChangeEvent, ChangeOp, OpFilter: Data exchanged over the contract
//! - WatchHandle, SessionId: Opaque identities
//! - CompareOp: Transaction operators
//! - KviError: Error taxonomy
//! - Limits and key validation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod key;
pub mod limits;
pub mod traits;
pub mod types;

pub use error::{KviError, KviResult};
pub use key::{validate_key, validate_key_with_limits, validate_range_bound, KeyError};
pub use limits::{LimitError, Limits};
pub use traits::{Kvi, WatchCallback, WatchContext};
pub use types::{
    ChangeEvent, ChangeOp, CompareOp, Entry, OpFilter, SessionId, WatchHandle, KEYCHANGE_DELETE,
    KEYCHANGE_PUT,
};
