//! Concurrency layer for hmkv
//!
//! This crate implements the atomic decision primitives:
//! - compare: conditional transactions (compare one key, write one branch)
//! - tas: test-and-set on a single key
//! - lock: session-keyed distributed lock record
//!
//! Transactions and test-and-set run inside a `KeySpaceTxn`, so the read,
//! the decision and the write are one critical section.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compare;
pub mod lock;
pub mod tas;

pub use compare::{compare, Branch, CompareRequest};
pub use lock::LockRecord;
pub use tas::test_and_set;
