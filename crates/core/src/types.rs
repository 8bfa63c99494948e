//! Core types for the key-value contract
//!
//! This module defines the types exchanged across the `Kvi` surface:
//! - Entry: A key-value pair returned by range queries
//! - ChangeOp / OpFilter: Mutation kinds and bitwise-combinable interest sets
//! - ChangeEvent: One PUT or DELETE notification
//! - WatchHandle: Token identifying a callback subscription
//! - SessionId: Identity of a store handle for locking
//! - CompareOp: Relational operator used by transactions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::KviError;

/// One stored key-value pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// The key
    pub key: String,
    /// The value
    pub value: String,
}

impl Entry {
    /// Create a new entry
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Kind of mutation that produced a change event
///
/// The discriminants are the wire-level operation codes and double as
/// the bits of an [`OpFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChangeOp {
    /// Key was created or overwritten
    Put = 1,
    /// Key was removed
    Delete = 2,
}

/// Operation code for PUT events
pub const KEYCHANGE_PUT: u8 = ChangeOp::Put as u8;

/// Operation code for DELETE events
pub const KEYCHANGE_DELETE: u8 = ChangeOp::Delete as u8;

impl ChangeOp {
    /// Integer operation code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode an integer operation code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            KEYCHANGE_PUT => Some(ChangeOp::Put),
            KEYCHANGE_DELETE => Some(ChangeOp::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeOp::Put => write!(f, "PUT"),
            ChangeOp::Delete => write!(f, "DELETE"),
        }
    }
}

/// Set of change operations a callback watcher is interested in
///
/// An empty filter places no restriction and matches every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OpFilter(u8);

impl OpFilter {
    /// No restriction requested
    pub const ANY: OpFilter = OpFilter(0);
    /// PUT events only
    pub const PUT: OpFilter = OpFilter(KEYCHANGE_PUT);
    /// DELETE events only
    pub const DELETE: OpFilter = OpFilter(KEYCHANGE_DELETE);
    /// PUT and DELETE events
    pub const ALL: OpFilter = OpFilter(KEYCHANGE_PUT | KEYCHANGE_DELETE);

    /// Build a filter from raw operation-code bits
    ///
    /// Bits that do not name an operation are ignored.
    pub fn from_bits(bits: u8) -> Self {
        OpFilter(bits & Self::ALL.0)
    }

    /// Raw bits
    pub fn bits(self) -> u8 {
        self.0
    }

    /// True if an event with `op` passes this filter
    pub fn matches(self, op: ChangeOp) -> bool {
        self.0 == 0 || self.0 & op.code() != 0
    }
}

impl From<ChangeOp> for OpFilter {
    fn from(op: ChangeOp) -> Self {
        OpFilter(op.code())
    }
}

impl BitOr for OpFilter {
    type Output = OpFilter;

    fn bitor(self, rhs: OpFilter) -> OpFilter {
        OpFilter(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpFilter {
    fn bitor_assign(&mut self, rhs: OpFilter) {
        self.0 |= rhs.0;
    }
}

/// Notification describing one mutation of one key
///
/// `value` is the new value for PUT and the empty string for DELETE.
/// `revision` is the store-wide mutation counter at the time of the change;
/// revisions strictly increase, so they totally order events on a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Key that changed
    pub key: String,
    /// New value (empty for DELETE)
    pub value: String,
    /// Kind of mutation
    pub op: ChangeOp,
    /// Store revision assigned to this mutation
    pub revision: u64,
}

impl ChangeEvent {
    /// Create a PUT event
    pub fn put(key: impl Into<String>, value: impl Into<String>, revision: u64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            op: ChangeOp::Put,
            revision,
        }
    }

    /// Create a DELETE event
    pub fn delete(key: impl Into<String>, revision: u64) -> Self {
        Self {
            key: key.into(),
            value: String::new(),
            op: ChangeOp::Delete,
            revision,
        }
    }
}

/// Opaque token identifying a callback watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchHandle(Uuid);

impl WatchHandle {
    /// Allocate a new unique handle
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WatchHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

/// Identity of a store handle with respect to the distributed lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a SessionId from its string form
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Relational operator of a conditional transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `=`: exact equality
    Equal,
    /// `!=`: exact inequality
    NotEqual,
    /// `<`: byte-lexicographically less
    Less,
    /// `>`: byte-lexicographically greater
    Greater,
}

impl CompareOp {
    /// Operator symbol as accepted by [`FromStr`]
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "!=",
            CompareOp::Less => "<",
            CompareOp::Greater => ">",
        }
    }
}

impl FromStr for CompareOp {
    type Err = KviError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(CompareOp::Equal),
            "!=" => Ok(CompareOp::NotEqual),
            "<" => Ok(CompareOp::Less),
            ">" => Ok(CompareOp::Greater),
            other => Err(KviError::invalid_argument(format!(
                "unsupported transaction operator '{}', expected one of =, !=, <, >",
                other
            ))),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
