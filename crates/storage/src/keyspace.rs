//! KeySpace: ordered in-memory key space with revision tracking
//!
//! This module implements the ordered key space using:
//! - `BTreeMap<String, String>` for byte-lexicographic key order
//! - `parking_lot::RwLock` so reads run concurrently and mutations are exclusive
//! - `AtomicU64` for a monotonically increasing store revision
//!
//! # Mutation Path
//!
//! Every mutation goes through a [`KeySpaceTxn`], which holds the write lock
//! for its whole lifetime. Each `put`/`delete` bumps the revision and
//! publishes a [`ChangeEvent`] to the attached [`ChangeSink`] *while the lock
//! is still held*. Sinks therefore receive events in exactly the order the
//! mutations were applied.
//!
//! A multi-step read-compare-write (transactions, test-and-set) opens one
//! `KeySpaceTxn` and performs all steps under it, so no other mutation can
//! interleave.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::trace;

use hmkv_core::{ChangeEvent, Entry};

/// Receiver of change events produced by the key space
///
/// `publish` is called with the key-space write lock held. Implementations
/// must only enqueue; they must never call back into the key space.
pub trait ChangeSink: Send + Sync {
    /// Accept one change event
    fn publish(&self, event: &ChangeEvent);
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ChangeSink for NullSink {
    fn publish(&self, _event: &ChangeEvent) {}
}

/// Ordered key space
///
/// Thread-safe through `parking_lot::RwLock` and `AtomicU64`.
#[derive(Debug, Default)]
pub struct KeySpace {
    /// Live entries in ascending key order
    data: RwLock<BTreeMap<String, String>>,
    /// Revision of the most recent mutation (0 = never mutated)
    revision: AtomicU64,
}

impl KeySpace {
    /// Create a new empty KeySpace
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            revision: AtomicU64::new(0),
        }
    }

    /// Current value of `key`, if any
    pub fn get(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    /// Every entry with `start <= key <= end`, ascending by key
    ///
    /// `start > end` describes an empty interval and yields no entries.
    pub fn range(&self, start: &str, end: &str) -> Vec<Entry> {
        if start > end {
            return Vec::new();
        }

        let data = self.data.read();
        data.range::<str, _>((Bound::Included(start), Bound::Included(end)))
            .map(|(k, v)| Entry::new(k.clone(), v.clone()))
            .collect()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True if no entries are stored
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Revision of the most recent mutation
    pub fn current_revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Begin an exclusive mutation that publishes to `sink`
    ///
    /// Blocks until all in-flight readers and writers are done.
    pub fn begin<'a>(&'a self, sink: &'a dyn ChangeSink) -> KeySpaceTxn<'a> {
        KeySpaceTxn {
            data: self.data.write(),
            revision: &self.revision,
            sink,
        }
    }

    /// Insert or overwrite a single entry
    pub fn put(&self, key: &str, value: &str, sink: &dyn ChangeSink) -> u64 {
        self.begin(sink).put(key, value)
    }

    /// Remove a single entry, returning its old value
    pub fn delete(&self, key: &str, sink: &dyn ChangeSink) -> (Option<String>, u64) {
        self.begin(sink).delete(key)
    }
}

/// Exclusive mutation scope over a [`KeySpace`]
///
/// Holds the write lock until dropped.
pub struct KeySpaceTxn<'a> {
    data: RwLockWriteGuard<'a, BTreeMap<String, String>>,
    revision: &'a AtomicU64,
    sink: &'a dyn ChangeSink,
}

impl<'a> KeySpaceTxn<'a> {
    /// Current value of `key` as seen inside this scope
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Insert or overwrite `key`, publish a PUT event, return its revision
    pub fn put(&mut self, key: &str, value: &str) -> u64 {
        let revision = self.next_revision();
        self.data.insert(key.to_string(), value.to_string());
        trace!(target: "hmkv::store", key, revision, "put");
        self.sink.publish(&ChangeEvent::put(key, value, revision));
        revision
    }

    /// Remove `key`, publish a DELETE event, return the old value and revision
    ///
    /// The event is published whether or not the key was present.
    pub fn delete(&mut self, key: &str) -> (Option<String>, u64) {
        let revision = self.next_revision();
        let removed = self.data.remove(key);
        trace!(
            target: "hmkv::store",
            key,
            revision,
            existed = removed.is_some(),
            "delete"
        );
        self.sink.publish(&ChangeEvent::delete(key, revision));
        (removed, revision)
    }

    // Only called with the write lock held, so revisions are assigned in
    // the same order the mutations are applied.
    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }
}
