//! Storage layer for hmkv
//!
//! This crate implements the ordered key space shared by every operation:
//! - KeySpace: BTreeMap-based storage with RwLock
//! - KeySpaceTxn: exclusive mutation scope used for atomic read-compare-write
//! - ChangeSink: seam through which every mutation is published in order
//! - Revision management with AtomicU64

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod keyspace;

pub use keyspace::{ChangeSink, KeySpace, KeySpaceTxn, NullSink};
