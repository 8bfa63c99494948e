//! Reference engine for hmkv
//!
//! This crate assembles the lower layers into a working backend:
//! - MemKv: in-process implementation of the `Kvi` contract
//! - WatchDispatcher: blocking and callback watch delivery
//! - KviConfig: store settings from TOML and option strings
//! - Named store registry: handles opened on the same name share one store
//!
//! The engine is the only component that knows about sessions, so it owns
//! the rules tying watchers and the distributed lock to the handle that
//! created them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod memory;
pub mod registry;
pub mod watch;

pub use config::KviConfig;
pub use memory::{MemKv, MemStore, MEM_BACKEND};
pub use watch::{WatchDispatcher, WatchStats};
