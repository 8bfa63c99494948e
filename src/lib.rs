//! hmkv - backend-agnostic key-value store contract
//!
//! hmkv offers one contract, [`Kvi`], over interchangeable backends. Callers
//! pick a backend with a connection descriptor at open time and never see
//! which one is behind the handle.
//!
//! # Quick Start
//!
//! ```
//! use hmkv::{open, Kvi};
//!
//! let kv = open("mem:", "")?;
//! kv.store("user:123", "Alice")?;
//! assert_eq!(kv.get("user:123")?, Some("Alice".to_string()));
//!
//! // Compare "user:123" with "Alice" and write one of two branches
//! let took_then = kv.transaction("user:123", "=", "Alice", "seen", "yes", "seen", "no")?;
//! assert!(took_then);
//! kv.close()?;
//! # Ok::<(), hmkv::KviError>(())
//! ```
//!
//! # Architecture
//!
//! The in-memory engine lives in `hmkv-engine`; contract types come from
//! `hmkv-core`. Storage and concurrency internals are not exposed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod descriptor;

pub use descriptor::{Backend, Descriptor};
pub use hmkv_core::{
    ChangeEvent, ChangeOp, CompareOp, Entry, Kvi, KviError, KviResult, OpFilter, SessionId,
    WatchCallback, WatchContext, WatchHandle, KEYCHANGE_DELETE, KEYCHANGE_PUT,
};
pub use hmkv_engine::{KviConfig, MemKv, WatchStats};

use tracing::{info, warn};

/// Open a store handle
///
/// `descriptor` selects the backend (see [`descriptor`]); `options` is a
/// comma-separated `key=value` list of [`KviConfig`] fields, plus
/// `config=<path>` to load a TOML file first.
///
/// # Errors
///
/// Returns `Connection` if the descriptor is malformed, the options cannot be
/// applied, or the selected backend is not available in this build.
pub fn open(descriptor: &str, options: &str) -> KviResult<Box<dyn Kvi>> {
    let descriptor = Descriptor::parse(descriptor)?;
    let config = KviConfig::from_options(options).map_err(|e| {
        KviError::connection(format!("cannot initialize {}: {}", descriptor, e))
    })?;

    let kv: Box<dyn Kvi> = match descriptor.backend() {
        Backend::Memory { name: None } => Box::new(MemKv::open(config)),
        Backend::Memory { name: Some(name) } => Box::new(MemKv::open_named(name, config)),
        Backend::Etcd { endpoints } => {
            warn!(
                target: "hmkv::open",
                endpoints = %endpoints.join(","),
                "cluster backend requested but no cluster client is linked"
            );
            return Err(KviError::connection(format!(
                "backend '{}' is not available in this build",
                descriptor.scheme()
            )));
        }
    };

    info!(
        target: "hmkv::open",
        descriptor = %descriptor,
        backend = kv.backend_name(),
        "store opened"
    );
    Ok(kv)
}
