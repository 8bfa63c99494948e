//! Global registry of named in-memory stores
//!
//! Opening `mem:<name>` twice in one process yields two handles on the same
//! [`MemStore`]. The registry holds weak references, so a named store is
//! dropped once its last handle is gone and the next open starts empty.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::info;

use crate::config::KviConfig;
use crate::memory::MemStore;

/// Global registry of open named stores (name -> weak reference)
static NAMED_STORES: Lazy<Mutex<HashMap<String, Weak<MemStore>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Return the live store called `name`, creating it with `config` if needed
///
/// The config of the first opener wins; later openers join the existing store
/// and their settings are ignored.
pub fn shared_store(name: &str, config: &KviConfig) -> Arc<MemStore> {
    let mut stores = NAMED_STORES.lock();

    if let Some(store) = stores.get(name).and_then(Weak::upgrade) {
        if store.config() != config {
            info!(
                target: "hmkv::open",
                name,
                "joining existing named store; supplied options ignored"
            );
        }
        return store;
    }

    stores.retain(|_, weak| weak.strong_count() > 0);
    let store = Arc::new(MemStore::new(config.clone()));
    stores.insert(name.to_string(), Arc::downgrade(&store));
    info!(target: "hmkv::open", name, "created named in-memory store");
    store
}

/// Number of named stores that are still alive
pub fn live_named_stores() -> usize {
    NAMED_STORES
        .lock()
        .values()
        .filter(|weak| weak.strong_count() > 0)
        .count()
}
