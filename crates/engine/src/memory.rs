//! In-memory reference backend
//!
//! ## Design
//!
//! [`MemStore`] is the shared state of one store: the ordered key space, the
//! watch dispatcher and the distributed lock record. [`MemKv`] is a handle on
//! a store. Every handle is its own session: it owns the watchers it registers
//! and is a distinct identity for the distributed lock.
//!
//! A private store (`mem:`) has exactly one handle. A named store
//! (`mem:<name>`) may have many, and they observe each other's mutations.
//!
//! ## Thread Safety
//!
//! `MemKv` is `Send + Sync`. Mutations are serialized by the key-space write
//! lock; reads take the read lock and never observe a partial mutation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use hmkv_concurrency::{test_and_set, CompareRequest, LockRecord};
use hmkv_core::{
    validate_key_with_limits, validate_range_bound, ChangeEvent, Entry, Kvi, KviError, KviResult,
    Limits, OpFilter, SessionId, WatchCallback, WatchContext, WatchHandle,
};
use hmkv_storage::KeySpace;

use crate::config::KviConfig;
use crate::registry;
use crate::watch::{WatchDispatcher, WatchStats};

/// Backend name reported by [`Kvi::backend_name`]
pub const MEM_BACKEND: &str = "mem";

/// Shared state of one in-memory store
#[derive(Debug)]
pub struct MemStore {
    config: KviConfig,
    limits: Limits,
    keyspace: KeySpace,
    dispatcher: WatchDispatcher,
    lock: LockRecord,
}

impl MemStore {
    /// Create an empty store
    pub fn new(config: KviConfig) -> Self {
        Self {
            limits: config.limits(),
            keyspace: KeySpace::new(),
            dispatcher: WatchDispatcher::new(
                config.max_watchers,
                config.max_callback_backlog,
                config.worker_name_prefix.clone(),
            ),
            lock: LockRecord::new(),
            config,
        }
    }

    /// Configuration this store was created with
    pub fn config(&self) -> &KviConfig {
        &self.config
    }

    /// The ordered key space
    pub fn keyspace(&self) -> &KeySpace {
        &self.keyspace
    }

    /// The watch dispatcher
    pub fn dispatcher(&self) -> &WatchDispatcher {
        &self.dispatcher
    }

    /// The distributed lock record
    pub fn lock_record(&self) -> &LockRecord {
        &self.lock
    }

    fn check_key(&self, key: &str) -> KviResult<()> {
        validate_key_with_limits(key, &self.limits)?;
        Ok(())
    }

    fn check_entry(&self, key: &str, value: &str) -> KviResult<()> {
        self.check_key(key)?;
        self.limits.validate_value(value)?;
        Ok(())
    }
}

/// Handle on an in-memory store
pub struct MemKv {
    store: Arc<MemStore>,
    session: SessionId,
    closed: AtomicBool,
}

impl MemKv {
    /// Open a handle on a fresh private store
    pub fn open(config: KviConfig) -> Self {
        let kv = Self::attach(Arc::new(MemStore::new(config)));
        info!(target: "hmkv::open", session = %kv.session, "opened private in-memory store");
        kv
    }

    /// Open a handle on the named store, creating it if no handle holds it
    pub fn open_named(name: &str, config: KviConfig) -> Self {
        let kv = Self::attach(registry::shared_store(name, &config));
        info!(target: "hmkv::open", session = %kv.session, name, "opened named in-memory store");
        kv
    }

    /// Open another session on the same store as this handle
    pub fn new_session(&self) -> KviResult<Self> {
        self.ensure_open()?;
        Ok(Self::attach(Arc::clone(&self.store)))
    }

    fn attach(store: Arc<MemStore>) -> Self {
        Self {
            store,
            session: SessionId::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Shared store behind this handle
    pub fn backing_store(&self) -> &Arc<MemStore> {
        &self.store
    }

    /// True once [`Kvi::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Dispatcher metrics of the underlying store
    pub fn watch_stats(&self) -> WatchStats {
        self.store.dispatcher.stats()
    }

    /// Number of blocking watches pending on `key` across all sessions
    pub fn pending_watches(&self, key: &str) -> usize {
        self.store.dispatcher.pending_waiters(key)
    }

    /// True if `handle` names an active callback watch
    pub fn is_watch_active(&self, handle: WatchHandle) -> bool {
        self.store.dispatcher.is_active(handle)
    }

    /// Revision of the most recent mutation
    pub fn revision(&self) -> u64 {
        self.store.keyspace.current_revision()
    }

    fn ensure_open(&self) -> KviResult<()> {
        if self.is_closed() {
            return Err(KviError::Closed);
        }
        Ok(())
    }

    // A registration may race with close(): close() flips the flag before it
    // sweeps the dispatcher, so re-checking after registering catches every
    // registration the sweep might have missed.
    fn recheck_after_register(&self) -> KviResult<()> {
        if self.is_closed() {
            self.store.dispatcher.close_session(self.session);
            return Err(KviError::Closed);
        }
        Ok(())
    }
}

impl Kvi for MemKv {
    fn close(&self) -> KviResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(KviError::Closed);
        }

        // Blocked dist_lock calls of this session re-check the closed flag.
        // Wake them before joining callback workers, which may be waiting on them.
        self.store.lock.wake_all();
        if self.store.lock.release_if_held(self.session) {
            debug!(target: "hmkv::lock", session = %self.session, "lock released on close");
        }
        self.store.dispatcher.close_session(self.session);

        info!(target: "hmkv::open", session = %self.session, "handle closed");
        Ok(())
    }

    fn store(&self, key: &str, value: &str) -> KviResult<()> {
        self.ensure_open()?;
        self.store.check_entry(key, value)?;
        self.store.keyspace.put(key, value, &self.store.dispatcher);
        Ok(())
    }

    fn get(&self, key: &str) -> KviResult<Option<String>> {
        self.ensure_open()?;
        self.store.check_key(key)?;
        Ok(self.store.keyspace.get(key))
    }

    fn delete(&self, key: &str) -> KviResult<()> {
        self.ensure_open()?;
        self.store.check_key(key)?;
        self.store.keyspace.delete(key, &self.store.dispatcher);
        Ok(())
    }

    fn get_range(&self, start: &str, end: &str) -> KviResult<Vec<Entry>> {
        self.ensure_open()?;
        validate_range_bound(start, &self.store.limits)?;
        validate_range_bound(end, &self.store.limits)?;
        Ok(self.store.keyspace.range(start, end))
    }

    fn transaction(
        &self,
        key: &str,
        op: &str,
        test_value: &str,
        then_key: &str,
        then_value: &str,
        else_key: &str,
        else_value: &str,
    ) -> KviResult<bool> {
        self.ensure_open()?;
        let request =
            CompareRequest::parse(key, op, test_value, then_key, then_value, else_key, else_value)?;
        self.store.check_key(key)?;
        self.store.check_entry(then_key, then_value)?;
        self.store.check_entry(else_key, else_value)?;

        let mut txn = self.store.keyspace.begin(&self.store.dispatcher);
        let branch = request.execute(&mut txn);
        drop(txn);

        debug!(
            target: "hmkv::store",
            key,
            op = %request.op,
            took_then = branch.took_then(),
            "transaction"
        );
        Ok(branch.took_then())
    }

    fn tas(&self, key: &str, test_value: &str, set_value: &str) -> KviResult<bool> {
        self.ensure_open()?;
        self.store.check_entry(key, set_value)?;

        let mut txn = self.store.keyspace.begin(&self.store.dispatcher);
        let did_set = test_and_set(&mut txn, key, test_value, set_value);
        drop(txn);

        debug!(target: "hmkv::store", key, did_set, "test-and-set");
        Ok(did_set)
    }

    fn dist_lock(&self) -> KviResult<()> {
        self.ensure_open()?;
        self.store
            .lock
            .acquire(self.session, &|| self.closed.load(Ordering::SeqCst))?;
        // Lost a race with close(): give the lock back
        if self.is_closed() {
            self.store.lock.release_if_held(self.session);
            return Err(KviError::Closed);
        }
        Ok(())
    }

    fn dist_unlock(&self) -> KviResult<()> {
        self.ensure_open()?;
        self.store.lock.release(self.session)
    }

    fn watch(&self, key: &str) -> KviResult<ChangeEvent> {
        self.ensure_open()?;
        self.store.check_key(key)?;
        let waiter = self.store.dispatcher.register_waiter(self.session, key)?;
        self.recheck_after_register()?;
        waiter.wait()
    }

    fn watch_with_cb(
        &self,
        key: &str,
        filter: OpFilter,
        callback: WatchCallback,
        context: WatchContext,
    ) -> KviResult<WatchHandle> {
        self.ensure_open()?;
        self.store.check_key(key)?;
        let handle = self
            .store
            .dispatcher
            .register_callback(self.session, key, filter, callback, context)?;
        self.recheck_after_register()?;
        Ok(handle)
    }

    fn watch_cb_cancel(&self, handle: WatchHandle) {
        // close() already cancelled everything this session owned
        if self.is_closed() {
            return;
        }
        self.store.dispatcher.cancel(self.session, handle);
    }

    fn session_id(&self) -> SessionId {
        self.session
    }

    fn backend_name(&self) -> &'static str {
        MEM_BACKEND
    }
}

impl Drop for MemKv {
    fn drop(&mut self) {
        if !self.is_closed() {
            let _ = self.close();
        }
    }
}

impl std::fmt::Debug for MemKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemKv")
            .field("session", &self.session)
            .field("closed", &self.is_closed())
            .finish()
    }
}
