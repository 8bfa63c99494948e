//! Watch dispatcher
//!
//! Registry of pending watchers per key, fed by the key space through the
//! [`ChangeSink`] seam.
//!
//! ## Delivery
//!
//! `publish` runs with the key-space write lock held. It fires and removes
//! every blocking waiter on the key, and appends the event to the mailbox of
//! every matching callback watcher, cancelling any watcher whose mailbox is
//! already at its backlog limit. Because publication is serialized by the
//! write lock, all watchers of a key observe events in the same order.
//!
//! ## Lock Order
//!
//! key space -> registry -> watcher mailbox. Callback workers never hold the
//! registry while running user code.

mod callback;
mod waiter;

pub use callback::{CallbackWatcher, WorkerExit};
pub use waiter::Waiter;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use hmkv_core::{
    ChangeEvent, KviError, KviResult, OpFilter, SessionId, WatchCallback, WatchContext,
    WatchHandle,
};
use hmkv_storage::ChangeSink;

/// Dispatcher metrics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    /// Blocking waiters currently registered.
    pub blocking_watchers: usize,
    /// Active callback watchers currently registered.
    pub callback_watchers: usize,
    /// Change events published since creation.
    pub events_published: u64,
    /// Events handed to a waiter or queued to a callback mailbox.
    pub events_delivered: u64,
    /// Callback invocations completed.
    pub callbacks_invoked: u64,
    /// Callback watchers cancelled because their backlog limit was reached.
    pub callbacks_overflowed: u64,
}

#[derive(Debug, Default)]
struct Registry {
    waiters: HashMap<String, Vec<Arc<Waiter>>>,
    callbacks: HashMap<String, Vec<Arc<CallbackWatcher>>>,
    waiter_count: usize,
    callback_count: usize,
}

impl Registry {
    fn live(&self) -> usize {
        self.waiter_count + self.callback_count
    }

    fn remove_callback(&mut self, watcher: &CallbackWatcher) -> bool {
        let Some(list) = self.callbacks.get_mut(watcher.key()) else {
            return false;
        };
        let before = list.len();
        list.retain(|w| w.handle() != watcher.handle());
        let removed = before != list.len();
        if list.is_empty() {
            self.callbacks.remove(watcher.key());
        }
        if removed {
            self.callback_count -= 1;
        }
        removed
    }
}

#[derive(Debug, Default)]
struct Counters {
    events_published: AtomicU64,
    events_delivered: AtomicU64,
    callbacks_invoked: AtomicU64,
    callbacks_overflowed: AtomicU64,
}

struct DispatcherInner {
    registry: Mutex<Registry>,
    handles: DashMap<WatchHandle, Arc<CallbackWatcher>>,
    workers: Mutex<HashMap<WatchHandle, JoinHandle<()>>>,
    counters: Counters,
    next_worker: AtomicU64,
    max_watchers: usize,
    max_backlog: usize,
    worker_prefix: String,
}

impl DispatcherInner {
    /// Remove a callback watcher from every index
    ///
    /// The worker's join handle is dropped here, detaching the thread. It
    /// exits on its own once it observes the cancelled state.
    fn deregister(&self, watcher: &CallbackWatcher) {
        self.registry.lock().remove_callback(watcher);
        self.handles.remove(&watcher.handle());
        self.workers.lock().remove(&watcher.handle());
    }
}

/// Registry of blocking and callback watchers for one store
pub struct WatchDispatcher {
    inner: Arc<DispatcherInner>,
}

impl WatchDispatcher {
    /// Create a dispatcher
    ///
    /// `max_watchers` caps live registrations and `max_backlog` caps each
    /// callback mailbox (0 for unbounded). Callback workers are named
    /// `{worker_prefix}-{n}`.
    pub fn new(max_watchers: usize, max_backlog: usize, worker_prefix: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                registry: Mutex::new(Registry::default()),
                handles: DashMap::new(),
                workers: Mutex::new(HashMap::new()),
                counters: Counters::default(),
                next_worker: AtomicU64::new(0),
                max_watchers,
                max_backlog,
                worker_prefix: worker_prefix.into(),
            }),
        }
    }

    fn check_capacity(&self, registry: &Registry) -> KviResult<()> {
        if registry.live() >= self.inner.max_watchers {
            warn!(
                target: "hmkv::watch",
                limit = self.inner.max_watchers,
                "watcher limit reached"
            );
            return Err(KviError::backend(format!(
                "watcher limit of {} reached",
                self.inner.max_watchers
            )));
        }
        Ok(())
    }

    /// Register a one-shot waiter for any change of `key`
    pub fn register_waiter(&self, session: SessionId, key: &str) -> KviResult<Arc<Waiter>> {
        let waiter = Arc::new(Waiter::new(session));
        let mut registry = self.inner.registry.lock();
        self.check_capacity(&registry)?;
        registry
            .waiters
            .entry(key.to_string())
            .or_default()
            .push(Arc::clone(&waiter));
        registry.waiter_count += 1;
        debug!(target: "hmkv::watch", session = %session, key, "blocking watch registered");
        Ok(waiter)
    }

    /// Register a persistent callback subscription and start its worker
    pub fn register_callback(
        &self,
        session: SessionId,
        key: &str,
        filter: OpFilter,
        callback: WatchCallback,
        context: WatchContext,
    ) -> KviResult<WatchHandle> {
        let handle = WatchHandle::new();
        let watcher = Arc::new(CallbackWatcher::new(
            handle,
            session,
            key,
            filter,
            self.inner.max_backlog,
        ));

        // Hold the workers map across spawn and insert so a callback that
        // cancels itself immediately cannot race ahead of the insert.
        let mut workers = self.inner.workers.lock();
        {
            let mut registry = self.inner.registry.lock();
            self.check_capacity(&registry)?;
            registry
                .callbacks
                .entry(key.to_string())
                .or_default()
                .push(Arc::clone(&watcher));
            registry.callback_count += 1;
        }
        self.inner.handles.insert(handle, Arc::clone(&watcher));

        let inner = Arc::clone(&self.inner);
        let worker_watcher = Arc::clone(&watcher);
        let worker_id = self.inner.next_worker.fetch_add(1, Ordering::Relaxed);
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", self.inner.worker_prefix, worker_id))
            .spawn(move || {
                let counters = &inner.counters;
                let exit = worker_watcher.run(callback, context, &|| {
                    counters.callbacks_invoked.fetch_add(1, Ordering::Relaxed);
                });
                if exit == WorkerExit::Overflowed {
                    counters.callbacks_overflowed.fetch_add(1, Ordering::Relaxed);
                }
                if exit != WorkerExit::Cancelled {
                    inner.deregister(&worker_watcher);
                }
            });

        match spawned {
            Ok(join) => {
                workers.insert(handle, join);
                debug!(
                    target: "hmkv::watch",
                    session = %session,
                    handle = %handle,
                    key,
                    filter = filter.bits(),
                    "callback watch registered"
                );
                Ok(handle)
            }
            Err(e) => {
                drop(workers);
                watcher.deactivate();
                self.inner.deregister(&watcher);
                Err(KviError::backend(format!(
                    "failed to spawn watch worker: {}",
                    e
                )))
            }
        }
    }

    /// Cancel a callback subscription owned by `session`
    ///
    /// Handles registered by another session are ignored. Idempotent and
    /// never blocks on the worker, so it is safe to call from inside the
    /// callback itself.
    pub fn cancel(&self, session: SessionId, handle: WatchHandle) {
        let Some((_, watcher)) = self
            .inner
            .handles
            .remove_if(&handle, |_, w| w.session() == session)
        else {
            return;
        };
        if watcher.deactivate() {
            debug!(target: "hmkv::watch", handle = %handle, "callback watch cancelled");
        }
        self.inner.deregister(&watcher);
    }

    /// Cancel every watcher registered by `session`
    ///
    /// Wakes the session's blocking waiters with `Closed`, cancels its callback
    /// watchers and joins their workers. A worker running on the calling
    /// thread (a callback closing its own handle) is detached instead.
    pub fn close_session(&self, session: SessionId) {
        let (waiters, watchers) = {
            let mut registry = self.inner.registry.lock();
            let mut waiters = Vec::new();
            for list in registry.waiters.values_mut() {
                let (mine, rest): (Vec<_>, Vec<_>) =
                    list.drain(..).partition(|w| w.session() == session);
                *list = rest;
                waiters.extend(mine);
            }
            registry.waiters.retain(|_, list| !list.is_empty());
            registry.waiter_count -= waiters.len();

            let watchers: Vec<_> = registry
                .callbacks
                .values()
                .flatten()
                .filter(|w| w.session() == session)
                .cloned()
                .collect();
            for watcher in &watchers {
                registry.remove_callback(watcher);
            }
            (waiters, watchers)
        };

        for waiter in &waiters {
            waiter.cancel();
        }

        let me = thread::current().id();
        let mut joins = Vec::new();
        {
            let mut workers = self.inner.workers.lock();
            for watcher in &watchers {
                watcher.deactivate();
                self.inner.handles.remove(&watcher.handle());
                if let Some(join) = workers.remove(&watcher.handle()) {
                    joins.push(join);
                }
            }
        }
        for join in joins {
            if join.thread().id() != me {
                let _ = join.join();
            }
        }

        debug!(
            target: "hmkv::watch",
            session = %session,
            waiters = waiters.len(),
            callbacks = watchers.len(),
            "session watchers released"
        );
    }

    /// True if `handle` names an active callback watcher
    pub fn is_active(&self, handle: WatchHandle) -> bool {
        self.inner
            .handles
            .get(&handle)
            .map(|w| w.is_active())
            .unwrap_or(false)
    }

    /// Number of blocking waiters pending on `key`
    pub fn pending_waiters(&self, key: &str) -> usize {
        self.inner
            .registry
            .lock()
            .waiters
            .get(key)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Return a snapshot of dispatcher metrics.
    pub fn stats(&self) -> WatchStats {
        let registry = self.inner.registry.lock();
        let counters = &self.inner.counters;
        WatchStats {
            blocking_watchers: registry.waiter_count,
            callback_watchers: registry.callback_count,
            events_published: counters.events_published.load(Ordering::Relaxed),
            events_delivered: counters.events_delivered.load(Ordering::Relaxed),
            callbacks_invoked: counters.callbacks_invoked.load(Ordering::Relaxed),
            callbacks_overflowed: counters.callbacks_overflowed.load(Ordering::Relaxed),
        }
    }
}

impl ChangeSink for WatchDispatcher {
    fn publish(&self, event: &ChangeEvent) {
        let counters = &self.inner.counters;
        counters.events_published.fetch_add(1, Ordering::Relaxed);

        let mut registry = self.inner.registry.lock();
        let mut delivered = 0u64;

        if let Some(waiters) = registry.waiters.remove(&event.key) {
            registry.waiter_count -= waiters.len();
            for waiter in waiters {
                if waiter.fire(event) {
                    delivered += 1;
                }
            }
        }

        if let Some(watchers) = registry.callbacks.get(&event.key) {
            for watcher in watchers {
                if watcher.offer(event) {
                    delivered += 1;
                }
            }
        }

        counters
            .events_delivered
            .fetch_add(delivered, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for WatchDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchDispatcher")
            .field("stats", &self.stats())
            .finish()
    }
}
