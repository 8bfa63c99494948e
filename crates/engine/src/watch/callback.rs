//! Persistent callback subscriptions
//!
//! Each [`CallbackWatcher`] owns a FIFO mailbox. Mutators only enqueue; a
//! dedicated worker thread drains the mailbox and runs the user callback
//! with no store lock held, so callbacks may freely call back into the store.
//!
//! States: `Active -> Cancelled`. Both exits (the callback returning `false`
//! and an external cancel) go through [`CallbackWatcher::deactivate`], and the
//! worker checks the state before taking each event. A mailbox that reaches
//! its backlog limit also cancels the watcher, so a slow callback never sees
//! a gap in its event stream.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, warn};

use hmkv_core::{ChangeEvent, OpFilter, SessionId, WatchCallback, WatchContext, WatchHandle};

#[derive(Debug)]
struct Mailbox {
    queue: VecDeque<ChangeEvent>,
    active: bool,
    overflowed: bool,
}

/// Registration record of one callback subscription
#[derive(Debug)]
pub struct CallbackWatcher {
    handle: WatchHandle,
    session: SessionId,
    key: String,
    filter: OpFilter,
    backlog_limit: usize,
    mailbox: Mutex<Mailbox>,
    ready: Condvar,
}

/// Why a worker loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Callback returned `false`
    SelfCancelled,
    /// Watcher was cancelled from outside (cancel or close)
    Cancelled,
    /// Callback panicked
    Panicked,
    /// Mailbox reached its backlog limit
    Overflowed,
}

impl CallbackWatcher {
    /// `backlog_limit` caps undelivered events; 0 leaves the mailbox unbounded.
    pub(crate) fn new(
        handle: WatchHandle,
        session: SessionId,
        key: &str,
        filter: OpFilter,
        backlog_limit: usize,
    ) -> Self {
        Self {
            handle,
            session,
            key: key.to_string(),
            filter,
            backlog_limit,
            mailbox: Mutex::new(Mailbox {
                queue: VecDeque::new(),
                active: true,
                overflowed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Handle presented to the caller
    pub fn handle(&self) -> WatchHandle {
        self.handle
    }

    /// Session that registered this watcher
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Watched key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// True until cancelled
    pub fn is_active(&self) -> bool {
        self.mailbox.lock().active
    }

    /// Number of events waiting for the worker
    pub fn backlog(&self) -> usize {
        self.mailbox.lock().queue.len()
    }

    /// True if the watcher was cancelled because its mailbox filled up
    pub fn is_overflowed(&self) -> bool {
        self.mailbox.lock().overflowed
    }

    /// Queue `event` if it passes the filter; returns whether it was queued
    pub(crate) fn offer(&self, event: &ChangeEvent) -> bool {
        if !self.filter.matches(event.op) {
            return false;
        }
        let mut mailbox = self.mailbox.lock();
        if !mailbox.active {
            return false;
        }
        if self.backlog_limit != 0 && mailbox.queue.len() >= self.backlog_limit {
            mailbox.active = false;
            mailbox.overflowed = true;
            mailbox.queue.clear();
            self.ready.notify_all();
            warn!(
                target: "hmkv::watch",
                handle = %self.handle,
                key = %self.key,
                limit = self.backlog_limit,
                "callback backlog full, watcher cancelled"
            );
            return false;
        }
        mailbox.queue.push_back(event.clone());
        self.ready.notify_one();
        true
    }

    /// Transition to `Cancelled` and drop undelivered events
    ///
    /// Returns `true` if this call performed the transition.
    pub(crate) fn deactivate(&self) -> bool {
        let mut mailbox = self.mailbox.lock();
        let was_active = mailbox.active;
        mailbox.active = false;
        mailbox.queue.clear();
        self.ready.notify_all();
        was_active
    }

    fn next_event(&self) -> Option<ChangeEvent> {
        let mut mailbox = self.mailbox.lock();
        loop {
            if !mailbox.active {
                return None;
            }
            if let Some(event) = mailbox.queue.pop_front() {
                return Some(event);
            }
            self.ready.wait(&mut mailbox);
        }
    }

    /// Worker body: deliver events in order until the watcher is cancelled
    ///
    /// `on_invoke` runs after every callback invocation.
    pub(crate) fn run(
        &self,
        mut callback: WatchCallback,
        context: WatchContext,
        on_invoke: &dyn Fn(),
    ) -> WorkerExit {
        while let Some(event) = self.next_event() {
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(&event, &context)));
            on_invoke();
            match outcome {
                Ok(true) => {}
                Ok(false) => {
                    self.deactivate();
                    debug!(
                        target: "hmkv::watch",
                        handle = %self.handle,
                        key = %self.key,
                        "callback requested cancellation"
                    );
                    return WorkerExit::SelfCancelled;
                }
                Err(panic) => {
                    self.deactivate();
                    error!(
                        target: "hmkv::watch",
                        handle = %self.handle,
                        key = %self.key,
                        "watch callback panicked: {}",
                        panic
                            .downcast_ref::<&str>()
                            .copied()
                            .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
                            .unwrap_or("(non-string panic)")
                    );
                    return WorkerExit::Panicked;
                }
            }
        }
        if self.is_overflowed() {
            WorkerExit::Overflowed
        } else {
            WorkerExit::Cancelled
        }
    }
}
