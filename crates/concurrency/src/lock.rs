//! Session-keyed distributed lock record
//!
//! One `LockRecord` is shared by every handle of a store. It tracks which
//! session (if any) holds the lock. Re-entrancy is keyed on holder identity,
//! not on a call count: a holder re-acquiring returns immediately, and a
//! single release frees the lock.

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use hmkv_core::{KviError, KviResult, SessionId};

/// Shared lock state
#[derive(Debug, Default)]
pub struct LockRecord {
    holder: Mutex<Option<SessionId>>,
    released: Condvar,
}

impl LockRecord {
    /// Create an unheld lock
    pub fn new() -> Self {
        Self {
            holder: Mutex::new(None),
            released: Condvar::new(),
        }
    }

    /// Current holder, if any
    pub fn holder(&self) -> Option<SessionId> {
        *self.holder.lock()
    }

    /// True if `session` holds the lock
    pub fn is_held_by(&self, session: SessionId) -> bool {
        self.holder() == Some(session)
    }

    /// Take the lock without blocking
    ///
    /// Succeeds if the lock is free or already held by `session`.
    pub fn try_acquire(&self, session: SessionId) -> bool {
        let mut holder = self.holder.lock();
        match *holder {
            None => {
                *holder = Some(session);
                true
            }
            Some(current) => current == session,
        }
    }

    /// Block until `session` holds the lock
    ///
    /// `cancelled` is consulted under the record's mutex before every wait;
    /// once it returns true the wait is abandoned with `Closed`. Callers that
    /// flip the predicate must follow with [`wake_all`](Self::wake_all), which
    /// takes the same mutex, so no wakeup is lost.
    pub fn acquire(&self, session: SessionId, cancelled: &dyn Fn() -> bool) -> KviResult<()> {
        let mut holder = self.holder.lock();
        loop {
            match *holder {
                None => {
                    *holder = Some(session);
                    debug!(target: "hmkv::lock", session = %session, "lock acquired");
                    return Ok(());
                }
                Some(current) if current == session => return Ok(()),
                Some(_) => {
                    if cancelled() {
                        return Err(KviError::Closed);
                    }
                    self.released.wait(&mut holder);
                }
            }
        }
    }

    /// Release the lock held by `session`
    ///
    /// # Errors
    ///
    /// Returns `NotHeld` if `session` is not the holder.
    pub fn release(&self, session: SessionId) -> KviResult<()> {
        let mut holder = self.holder.lock();
        if *holder != Some(session) {
            return Err(KviError::NotHeld);
        }
        *holder = None;
        debug!(target: "hmkv::lock", session = %session, "lock released");
        self.released.notify_all();
        Ok(())
    }

    /// Release the lock if `session` holds it; returns whether it did
    pub fn release_if_held(&self, session: SessionId) -> bool {
        self.release(session).is_ok()
    }

    /// Wake every blocked acquirer so it re-checks its predicate
    pub fn wake_all(&self) {
        let _holder = self.holder.lock();
        self.released.notify_all();
    }
}
