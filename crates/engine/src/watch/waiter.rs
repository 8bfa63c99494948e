//! One-shot blocking waiter
//!
//! States: `Pending -> Fired -> Consumed`, or `Pending -> Cancelled` when the
//! owning handle closes. A waiter is never reused.

use parking_lot::{Condvar, Mutex};

use hmkv_core::{ChangeEvent, KviError, KviResult, SessionId};

#[derive(Debug)]
enum WaiterState {
    Pending,
    Fired(ChangeEvent),
    Cancelled,
    Consumed,
}

/// Result slot for a single blocking `watch` call
#[derive(Debug)]
pub struct Waiter {
    session: SessionId,
    state: Mutex<WaiterState>,
    ready: Condvar,
}

impl Waiter {
    pub(crate) fn new(session: SessionId) -> Self {
        Self {
            session,
            state: Mutex::new(WaiterState::Pending),
            ready: Condvar::new(),
        }
    }

    /// Session that registered this waiter
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Deliver `event`; ignored unless still pending
    pub(crate) fn fire(&self, event: &ChangeEvent) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, WaiterState::Pending) {
            return false;
        }
        *state = WaiterState::Fired(event.clone());
        self.ready.notify_all();
        true
    }

    /// Wake the waiter with `Closed`; ignored unless still pending
    pub(crate) fn cancel(&self) {
        let mut state = self.state.lock();
        if matches!(*state, WaiterState::Pending) {
            *state = WaiterState::Cancelled;
            self.ready.notify_all();
        }
    }

    /// Block until fired or cancelled
    ///
    /// # Errors
    ///
    /// Returns `Closed` if the waiter was cancelled, or `Backend` if the
    /// slot was already consumed.
    pub fn wait(&self) -> KviResult<ChangeEvent> {
        let mut state = self.state.lock();
        while matches!(*state, WaiterState::Pending) {
            self.ready.wait(&mut state);
        }
        match std::mem::replace(&mut *state, WaiterState::Consumed) {
            WaiterState::Fired(event) => Ok(event),
            WaiterState::Cancelled => {
                *state = WaiterState::Cancelled;
                Err(KviError::Closed)
            }
            WaiterState::Consumed => Err(KviError::backend("watch result already consumed")),
            WaiterState::Pending => unreachable!("loop exits only once the waiter left Pending"),
        }
    }
}
