//! The backend-agnostic store contract
//!
//! [`Kvi`] is the single interface every backend implements. Callers obtain
//! a `Box<dyn Kvi>` at open time and never learn which backend is behind it.
//!
//! Thread safety: all methods must be safe to call concurrently from
//! multiple threads on the same handle (requires Send + Sync).

use std::any::Any;
use std::sync::Arc;

use crate::error::KviResult;
use crate::types::{ChangeEvent, Entry, OpFilter, SessionId, WatchHandle};

/// Opaque caller payload handed back verbatim to a watch callback
///
/// The dispatcher never inspects it. Callbacks recover their concrete type
/// with `downcast_ref`.
pub type WatchContext = Arc<dyn Any + Send + Sync>;

/// Callback invoked for each matching change event
///
/// Returning `false` cancels the subscription; no further events are delivered.
pub type WatchCallback = Box<dyn FnMut(&ChangeEvent, &WatchContext) -> bool + Send + 'static>;

/// Key-value store contract
pub trait Kvi: Send + Sync {
    /// Release everything owned by this handle
    ///
    /// Wakes every outstanding blocking watch of this handle with
    /// `Closed`, cancels its callback watchers and releases the distributed
    /// lock if this handle holds it.
    ///
    /// # Errors
    ///
    /// Returns `Closed` if the handle was already closed.
    fn close(&self) -> KviResult<()>;

    /// Insert or overwrite `key`, then emit a PUT change event
    fn store(&self, key: &str, value: &str) -> KviResult<()>;

    /// Read the current value of `key`
    ///
    /// A missing key is `Ok(None)`, never an error.
    fn get(&self, key: &str) -> KviResult<Option<String>>;

    /// Remove `key` if present, then emit a DELETE change event
    ///
    /// Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> KviResult<()>;

    /// Every live entry with `start <= key <= end`, ascending by key
    ///
    /// An interval with no qualifying keys yields an empty `Vec`.
    fn get_range(&self, start: &str, end: &str) -> KviResult<Vec<Entry>>;

    /// Compare the value of `key` against `test_value` and write one branch
    ///
    /// A missing `key` compares as the empty string. When
    /// `stored <op> test_value` holds, `then_key` is set to `then_value`
    /// and `true` is returned; otherwise `else_key` is set to `else_value`
    /// and `false` is returned. The read, compare and write happen atomically.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `op` is not one of `=`, `!=`, `<`, `>`.
    #[allow(clippy::too_many_arguments)]
    fn transaction(
        &self,
        key: &str,
        op: &str,
        test_value: &str,
        then_key: &str,
        then_value: &str,
        else_key: &str,
        else_value: &str,
    ) -> KviResult<bool>;

    /// Atomically set `key` to `set_value` if it currently equals `test_value`
    ///
    /// A missing key never matches. Returns whether the write happened.
    fn tas(&self, key: &str, test_value: &str, set_value: &str) -> KviResult<bool>;

    /// Block until this handle holds the distributed lock
    ///
    /// Returns immediately if this handle already holds it.
    fn dist_lock(&self) -> KviResult<()>;

    /// Release the distributed lock held by this handle
    ///
    /// # Errors
    ///
    /// Returns `NotHeld` if this handle does not hold the lock.
    fn dist_unlock(&self) -> KviResult<()>;

    /// Block until the next PUT or DELETE on `key`, then return it
    ///
    /// A watch on a key that does not exist yet fires on its first PUT.
    ///
    /// # Errors
    ///
    /// Returns `Closed` if the handle is closed while waiting.
    fn watch(&self, key: &str) -> KviResult<ChangeEvent>;

    /// Subscribe `callback` to changes of `key` that pass `filter`
    ///
    /// The subscription stays active until the callback returns `false`,
    /// [`watch_cb_cancel`](Kvi::watch_cb_cancel) is called, or the handle closes.
    fn watch_with_cb(
        &self,
        key: &str,
        filter: OpFilter,
        callback: WatchCallback,
        context: WatchContext,
    ) -> KviResult<WatchHandle>;

    /// Cancel a callback subscription
    ///
    /// Idempotent; unknown or already-cancelled handles are ignored, as are
    /// handles registered by another session and calls on a closed handle.
    fn watch_cb_cancel(&self, handle: WatchHandle);

    /// Identity of this handle for the distributed lock
    fn session_id(&self) -> SessionId;

    /// Short name of the backend serving this handle
    fn backend_name(&self) -> &'static str;

    /// Read `key` as a `(value, exists)` pair
    ///
    /// A missing key yields `("", false)`.
    fn get_or_empty(&self, key: &str) -> KviResult<(String, bool)> {
        Ok(match self.get(key)? {
            Some(value) => (value, true),
            None => (String::new(), false),
        })
    }
}
