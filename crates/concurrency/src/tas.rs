//! Test-and-set
//!
//! Sets a key only if its current value equals a test value. Unlike
//! transactions, a missing key never matches, not even an empty test value.

use hmkv_storage::KeySpaceTxn;

/// Set `key` to `set_value` inside `txn` if it currently equals `test_value`
///
/// Returns whether the write happened. On a mismatch the entry is untouched
/// and no change event is published.
pub fn test_and_set(txn: &mut KeySpaceTxn<'_>, key: &str, test_value: &str, set_value: &str) -> bool {
    match txn.get(key) {
        Some(current) if current == test_value => {
            txn.put(key, set_value);
            true
        }
        _ => false,
    }
}
