//! Store/Get/Delete Tests

use crate::common::assert_helpers::*;
use crate::common::*;

#[test]
fn test_store_then_get() {
    let kv = open_kvi();
    kv.store("k", "v").unwrap();
    assert_eq!(kv.get("k").unwrap(), Some("v".to_string()));
    assert_eq!(kv.get_or_empty("k").unwrap(), ("v".to_string(), true));
}

#[test]
fn test_missing_key_is_not_an_error() {
    let kv = open_kvi();
    assert_eq!(kv.get("xyzzy_xyzzy").unwrap(), None);
    assert_eq!(kv.get_or_empty("xyzzy_xyzzy").unwrap(), (String::new(), false));
}

#[test]
fn test_thousand_keys_read_back() {
    let kv = open_kvi();
    seed_keys(kv.as_ref(), 1000);

    for i in 0..1000 {
        assert_eq!(kv.get(&key_name(i)).unwrap(), Some(val_name(i)), "key {}", i);
    }
    kv.close().unwrap();
}

#[test]
fn test_overwrite_replaces_value() {
    let kv = open_kvi();
    kv.store("k", "first").unwrap();
    kv.store("k", "second").unwrap();
    assert_eq!(kv.get("k").unwrap(), Some("second".to_string()));
    assert_eq!(kv.get_range("k", "k").unwrap().len(), 1);
}

#[test]
fn test_delete_removes_entry() {
    let kv = open_kvi();
    seed_keys(kv.as_ref(), 100);

    kv.delete("key_0023").unwrap();
    assert_eq!(kv.get("key_0023").unwrap(), None);
    assert_eq!(kv.get("key_0022").unwrap(), Some("val_0022".to_string()));
    assert_eq!(kv.get("key_0024").unwrap(), Some("val_0024".to_string()));
}

#[test]
fn test_delete_absent_key_succeeds() {
    let kv = open_kvi();
    kv.delete("never-stored").unwrap();
    kv.delete("never-stored").unwrap();
}

#[test]
fn test_empty_value_is_distinct_from_missing() {
    let kv = open_kvi();
    kv.store("k", "").unwrap();
    assert_eq!(kv.get("k").unwrap(), Some(String::new()));
    assert_eq!(kv.get_or_empty("k").unwrap(), (String::new(), true));
}

#[test]
fn test_invalid_keys_rejected() {
    let kv = open_kvi();
    assert_invalid_argument(kv.store("", "v"));
    assert_invalid_argument(kv.store("nul\0key", "v"));
    assert_invalid_argument(kv.get(""));
    assert_invalid_argument(kv.delete(""));
    assert_invalid_argument(kv.store(&"k".repeat(1025), "v"));
    kv.store(&"k".repeat(1024), "v").unwrap();
}

#[test]
fn test_unicode_keys_and_values() {
    let kv = open_kvi();
    kv.store("ключ/日本", "värde ✓").unwrap();
    assert_eq!(kv.get("ключ/日本").unwrap(), Some("värde ✓".to_string()));
}

#[test]
fn test_revision_advances_per_mutation() {
    let kv = open_mem();
    let start = kv.revision();
    kv.store("a", "1").unwrap();
    kv.store("a", "2").unwrap();
    kv.delete("a").unwrap();
    kv.get("a").unwrap();
    assert_eq!(kv.revision(), start + 3);
}
