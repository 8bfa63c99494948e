//! GetRange Tests

use crate::common::assert_helpers::*;
use crate::common::*;
use proptest::prelude::*;

#[test]
fn test_range_of_401_entries() {
    let kv = open_kvi();
    seed_keys(kv.as_ref(), 1000);

    let range = kv.get_range("key_0100", "key_0500").unwrap();
    assert_eq!(range.len(), 401);
    for (offset, entry) in range.iter().enumerate() {
        let i = offset + 100;
        assert_eq!(entry.key, key_name(i));
        assert_eq!(entry.value, val_name(i));
    }
}

#[test]
fn test_range_with_no_keys_is_empty() {
    let kv = open_kvi();
    seed_keys(kv.as_ref(), 1000);
    assert!(kv.get_range("key_AAAA", "key_BBBB").unwrap().is_empty());
}

#[test]
fn test_range_bounds_are_inclusive() {
    let kv = open_kvi();
    for key in ["a", "b", "c", "d"] {
        kv.store(key, key).unwrap();
    }
    let keys: Vec<String> = kv
        .get_range("b", "c")
        .unwrap()
        .into_iter()
        .map(|e| e.key)
        .collect();
    assert_eq!(keys, vec!["b", "c"]);
}

#[test]
fn test_range_single_key() {
    let kv = open_kvi();
    seed_keys(kv.as_ref(), 10);
    let range = kv.get_range("key_0005", "key_0005").unwrap();
    assert_eq!(range, vec![Entry::new("key_0005", "val_0005")]);
}

#[test]
fn test_inverted_range_is_empty() {
    let kv = open_kvi();
    seed_keys(kv.as_ref(), 10);
    assert!(kv.get_range("key_0008", "key_0002").unwrap().is_empty());
}

#[test]
fn test_empty_start_means_from_beginning() {
    let kv = open_kvi();
    seed_keys(kv.as_ref(), 10);
    let range = kv.get_range("", "key_0002").unwrap();
    assert_eq!(range.len(), 3);
    assert_eq!(range[0].key, "key_0000");
}

#[test]
fn test_range_skips_deleted_entries() {
    let kv = open_kvi();
    seed_keys(kv.as_ref(), 10);
    kv.delete("key_0004").unwrap();
    let keys: Vec<String> = kv
        .get_range("key_0003", "key_0005")
        .unwrap()
        .into_iter()
        .map(|e| e.key)
        .collect();
    assert_eq!(keys, vec!["key_0003", "key_0005"]);
}

#[test]
fn test_range_is_byte_ordered() {
    let kv = open_kvi();
    for key in ["a10", "a9", "A1", "a1", "b"] {
        kv.store(key, "v").unwrap();
    }
    let keys: Vec<String> = kv
        .get_range("A", "z")
        .unwrap()
        .into_iter()
        .map(|e| e.key)
        .collect();
    assert_eq!(keys, vec!["A1", "a1", "a10", "a9", "b"]);
}

#[test]
fn test_range_bound_validation() {
    let kv = open_kvi();
    assert_invalid_argument(kv.get_range("a\0", "b"));
    assert_invalid_argument(kv.get_range("a", &"z".repeat(2000)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_range_matches_model(
        entries in prop::collection::btree_map("[a-f]{1,4}", "[a-z]{0,3}", 0..40),
        start in "[a-f]{0,4}",
        end in "[a-f]{1,4}",
    ) {
        let kv = open_kvi();
        for (k, v) in &entries {
            kv.store(k, v).unwrap();
        }

        let expected: Vec<Entry> = if start.as_str() > end.as_str() {
            Vec::new()
        } else {
            entries
                .range::<String, _>(start.clone()..=end.clone())
                .map(|(k, v)| Entry::new(k.as_str(), v.as_str()))
                .collect()
        };
        prop_assert_eq!(kv.get_range(&start, &end).unwrap(), expected);
    }
}

