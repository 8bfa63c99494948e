//! Open/Close Tests
//!
//! Descriptor handling, option parsing and the closed-handle contract.

use crate::common::assert_helpers::*;
use crate::common::*;
use std::io::Write;

#[test]
fn test_open_close_mem() {
    let kv = open_kvi();
    assert_eq!(kv.backend_name(), "mem");
    kv.close().unwrap();
}

#[test]
fn test_second_close_reports_closed() {
    let kv = open_kvi();
    kv.close().unwrap();
    assert_closed(kv.close());
}

#[test]
fn test_every_operation_fails_after_close() {
    let kv = open_kvi();
    kv.store("k", "v").unwrap();
    kv.close().unwrap();

    assert_closed(kv.store("k", "v"));
    assert_closed(kv.get("k"));
    assert_closed(kv.get_or_empty("k"));
    assert_closed(kv.delete("k"));
    assert_closed(kv.get_range("a", "z"));
    assert_closed(kv.transaction("k", "=", "v", "a", "1", "b", "2"));
    assert_closed(kv.tas("k", "v", "w"));
    assert_closed(kv.dist_lock());
    assert_closed(kv.dist_unlock());
    assert_closed(kv.watch("k"));
    assert_closed(kv.watch_with_cb("k", OpFilter::ALL, recording_callback(true), WatchRecord::new()));
}

#[test]
fn test_malformed_descriptors_fail_with_connection() {
    for descriptor in ["", "mem", "memory:", "etcd:", "etcd:no-port", "etcd:host:99999"] {
        assert_connection(open(descriptor, ""));
    }
}

#[test]
fn test_etcd_descriptor_is_recognized_but_unavailable() {
    let err = open("etcd:127.0.0.1:2379,127.0.0.2:2379", "").err().unwrap();
    match err {
        KviError::Connection(msg) => assert!(msg.contains("etcd"), "{}", msg),
        other => panic!("Expected Connection, got: {:?}", other),
    }
}

#[test]
fn test_bad_options_fail_with_connection() {
    assert_connection(open("mem:", "max_key_bytes"));
    assert_connection(open("mem:", "max_key_bytes=-1"));
    assert_connection(open("mem:", "max_key_bytes=0"));
    assert_connection(open("mem:", "max_value_bytes=0"));
    assert_connection(open("mem:", "max_watchers=0"));
    assert_connection(open("mem:", "unknown=1"));
    assert_connection(open("mem:", "config=/definitely/not/here.toml"));
}

#[test]
fn test_options_are_applied() {
    let kv = open("mem:", " max_key_bytes = 8 , max_value_bytes=4 ").unwrap();
    kv.store("12345678", "1234").unwrap();
    assert_invalid_argument(kv.store("123456789", "v"));
    assert_invalid_argument(kv.store("k", "12345"));
}

#[test]
fn test_config_file_then_inline_override() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_key_bytes = 4").unwrap();
    writeln!(file, "max_value_bytes = 4").unwrap();
    file.flush().unwrap();

    let options = format!("config={},max_value_bytes=16", file.path().display());
    let kv = open("mem:", &options).unwrap();

    assert_invalid_argument(kv.store("toolong", "v"));
    kv.store("abcd", "sixteen-bytes-ok").unwrap();
}

#[test]
fn test_named_store_outlives_one_handle() {
    let name = unique_name("open_close_named");
    let a = open(&format!("mem:{}", name), "").unwrap();
    let b = open(&format!("mem:{}", name), "").unwrap();

    a.store("k", "v").unwrap();
    a.close().unwrap();
    assert_eq!(b.get("k").unwrap(), Some("v".to_string()));
}

#[test]
fn test_named_store_resets_after_last_handle() {
    let name = unique_name("open_close_reset");
    let descriptor = format!("mem:{}", name);

    let a = open(&descriptor, "").unwrap();
    a.store("k", "v").unwrap();
    drop(a);

    let b = open(&descriptor, "").unwrap();
    assert_eq!(b.get("k").unwrap(), None);
}
