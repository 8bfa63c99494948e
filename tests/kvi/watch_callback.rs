//! Callback Watch Tests
//!
//! Filtering, self-cancellation, external cancellation and ordering.

use crate::common::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const DEADLINE: Duration = Duration::from_secs(5);

#[test]
fn test_put_callback_on_existing_key() {
    let kv = open_mem();
    kv.store("x0200", "val_0200").unwrap();

    let record = WatchRecord::new();
    let handle = kv
        .watch_with_cb("x0200", OpFilter::PUT, recording_callback(true), record.clone())
        .unwrap();

    kv.store("x0200", "change_0200").unwrap();
    assert!(wait_until(DEADLINE, || record.hits() == 1));
    assert_eq!(record.last_op(), Some(ChangeOp::Put));

    kv.watch_cb_cancel(handle);
    assert!(!kv.is_watch_active(handle));
}

#[test]
fn test_self_cancelling_callback_fires_once() {
    let kv = open_mem();
    let record = WatchRecord::new();
    let handle = kv
        .watch_with_cb("x0201", OpFilter::PUT, recording_callback(false), record.clone())
        .unwrap();

    kv.store("x0201", "change_0200").unwrap();
    assert!(wait_until(DEADLINE, || !kv.is_watch_active(handle)));

    kv.store("x0201", "again").unwrap();
    kv.store("x0201", "and again").unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(record.hits(), 1);
    assert_eq!(record.events()[0].value, "change_0200");
    assert_eq!(kv.watch_stats().callback_watchers, 0);
}

#[test]
fn test_delete_filter_ignores_puts() {
    let kv = open_mem();
    kv.store("x0202", "").unwrap();

    let record = WatchRecord::new();
    kv.watch_with_cb("x0202", OpFilter::DELETE, recording_callback(false), record.clone())
        .unwrap();

    kv.store("x0202", "ignored").unwrap();
    kv.delete("x0202").unwrap();
    assert!(wait_until(DEADLINE, || record.hits() == 1));
    assert_eq!(record.last_op(), Some(ChangeOp::Delete));
    assert_eq!(record.events()[0].op.code(), KEYCHANGE_DELETE);
}

#[test]
fn test_empty_filter_matches_every_op() {
    let kv = open_mem();
    let record = WatchRecord::new();
    kv.watch_with_cb("k", OpFilter::ANY, recording_callback(true), record.clone())
        .unwrap();

    kv.store("k", "v").unwrap();
    kv.delete("k").unwrap();
    assert!(wait_until(DEADLINE, || record.hits() == 2));
    let ops: Vec<ChangeOp> = record.events().iter().map(|e| e.op).collect();
    assert_eq!(ops, vec![ChangeOp::Put, ChangeOp::Delete]);
}

#[test]
fn test_combined_filter_from_codes() {
    let filter = OpFilter::from_bits(KEYCHANGE_PUT | KEYCHANGE_DELETE);
    assert_eq!(filter, OpFilter::ALL);
    assert_eq!(OpFilter::PUT | OpFilter::DELETE, OpFilter::ALL);
}

#[test]
fn test_events_delivered_in_mutation_order() {
    let kv = open_mem();
    let record = WatchRecord::new();
    kv.watch_with_cb("seq", OpFilter::ALL, recording_callback(true), record.clone())
        .unwrap();

    for i in 0..200 {
        kv.store("seq", &i.to_string()).unwrap();
    }
    assert!(wait_until(DEADLINE, || record.hits() == 200));

    let values: Vec<String> = record.events().into_iter().map(|e| e.value).collect();
    let expected: Vec<String> = (0..200).map(|i| i.to_string()).collect();
    assert_eq!(values, expected);
}

#[test]
fn test_watchers_agree_on_order_under_concurrent_writers() {
    let kv = open_mem();
    let records: Vec<_> = (0..3)
        .map(|_| {
            let record = WatchRecord::new();
            kv.watch_with_cb("hot", OpFilter::ALL, recording_callback(true), record.clone())
                .unwrap();
            record
        })
        .collect();

    let writer = Arc::clone(&kv);
    concurrent::run_concurrent(4, move |t| {
        for i in 0..50 {
            writer.store("hot", &format!("{}-{}", t, i)).unwrap();
        }
    });

    assert!(wait_until(DEADLINE, || records.iter().all(|r| r.hits() == 200)));
    let first: Vec<u64> = records[0].events().iter().map(|e| e.revision).collect();
    assert!(first.windows(2).all(|w| w[0] < w[1]));
    for record in &records[1..] {
        let revs: Vec<u64> = record.events().iter().map(|e| e.revision).collect();
        assert_eq!(revs, first);
    }
}

#[test]
fn test_cancel_is_idempotent_and_tolerates_unknown_handles() {
    let kv = open_mem();
    let handle = kv
        .watch_with_cb("k", OpFilter::ALL, recording_callback(true), WatchRecord::new())
        .unwrap();
    kv.watch_cb_cancel(handle);
    kv.watch_cb_cancel(handle);
    kv.watch_cb_cancel(WatchHandle::new());
    assert!(!kv.is_watch_active(handle));
}

#[test]
fn test_cancelled_watcher_receives_nothing() {
    let kv = open_mem();
    let record = WatchRecord::new();
    let handle = kv
        .watch_with_cb("k", OpFilter::ALL, recording_callback(true), record.clone())
        .unwrap();
    kv.watch_cb_cancel(handle);

    kv.store("k", "v").unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(record.hits(), 0);
}

#[test]
fn test_callback_can_cancel_itself_through_handle() {
    let kv = open_mem();
    let handle_slot: Arc<Mutex<Option<WatchHandle>>> = Arc::new(Mutex::new(None));
    let hits = Arc::new(AtomicUsize::new(0));

    let cb_kv = Arc::clone(&kv);
    let cb_slot = Arc::clone(&handle_slot);
    let cb_hits = Arc::clone(&hits);
    let handle = kv
        .watch_with_cb(
            "k",
            OpFilter::ALL,
            Box::new(move |_, _| {
                cb_hits.fetch_add(1, Ordering::SeqCst);
                if let Some(h) = *cb_slot.lock() {
                    cb_kv.watch_cb_cancel(h);
                }
                true
            }),
            Arc::new(()),
        )
        .unwrap();
    *handle_slot.lock() = Some(handle);

    kv.store("k", "1").unwrap();
    assert!(wait_until(DEADLINE, || !kv.is_watch_active(handle)));
    kv.store("k", "2").unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_callback_may_write_to_the_store() {
    let kv = open_mem();
    let cb_kv = Arc::clone(&kv);
    kv.watch_with_cb(
        "ping",
        OpFilter::PUT,
        Box::new(move |event, _| {
            cb_kv.store("pong", &event.value).unwrap();
            false
        }),
        Arc::new(()),
    )
    .unwrap();

    kv.store("ping", "hello").unwrap();
    assert!(wait_until(DEADLINE, || kv.get("pong").unwrap().is_some()));
    assert_eq!(kv.get("pong").unwrap(), Some("hello".to_string()));
}

#[test]
fn test_slow_callback_does_not_block_mutator() {
    let kv = open_mem();
    kv.watch_with_cb(
        "slow",
        OpFilter::ALL,
        Box::new(|_, _| {
            thread::sleep(Duration::from_millis(200));
            true
        }),
        Arc::new(()),
    )
    .unwrap();

    let stored = with_timeout(Duration::from_millis(150), {
        let kv = Arc::clone(&kv);
        move || {
            for i in 0..5 {
                kv.store("slow", &i.to_string()).unwrap();
            }
        }
    });
    assert!(stored.is_some());
}

#[test]
fn test_panicking_callback_is_cancelled() {
    let kv = open_mem();
    let handle = kv
        .watch_with_cb("k", OpFilter::ALL, Box::new(|_, _| panic!("callback bug")), Arc::new(()))
        .unwrap();

    kv.store("k", "v").unwrap();
    assert!(wait_until(DEADLINE, || !kv.is_watch_active(handle)));
    kv.store("k", "still works").unwrap();
    assert_eq!(kv.get("k").unwrap(), Some("still works".to_string()));
}

#[test]
fn test_close_cancels_all_callbacks() {
    let kv = open_mem();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            kv.watch_with_cb(&format!("k{}", i), OpFilter::ALL, recording_callback(true), WatchRecord::new())
                .unwrap()
        })
        .collect();
    assert_eq!(kv.watch_stats().callback_watchers, 4);

    kv.close().unwrap();
    assert!(handles.iter().all(|h| !kv.is_watch_active(*h)));
    assert_eq!(kv.watch_stats().callback_watchers, 0);
}

#[test]
fn test_context_is_passed_verbatim() {
    let kv = open_mem();
    let marker = Arc::new(String::from("opaque-context"));
    let seen = Arc::new(Mutex::new(None::<String>));
    let s = Arc::clone(&seen);
    kv.watch_with_cb(
        "k",
        OpFilter::ALL,
        Box::new(move |_, ctx| {
            *s.lock() = ctx.downcast_ref::<String>().cloned();
            false
        }),
        marker,
    )
    .unwrap();

    kv.store("k", "v").unwrap();
    assert!(wait_until(DEADLINE, || seen.lock().is_some()));
    assert_eq!(seen.lock().as_deref(), Some("opaque-context"));
}

#[test]
fn test_watcher_limit_from_options() {
    let kv = open("mem:", "max_watchers=2").unwrap();
    kv.watch_with_cb("a", OpFilter::ALL, recording_callback(true), WatchRecord::new())
        .unwrap();
    let h = kv
        .watch_with_cb("b", OpFilter::ALL, recording_callback(true), WatchRecord::new())
        .unwrap();
    assert!(matches!(
        kv.watch_with_cb("c", OpFilter::ALL, recording_callback(true), WatchRecord::new()),
        Err(KviError::Backend(_))
    ));

    kv.watch_cb_cancel(h);
    kv.watch_with_cb("c", OpFilter::ALL, recording_callback(true), WatchRecord::new())
        .unwrap();
}
