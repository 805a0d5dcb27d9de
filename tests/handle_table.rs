//! Handle table semantics: unique ascending handles under contention,
//! idempotent removal, and fatal misses at expect sites.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use ferrogen_runtime::HandleMap;

#[test]
fn concurrent_inserts_assign_unique_handles() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 1250;

    let table = Arc::new(HandleMap::new("stress"));
    let mut workers = Vec::new();
    for worker in 0..THREADS {
        let table = Arc::clone(&table);
        workers.push(thread::spawn(move || {
            let mut handles = Vec::with_capacity(PER_THREAD);
            for i in 0..PER_THREAD {
                handles.push(table.insert(worker * PER_THREAD + i));
            }
            handles
        }));
    }

    let mut seen = HashSet::new();
    for worker in workers {
        for handle in worker.join().expect("insert worker panicked") {
            assert!(seen.insert(handle), "handle {handle} assigned twice");
        }
    }
    assert_eq!(seen.len(), THREADS * PER_THREAD);
    assert_eq!(table.len(), THREADS * PER_THREAD);
}

#[test]
fn equal_values_still_get_distinct_handles() {
    let table = HandleMap::new("dedup-free");
    let first = table.insert("same");
    let second = table.insert("same");
    assert_ne!(first, second);
    assert_eq!(table.len(), 2);
}

#[test]
fn handles_are_never_reused_after_removal() {
    let table = HandleMap::new("no-reuse");
    let first = table.insert(1);
    assert_eq!(table.remove(first), Some(1));
    let second = table.insert(2);
    assert_ne!(first, second);
}

#[test]
fn remove_is_idempotent() {
    let table = HandleMap::new("idempotent");
    let handle = table.insert("value");
    assert_eq!(table.remove(handle), Some("value"));
    assert_eq!(table.remove(handle), None);
    assert!(table.is_empty());
}

#[test]
fn get_after_remove_misses() {
    let table = HandleMap::new("miss");
    let handle = table.insert(7_u64);
    table.remove(handle);
    assert_eq!(table.get(handle), None);
}

#[test]
#[should_panic(expected = "no entry for handle 42 in fatal-miss table")]
fn expect_on_missing_handle_is_fatal() {
    let table: HandleMap<u64> = HandleMap::new("fatal-miss");
    let _ = table.expect(42);
}
