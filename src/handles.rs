//! Concurrent registry assigning unique ascending integer handles.
//!
//! Handles carry no type information on the wire; each one denotes
//! membership in exactly one table, and the native side is trusted to
//! present it only to the matching dispatch surface. Counters are never
//! reused within a table, so a stale handle can only miss, not alias.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::trace;

#[derive(Debug)]
struct Slots<T> {
    entries: HashMap<u64, T>,
    last_handle: u64,
}

#[derive(Debug)]
pub struct HandleMap<T> {
    label: &'static str,
    slots: RwLock<Slots<T>>,
}

impl<T> HandleMap<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            slots: RwLock::new(Slots {
                entries: HashMap::new(),
                last_handle: 0,
            }),
        }
    }

    /// Always assigns a fresh handle; two inserts of equal values get
    /// distinct handles (reference semantics, no deduplication).
    pub fn insert(&self, value: T) -> u64 {
        let mut slots = self.slots.write();
        slots.last_handle += 1;
        let handle = slots.last_handle;
        slots.entries.insert(handle, value);
        trace!(table = self.label, handle, "handle inserted");
        handle
    }

    /// Idempotent: removing a handle that is absent is a no-op.
    pub fn remove(&self, handle: u64) -> Option<T> {
        let removed = self.slots.write().entries.remove(&handle);
        if removed.is_some() {
            trace!(table = self.label, handle, "handle removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.slots.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> HandleMap<T> {
    pub fn get(&self, handle: u64) -> Option<T> {
        self.slots.read().entries.get(&handle).cloned()
    }

    /// Lookup at a site that assumes presence. A miss here means the table
    /// was corrupted or the bindings and the native library are from
    /// mismatched builds, so it is fatal rather than recoverable.
    pub fn expect(&self, handle: u64) -> T {
        self.get(handle).unwrap_or_else(|| {
            panic!("no entry for handle {handle} in {} table", self.label)
        })
    }
}
