//! Per-handle serialization
//!
//! The key store makes each operation atomic, but says nothing about a
//! rotation racing a sign on the same storage name. Every enroll and sign
//! runs inside [`HandleGate::run`], which holds a mutex scoped to the storage
//! name for the whole resolve-canonicalize-sign (or delete-generate) sequence.
//!
//! Distinct storage names get distinct mutexes and never wait on each other.
//! Lock entries are created on first use and dropped once no caller holds or
//! waits on them, so the registry only holds names with work in flight.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

/// Registry of storage-name-scoped locks
#[derive(Debug, Default)]
pub struct HandleGate {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl HandleGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `storage_name`
    pub fn run<T>(&self, storage_name: &str, f: impl FnOnce() -> T) -> T {
        // Clone the Arc out so the shard lock is released before we block
        let entry = Entry {
            locks: &self.locks,
            storage_name,
            lock: self
                .locks
                .entry(storage_name.to_owned())
                .or_default()
                .clone(),
        };

        // The mutex guards no data, so a panic in another holder leaves
        // nothing inconsistent behind
        let _guard = entry.lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of storage names with work in flight
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

/// Claim on one registry entry; prunes the entry on drop, unwinding included
struct Entry<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    storage_name: &'a str,
    lock: Arc<Mutex<()>>,
}

impl Drop for Entry<'_> {
    fn drop(&mut self) {
        // Clones are only taken under the shard lock, so a count of two (the
        // map's and ours) means nobody else holds or is about to wait on it
        self.locks
            .remove_if(self.storage_name, |_, lock| Arc::strong_count(lock) == 2);
    }
}
