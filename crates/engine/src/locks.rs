//! Per-document write serialization
//!
//! Submitting a document reads the last changeset order and writes the next
//! one. Two writers for the same id in one process must not interleave
//! there, so each id gets its own mutex for the whole read-diff-persist
//! sequence. Writers for different ids never contend. Entries are created
//! on demand and dropped again by [`WriteLocks::forget`] once no caller
//! holds them, so the table only grows with concurrently written ids.
//!
//! Writers in other processes are not serialized by this.
//!
//! # Usage
//!
//! ```
//! use catalog_engine::WriteLocks;
//!
//! let locks = WriteLocks::new();
//! let mutex = locks.mutex_for("a");
//! let _held = mutex.lock();
//! ```

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Lazily created mutex per document id
#[derive(Default)]
pub struct WriteLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl WriteLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex serializing writes to `id`
    pub fn mutex_for(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the entry for `id` if no caller still holds its mutex
    pub fn forget(&self, id: &str) {
        self.locks
            .remove_if(id, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    /// Number of ids with a lock entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Check if no lock entries exist
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
