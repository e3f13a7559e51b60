//! In-memory storage for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::{Result, StoreError};
use crate::{StateRecord, StateStore};

/// A `StateStore` that keeps the record in memory.
///
/// Reads and writes can be made to fail so callers' degraded paths can be
/// exercised.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<StateRecord>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `record`.
    #[must_use]
    pub fn with_record(record: StateRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
            ..Self::default()
        }
    }

    /// Make subsequent reads fail as if the stored bytes were corrupt.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The currently stored record, bypassing failure injection.
    #[must_use]
    pub fn stored(&self) -> Option<StateRecord> {
        self.record.lock().clone()
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl StateStore for MemoryStore {
    fn read(&self) -> Result<Option<StateRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Serialization("injected read failure".into()));
        }
        Ok(self.record.lock().clone())
    }

    fn write(&self, record: &StateRecord) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected("injected write failure".into()));
        }
        *self.record.lock() = Some(record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
