//! Serialized access to the state record.
//!
//! [`SharedState`] owns the store and a single async mutex. Every
//! read-modify-write runs through a [`StateGuard`]: the record is loaded when
//! the lock is taken, the caller may await external calls while holding it,
//! and [`StateGuard::commit`] persists the result. Dropping the guard without
//! committing leaves the record untouched.
//!
//! Storage failures never surface from [`SharedState::lock`]. An unreadable
//! record is logged and replaced by the last record this process committed,
//! or the default record if there is none. A record whose write failed is
//! kept in memory and preferred over the stale copy on disk until a later
//! write succeeds.

use tokio::sync::{Mutex, MutexGuard};

use crate::error::Result;
use crate::{StateRecord, StateStore};

#[derive(Debug)]
struct Cached {
    record: StateRecord,
    /// Set when the last write of `record` failed.
    pending: bool,
}

/// Owner of the state store with a single mutual-exclusion point.
#[derive(Debug)]
pub struct SharedState<S: StateStore> {
    store: S,
    cache: Mutex<Option<Cached>>,
}

impl<S: StateStore> SharedState<S> {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: Mutex::new(None),
        }
    }

    /// Get a reference to the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Take the lock and load the current record.
    ///
    /// Waits for any other holder to commit or drop its guard first.
    pub async fn lock(&self) -> StateGuard<'_, S> {
        let mut cache = self.cache.lock().await;

        let pending = cache
            .as_ref()
            .filter(|c| c.pending)
            .map(|c| c.record.clone());
        if let Some(loaded) = pending {
            tracing::debug!("Using in-memory state record pending a successful write");
            return StateGuard {
                store: &self.store,
                cache,
                loaded,
                durable: false,
            };
        }

        let (loaded, durable) = match self.store.read() {
            Ok(Some(record)) => (record, true),
            Ok(None) => {
                tracing::info!("No stored state found, starting from defaults");
                (StateRecord::default(), false)
            }
            Err(e) => {
                let fallback = cache
                    .as_ref()
                    .map(|c| c.record.clone())
                    .unwrap_or_default();
                if e.is_corrupt() {
                    // Stays corrupt until the next commit overwrites it.
                    tracing::warn!(
                        error = %e,
                        using_last_known = cache.is_some(),
                        "Stored state record is corrupt, continuing with fallback"
                    );
                } else {
                    tracing::error!(
                        error = %e,
                        using_last_known = cache.is_some(),
                        "Failed to load state record, continuing with fallback"
                    );
                }
                (fallback, false)
            }
        };

        if durable {
            *cache = Some(Cached {
                record: loaded.clone(),
                pending: false,
            });
        }

        StateGuard {
            store: &self.store,
            cache,
            loaded,
            durable,
        }
    }

    /// Read the current record without modifying it.
    pub async fn snapshot(&self) -> StateRecord {
        self.lock().await.into_record()
    }
}

/// Exclusive access to the record for one read-modify-write.
#[derive(Debug)]
pub struct StateGuard<'a, S: StateStore> {
    store: &'a S,
    cache: MutexGuard<'a, Option<Cached>>,
    loaded: StateRecord,
    /// True when `loaded` came from a successful read of the store.
    durable: bool,
}

impl<S: StateStore> StateGuard<'_, S> {
    /// The record as loaded when the lock was taken.
    #[must_use]
    pub fn record(&self) -> &StateRecord {
        &self.loaded
    }

    /// Release the lock without writing, returning the loaded record.
    #[must_use]
    pub fn into_record(self) -> StateRecord {
        self.loaded
    }

    /// Persist `next` and release the lock.
    ///
    /// A record identical to one just read from the store is not rewritten.
    /// On failure `next` is still kept in memory and will be used by the
    /// next [`SharedState::lock`].
    ///
    /// # Errors
    ///
    /// Returns the store's error if the write fails.
    pub fn commit(mut self, next: StateRecord) -> Result<()> {
        if self.durable && next == self.loaded {
            return Ok(());
        }

        let result = self.store.write(&next);
        *self.cache = Some(Cached {
            record: next,
            pending: result.is_err(),
        });
        result
    }
}
