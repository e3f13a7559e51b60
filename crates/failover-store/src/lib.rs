//! Durable state storage for the WAN failover controller.
//!
//! The controller keeps exactly one [`StateRecord`]. This crate persists it and
//! serializes every read-modify-write against it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐
//! │  decision cycle  │   │  mode change     │
//! └────────┬─────────┘   └────────┬─────────┘
//!          └──────────┬───────────┘
//!                     ▼
//!          ┌──────────────────────┐
//!          │     SharedState      │  one async mutex:
//!          │  lock() -> StateGuard│  load, transform, commit
//!          └──────────┬───────────┘
//!                     ▼
//!          ┌──────────────────────┐
//!          │  StateStore (trait)  │
//!          │  JsonFileStore       │  temp file + rename
//!          └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use failover_store::{JsonFileStore, SharedState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = SharedState::new(JsonFileStore::new("/app/state.json"));
//!
//! let guard = state.lock().await;
//! let mut next = guard.record().clone();
//! next.consecutive_failures += 1;
//! guard.commit(next)?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod file;
pub mod shared;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use error::{Result, StoreError};
pub use file::JsonFileStore;
pub use shared::{SharedState, StateGuard};

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryStore;

pub use failover_core::StateRecord;

/// The storage trait for the controller's state record.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., a JSON file, in-memory for testing). Implementations do no locking of
/// their own; [`SharedState`] serializes access.
pub trait StateStore: Send + Sync {
    /// Read the stored record.
    ///
    /// Returns `Ok(None)` when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read or decoded.
    fn read(&self) -> Result<Option<StateRecord>>;

    /// Replace the stored record as a whole.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn write(&self, record: &StateRecord) -> Result<()>;
}
