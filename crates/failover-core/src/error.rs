//! Common error types for the failover controller.
//!
//! This module provides shared error types that are used across multiple crates.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout the failover controller.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An operating mode string did not name a known mode.
    #[error("unknown mode: {0:?} (expected one of: auto, on, off)")]
    InvalidMode(String),
}
