//! Core types and utilities for the WAN failover controller.
//!
//! This crate provides the foundational types shared by every other crate:
//!
//! - **State record**: the single persisted [`StateRecord`] and its operating [`Mode`]
//! - **Clock**: an injectable time source so recovery timing can be tested
//!   without sleeping
//! - **Error types**: common error definitions shared across crates
//!
//! # Example
//!
//! ```
//! use failover_core::{Mode, StateRecord};
//!
//! let record = StateRecord::default();
//! assert_eq!(record.mode, Mode::Auto);
//! assert_eq!(record.consecutive_failures, 0);
//!
//! let mode: Mode = "on".parse().unwrap();
//! assert_eq!(mode, Mode::ForceOn);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod clock;
pub mod error;
pub mod record;

pub use clock::{Clock, SystemClock};
pub use error::{CoreError, Result};
pub use record::{Mode, StateRecord};

#[cfg(any(test, feature = "test-utils"))]
pub use clock::ManualClock;
