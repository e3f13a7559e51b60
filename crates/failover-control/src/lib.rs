//! Failover control for the WAN failover controller.
//!
//! This crate holds the decision logic and the plumbing it drives: the pure
//! state machine, the smart outlet client, the service that runs one decision
//! cycle or one operator mode change at a time, and the loop that runs cycles
//! on a fixed cadence.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Control surface (HTTP)    Monitor loop          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      FailoverService                         │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │  Decision   │ │  Mode       │ │    State machine    │    │
//! │  │  cycle      │ │  changes    │ │    (pure)           │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼              ▼              ▼
//!        ┌──────────┐   ┌──────────┐   ┌──────────┐
//!        │  Store   │   │  Probe   │   │  Outlet  │
//!        │  (JSON)  │   │ (Omada)  │   │ (Shelly) │
//!        └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use failover_control::{FailoverConfig, FailoverControl, FailoverService, Mode, ShellyOutletClient};
//! use failover_core::SystemClock;
//! use failover_probe::{OmadaProbe, ProbeConfig};
//! use failover_store::JsonFileStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FailoverConfig::default();
//! let probe = OmadaProbe::new(ProbeConfig::new(
//!     "https://omada.lan:8043", "monitor", "secret", "site", "AA-BB-CC-DD-EE-FF",
//! ));
//! let outlet = ShellyOutletClient::new("http://192.168.1.50", 0, config.call_timeout)?;
//!
//! let service = FailoverService::new(
//!     JsonFileStore::new("/app/state.json"),
//!     Arc::new(probe),
//!     Arc::new(outlet),
//!     Arc::new(SystemClock),
//!     config,
//! );
//!
//! service.reconcile().await;
//! service.run_cycle().await;
//! service.apply_mode(Mode::ForceOn).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # State Machine
//!
//! In automatic mode:
//!
//! - A down sample increments the failure count and clears any recovery timer
//! - Reaching the failure threshold with the outlet off turns it on, once
//! - An up sample resets the count; with the outlet on it starts the recovery
//!   timer, or releases the outlet once the timer has run for the recovery delay
//!
//! Override modes pin the outlet and suspend sampling. See the [`machine`]
//! module for the transition functions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod machine;
pub mod monitor;
pub mod outlet;
pub mod service;
pub mod types;

pub use error::{ControlError, OutletError, Result};
pub use machine::{PowerCommand, Thresholds};
pub use monitor::run_monitor;
pub use outlet::{OutletClient, ShellyOutletClient};
pub use service::{FailoverControl, FailoverService};
pub use types::{CycleOutcome, FailoverConfig, ModeChange, OutletSource, StatusReport};

#[cfg(any(test, feature = "test-utils"))]
pub use outlet::MockOutlet;

// Re-export commonly used types from dependencies for convenience
pub use failover_core::{Mode, StateRecord};
