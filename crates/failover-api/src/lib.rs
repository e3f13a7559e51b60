//! HTTP control surface and process supervision for the WAN failover controller.
//!
//! This crate exposes the controller to operators and runs it as a service.
//! It handles:
//!
//! - Environment configuration with fail-fast validation
//! - REST endpoints for mode changes and status
//! - Shared-token authorization for mode changes
//! - Per-client sliding-window rate limiting
//! - Supervision of the monitor loop and the HTTP server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Operators / dashboards                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        failover-api                          │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │  Token +    │ │   Router    │ │    Supervisor       │    │
//! │  │  Rate limit │ │  + Handlers │ │  (signals, tasks)   │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                    ┌───────────────────┐
//!                    │  FailoverService  │◄──── monitor loop
//!                    └───────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use failover_api::{create_router, serve, shutdown_signal, AppConfig, AppState, Supervisor};
//! use failover_control::{run_monitor, FailoverService, ShellyOutletClient};
//! use failover_core::SystemClock;
//! use failover_probe::OmadaProbe;
//! use failover_store::JsonFileStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env()?;
//! let outlet = ShellyOutletClient::new(
//!     config.outlet.base_url.clone(),
//!     config.outlet.switch_id,
//!     config.failover.call_timeout,
//! )?;
//! let service = Arc::new(FailoverService::new(
//!     JsonFileStore::new(config.state_file.clone()),
//!     Arc::new(OmadaProbe::new(config.probe.clone())),
//!     Arc::new(outlet),
//!     Arc::new(SystemClock),
//!     config.failover.clone(),
//! ));
//!
//! let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;
//! let app = create_router(AppState::new(Arc::clone(&service), config.server));
//!
//! let supervisor = Supervisor::default();
//! let monitor = run_monitor(service, supervisor.subscribe());
//! let server = serve(listener, app, supervisor.subscribe());
//! let outcome = supervisor.run(monitor, server, shutdown_signal()).await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod supervisor;

pub use config::{AppConfig, ConfigError, OutletConfig, ServerConfig};
pub use error::ApiError;
pub use rate_limit::RateLimiter;
pub use routes::create_router;
pub use state::AppState;
pub use supervisor::{serve, shutdown_signal, Component, Outcome, Supervisor};

// Re-export key types for convenience
pub use auth::ControlToken;
