//! WAN link health probe for the failover controller.
//!
//! This crate answers one question per decision cycle: is the monitored WAN
//! link up? It talks to the gateway's management controller (Omada):
//!
//! - Log in and obtain the controller id and CSRF token
//! - Fetch the gateway's port statistics
//! - Read the internet-reachability flag of the configured WAN port
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │  Decision loop   │────▶│   HealthProbe    │
//! │                  │     │   (trait)        │
//! └──────────────────┘     └────────┬─────────┘
//!                                   │
//!                          ┌────────▼─────────┐
//!                          │   OmadaProbe     │
//!                          │   (impl)         │
//!                          └────────┬─────────┘
//!                                   │ HTTPS
//!                          ┌────────▼─────────┐
//!                          │ Omada controller │
//!                          │ login + gateway  │
//!                          └──────────────────┘
//! ```
//!
//! The probe fails closed: any error is logged and reported as "link down".
//! It never retries; the next decision cycle is the retry.
//!
//! # Example
//!
//! ```no_run
//! use failover_probe::{HealthProbe, OmadaProbe, ProbeConfig};
//!
//! # async fn example() {
//! let config = ProbeConfig::new(
//!     "https://omada.lan:8043",
//!     "monitor",
//!     "secret",
//!     "site-id",
//!     "AA-BB-CC-DD-EE-FF",
//! );
//! let probe = OmadaProbe::new(config);
//!
//! if probe.link_up().await {
//!     println!("WAN is up");
//! }
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod omada;
pub mod probe;

use std::fmt;
use std::time::Duration;

pub use error::{ProbeError, Result};
pub use omada::OmadaProbe;
pub use probe::HealthProbe;

#[cfg(any(test, feature = "test-utils"))]
pub use probe::ScriptedProbe;

/// Configuration for probing the gateway management controller.
#[derive(Clone)]
pub struct ProbeConfig {
    /// Base URL of the controller (e.g., `https://omada.lan:8043`).
    pub base_url: String,
    /// Controller account name.
    pub username: String,
    /// Controller account password.
    pub password: String,
    /// Site identifier the gateway belongs to.
    pub site_id: String,
    /// Gateway identifier (its MAC address).
    pub gateway_mac: String,
    /// Physical WAN port number whose state is reported.
    pub wan_port: u32,
    /// Whether to verify the controller's TLS certificate.
    pub verify_tls: bool,
    /// Timeout for each HTTP request.
    pub timeout: Duration,
}

impl ProbeConfig {
    /// Create a configuration with the default WAN port (1), no TLS
    /// verification and a five second timeout.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        site_id: impl Into<String>,
        gateway_mac: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            site_id: site_id.into(),
            gateway_mac: gateway_mac.into(),
            wan_port: 1,
            verify_tls: false,
            timeout: Duration::from_secs(5),
        }
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Get the login endpoint URL.
    #[must_use]
    pub fn login_url(&self) -> String {
        format!("{}/api/v2/login", self.base())
    }

    /// Get the gateway details endpoint URL for a controller instance.
    #[must_use]
    pub fn gateway_url(&self, controller_id: &str) -> String {
        format!(
            "{}/{}/api/v2/sites/{}/gateways/{}",
            self.base(),
            controller_id,
            self.site_id,
            self.gateway_mac
        )
    }
}

impl fmt::Debug for ProbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("site_id", &self.site_id)
            .field("gateway_mac", &self.gateway_mac)
            .field("wan_port", &self.wan_port)
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}
