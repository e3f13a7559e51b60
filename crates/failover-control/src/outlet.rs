//! Smart outlet client.
//!
//! The outlet is a Shelly Gen2 plug driven over its JSON-RPC HTTP interface.
//! Only two calls are used: `Switch.Set` and `Switch.GetStatus`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OutletError;

/// Trait for outlet communication.
///
/// This trait abstracts the outlet interface, allowing for mock
/// implementations in tests.
#[async_trait]
pub trait OutletClient: Send + Sync {
    /// Switch the outlet on or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the outlet did not acknowledge the command.
    async fn set_power(&self, on: bool) -> Result<(), OutletError>;

    /// Query the outlet's current power state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is unknown. Callers must not read an
    /// error as "off".
    async fn power_state(&self) -> Result<bool, OutletError>;
}

#[derive(Debug, Serialize)]
struct SetRequest {
    id: u32,
    on: bool,
}

#[derive(Debug, Serialize)]
struct StatusRequest {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct SwitchStatus {
    #[serde(default)]
    output: Option<bool>,
}

/// HTTP client for a Shelly Gen2 outlet.
#[derive(Debug, Clone)]
pub struct ShellyOutletClient {
    client: reqwest::Client,
    base_url: String,
    switch_id: u32,
}

impl ShellyOutletClient {
    /// Create a client for the outlet at `base_url` (e.g., `http://192.168.1.50`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        base_url: impl Into<String>,
        switch_id: u32,
        timeout: Duration,
    ) -> Result<Self, OutletError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OutletError::Client(e.to_string()))?;

        Ok(Self::with_client(client, base_url, switch_id))
    }

    /// Create a client with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, switch_id: u32) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            switch_id,
        }
    }

    fn rpc_url(&self, method: &str) -> String {
        format!("{}/rpc/{method}", self.base_url)
    }

    async fn call<T: Serialize + Sync>(
        &self,
        method: &str,
        body: &T,
    ) -> Result<reqwest::Response, OutletError> {
        let response = self
            .client
            .post(self.rpc_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| OutletError::from_reqwest(&e))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            tracing::warn!(method, status = %status, "Outlet rejected RPC call");
            Err(OutletError::HttpStatus(status.as_u16()))
        }
    }
}

#[async_trait]
impl OutletClient for ShellyOutletClient {
    async fn set_power(&self, on: bool) -> Result<(), OutletError> {
        let request = SetRequest {
            id: self.switch_id,
            on,
        };
        self.call("Switch.Set", &request).await?;

        tracing::debug!(on, switch_id = self.switch_id, "Outlet acknowledged Switch.Set");
        Ok(())
    }

    async fn power_state(&self) -> Result<bool, OutletError> {
        let request = StatusRequest { id: self.switch_id };
        let status: SwitchStatus = self
            .call("Switch.GetStatus", &request)
            .await?
            .json()
            .await
            .map_err(|e| OutletError::from_reqwest(&e))?;

        status.output.ok_or(OutletError::UnknownState)
    }
}

// ============================================================================
// Test double
// ============================================================================

/// An in-memory outlet for tests.
///
/// Records every `set_power` call. Failures and hangs can be injected to
/// exercise the degraded paths.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockOutlet {
    power: parking_lot::Mutex<Option<bool>>,
    commands: parking_lot::Mutex<Vec<bool>>,
    fail_set: std::sync::atomic::AtomicBool,
    fail_query: std::sync::atomic::AtomicBool,
    hang: std::sync::atomic::AtomicBool,
    delay: parking_lot::Mutex<Option<Duration>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockOutlet {
    /// Create an outlet whose power state is `on`.
    #[must_use]
    pub fn new(on: bool) -> Self {
        let outlet = Self::default();
        *outlet.power.lock() = Some(on);
        outlet
    }

    /// Create an outlet whose state cannot be queried.
    #[must_use]
    pub fn unknown() -> Self {
        let outlet = Self::default();
        outlet.set_fail_query(true);
        outlet
    }

    /// Make `set_power` fail.
    pub fn set_fail_set(&self, fail: bool) {
        self.fail_set
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Make `power_state` fail.
    pub fn set_fail_query(&self, fail: bool) {
        self.fail_query
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Make every call block forever.
    pub fn set_hang(&self, hang: bool) {
        self.hang.store(hang, std::sync::atomic::Ordering::SeqCst);
    }

    /// Make `set_power` take `delay` before it takes effect.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Change the physical state behind the controller's back.
    pub fn flip(&self, on: bool) {
        *self.power.lock() = Some(on);
    }

    /// Every `set_power` argument received, including failed ones.
    #[must_use]
    pub fn commands(&self) -> Vec<bool> {
        self.commands.lock().clone()
    }

    /// The physical state, if known.
    #[must_use]
    pub fn power(&self) -> Option<bool> {
        *self.power.lock()
    }

    async fn maybe_hang(&self) {
        if self.hang.load(std::sync::atomic::Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl OutletClient for MockOutlet {
    async fn set_power(&self, on: bool) -> Result<(), OutletError> {
        self.commands.lock().push(on);
        self.maybe_hang().await;
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_set.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(OutletError::HttpStatus(500));
        }
        *self.power.lock() = Some(on);
        Ok(())
    }

    async fn power_state(&self) -> Result<bool, OutletError> {
        self.maybe_hang().await;
        if self.fail_query.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(OutletError::Transport("injected failure".into()));
        }
        self.power().ok_or(OutletError::UnknownState)
    }
}
