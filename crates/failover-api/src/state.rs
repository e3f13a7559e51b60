//! Application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use failover_control::FailoverControl;

use crate::config::ServerConfig;

/// Shared application state for the control surface.
///
/// This struct holds references to all services needed by the HTTP handlers.
pub struct AppState<C>
where
    C: FailoverControl,
{
    /// The failover controller.
    pub control: Arc<C>,
    /// Server configuration.
    pub config: ServerConfig,
}

impl<C> AppState<C>
where
    C: FailoverControl,
{
    /// Create a new application state.
    #[must_use]
    pub fn new(control: Arc<C>, config: ServerConfig) -> Self {
        Self { control, config }
    }
}

impl<C> Clone for AppState<C>
where
    C: FailoverControl,
{
    fn clone(&self) -> Self {
        Self {
            control: Arc::clone(&self.control),
            config: self.config.clone(),
        }
    }
}
