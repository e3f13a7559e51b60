//! Failover service implementation.
//!
//! This module provides the `FailoverControl` trait and the `FailoverService`
//! implementation that ties the state machine to the probe, the outlet and
//! the persisted record.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use failover_core::{Clock, Mode, StateRecord};
use failover_probe::HealthProbe;
use failover_store::{SharedState, StateGuard, StateStore};

use crate::error::{ControlError, OutletError, Result};
use crate::machine::{self, ModePlan, PowerCommand};
use crate::outlet::OutletClient;
use crate::types::{CycleOutcome, FailoverConfig, ModeChange, OutletSource, StatusReport};

/// Operator-facing control operations.
///
/// Both operations are safe to call while the decision loop runs.
#[async_trait]
pub trait FailoverControl: Send + Sync {
    /// Switch to `mode`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::OutletRejected` if an override was requested and
    /// the outlet did not acknowledge it. The stored record is unchanged.
    async fn apply_mode(&self, mode: Mode) -> Result<ModeChange>;

    /// Report the current mode, outlet state and failover progress.
    async fn status(&self) -> StatusReport;
}

/// The failover controller.
pub struct FailoverService<S: StateStore> {
    state: SharedState<S>,
    probe: Arc<dyn HealthProbe>,
    outlet: Arc<dyn OutletClient>,
    clock: Arc<dyn Clock>,
    config: FailoverConfig,
}

impl<S: StateStore> FailoverService<S> {
    /// Create a new failover service.
    #[must_use]
    pub fn new(
        store: S,
        probe: Arc<dyn HealthProbe>,
        outlet: Arc<dyn OutletClient>,
        clock: Arc<dyn Clock>,
        config: FailoverConfig,
    ) -> Self {
        Self {
            state: SharedState::new(store),
            probe,
            outlet,
            clock,
            config,
        }
    }

    /// Get the shared state.
    #[must_use]
    pub fn state(&self) -> &SharedState<S> {
        &self.state
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &FailoverConfig {
        &self.config
    }

    /// Align the stored outlet belief with the outlet's observed state.
    ///
    /// Run once at startup before the first cycle. If the outlet cannot be
    /// queried the stored belief is kept. Returns the observed state.
    pub async fn reconcile(&self) -> Option<bool> {
        let guard = self.state.lock().await;

        let observed = match self.query_outlet().await {
            Ok(on) => on,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    believed_on = guard.record().outlet_asserted,
                    "Could not query outlet at startup, keeping stored state"
                );
                return None;
            }
        };

        let record = guard.record();
        let next = if observed == record.outlet_asserted {
            record.clone()
        } else {
            tracing::info!(
                believed_on = record.outlet_asserted,
                observed_on = observed,
                "Outlet state drifted while stopped, adopting observed state"
            );
            // A recovery countdown only belongs to an outlet this controller
            // turned on; drift in either direction voids it.
            StateRecord {
                outlet_asserted: observed,
                recovery_since: None,
                ..record.clone()
            }
        };
        Self::commit(guard, next);
        Some(observed)
    }

    /// Run one decision cycle.
    ///
    /// Never fails: probe and outlet errors become "link down" and "retry
    /// next cycle", storage errors are logged.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let guard = self.state.lock().await;
        let record = guard.record().clone();

        if record.mode.is_override() {
            tracing::debug!(mode = %record.mode, "Override active, skipping health check");
            return CycleOutcome::Overridden(record.mode);
        }

        let link_up = self.sample_link().await;
        let step = machine::observe(&record, link_up, self.clock.now(), &self.config.thresholds());

        tracing::debug!(
            link_up,
            consecutive_failures = step.record.consecutive_failures,
            outlet_asserted = step.record.outlet_asserted,
            recovering = step.record.recovery_since.is_some(),
            "Health sample processed"
        );

        let Some(command) = step.command else {
            Self::commit(guard, step.record);
            return CycleOutcome::Observed { link_up };
        };

        let acknowledged = match self.command_outlet(command).await {
            Ok(()) => {
                match command {
                    PowerCommand::PowerOn => tracing::warn!(
                        consecutive_failures = step.record.consecutive_failures,
                        "WAN down past threshold, outlet turned on"
                    ),
                    PowerCommand::PowerOff => tracing::info!(
                        recovery_delay_secs = self.config.recovery_delay.as_secs(),
                        "WAN recovered, outlet turned off"
                    ),
                }
                true
            }
            Err(e) => {
                tracing::error!(error = %e, %command, "Outlet command failed, will retry next cycle");
                false
            }
        };

        Self::commit(guard, step.resolve(acknowledged));
        CycleOutcome::Commanded {
            link_up,
            command,
            acknowledged,
        }
    }

    fn commit(guard: StateGuard<'_, S>, next: StateRecord) {
        if let Err(e) = guard.commit(next) {
            tracing::error!(error = %e, "Failed to persist state record, keeping it in memory");
        }
    }

    async fn sample_link(&self) -> bool {
        let timeout = self.config.call_timeout;
        match tokio::time::timeout(timeout, self.probe.link_up()).await {
            Ok(up) => up,
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs_f64(), "Health probe timed out");
                false
            }
        }
    }

    async fn command_outlet(&self, command: PowerCommand) -> std::result::Result<(), OutletError> {
        self.bounded(self.outlet.set_power(command.target())).await
    }

    async fn query_outlet(&self) -> std::result::Result<bool, OutletError> {
        self.bounded(self.outlet.power_state()).await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = std::result::Result<T, OutletError>>,
    ) -> std::result::Result<T, OutletError> {
        tokio::time::timeout(self.config.call_timeout, call)
            .await
            .unwrap_or(Err(OutletError::Timeout))
    }
}

impl<S: StateStore> std::fmt::Debug for FailoverService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S: StateStore + 'static> FailoverControl for FailoverService<S> {
    async fn apply_mode(&self, mode: Mode) -> Result<ModeChange> {
        let guard = self.state.lock().await;

        match machine::plan_mode_change(guard.record(), mode) {
            ModePlan::Unchanged => {
                tracing::debug!(%mode, "Mode already in force, outlet not re-commanded");
                Ok(ModeChange {
                    mode,
                    outlet_on: guard.record().outlet_asserted,
                    commanded: false,
                })
            }
            ModePlan::Reset(next) => {
                let outlet_on = next.outlet_asserted;
                Self::commit(guard, next);
                tracing::info!(outlet_on, "Automatic mode resumed");
                Ok(ModeChange {
                    mode,
                    outlet_on,
                    commanded: false,
                })
            }
            ModePlan::Command {
                command,
                on_success,
            } => {
                if let Err(source) = self.command_outlet(command).await {
                    tracing::error!(%mode, error = %source, "Mode change rejected by outlet");
                    return Err(ControlError::OutletRejected { mode, source });
                }

                let outlet_on = on_success.outlet_asserted;
                Self::commit(guard, on_success);
                tracing::info!(%mode, outlet_on, "Override mode applied");
                Ok(ModeChange {
                    mode,
                    outlet_on,
                    commanded: true,
                })
            }
        }
    }

    async fn status(&self) -> StatusReport {
        let record = self.state.snapshot().await;

        let (outlet_on, outlet_source) = match self.query_outlet().await {
            Ok(on) => (on, OutletSource::Live),
            Err(e) => {
                tracing::debug!(error = %e, "Live outlet query failed, reporting stored state");
                (record.outlet_asserted, OutletSource::Persisted)
            }
        };

        StatusReport {
            mode: record.mode,
            outlet_on,
            outlet_source,
            consecutive_failures: record.consecutive_failures,
            recovery_since: record.recovery_since,
        }
    }
}
