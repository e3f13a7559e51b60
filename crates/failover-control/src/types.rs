//! Configuration and result types for control operations.

use std::time::Duration;

use chrono::{DateTime, Utc};
use failover_core::Mode;
use serde::{Deserialize, Serialize};

use crate::machine::{PowerCommand, Thresholds};

/// Configuration for the failover service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverConfig {
    /// Delay between decision cycles.
    pub poll_interval: Duration,
    /// Consecutive down samples needed before the outlet is turned on.
    pub failure_threshold: u32,
    /// Unbroken uptime needed before the outlet is released.
    pub recovery_delay: Duration,
    /// Upper bound on any single probe or outlet call.
    pub call_timeout: Duration,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Self::default_poll_interval(),
            failure_threshold: Self::default_failure_threshold(),
            recovery_delay: Self::default_recovery_delay(),
            call_timeout: Self::default_call_timeout(),
        }
    }
}

impl FailoverConfig {
    const fn default_poll_interval() -> Duration {
        Duration::from_secs(10)
    }

    const fn default_failure_threshold() -> u32 {
        3
    }

    const fn default_recovery_delay() -> Duration {
        Duration::from_secs(600) // 10 minutes
    }

    const fn default_call_timeout() -> Duration {
        Duration::from_secs(5)
    }

    /// The state machine parameters.
    #[must_use]
    pub const fn thresholds(&self) -> Thresholds {
        Thresholds {
            failure_threshold: self.failure_threshold,
            recovery_delay: self.recovery_delay,
        }
    }
}

/// Result of a successful mode change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeChange {
    /// The mode now in force.
    pub mode: Mode,
    /// Whether the controller believes the outlet is on.
    pub outlet_on: bool,
    /// Whether an outlet command was sent to get here.
    pub commanded: bool,
}

/// Where a reported outlet state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutletSource {
    /// Queried from the outlet just now.
    Live,
    /// The persisted belief; the live query failed.
    Persisted,
}

/// Snapshot of the controller for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Current operating mode.
    pub mode: Mode,
    /// Outlet power state.
    pub outlet_on: bool,
    /// Where `outlet_on` came from.
    pub outlet_source: OutletSource,
    /// Consecutive down samples so far.
    pub consecutive_failures: u32,
    /// Start of the running recovery countdown, if any.
    pub recovery_since: Option<DateTime<Utc>>,
}

/// What one decision cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// An override mode is active; the link was not sampled.
    Overridden(Mode),
    /// The link was sampled and no outlet action was needed.
    Observed {
        /// The health sample.
        link_up: bool,
    },
    /// The link was sampled and an outlet command was attempted.
    Commanded {
        /// The health sample.
        link_up: bool,
        /// The command sent.
        command: PowerCommand,
        /// Whether the outlet acknowledged it.
        acknowledged: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failover_config_defaults() {
        let config = FailoverConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.recovery_delay, Duration::from_secs(600));
        assert_eq!(config.call_timeout, Duration::from_secs(5));
    }

    #[test]
    fn thresholds_follow_config() {
        let config = FailoverConfig {
            failure_threshold: 5,
            recovery_delay: Duration::from_secs(60),
            ..Default::default()
        };
        let th = config.thresholds();
        assert_eq!(th.failure_threshold, 5);
        assert_eq!(th.recovery_delay, Duration::from_secs(60));
    }

    #[test]
    fn status_report_wire_format() {
        let report = StatusReport {
            mode: Mode::ForceOn,
            outlet_on: true,
            outlet_source: OutletSource::Persisted,
            consecutive_failures: 0,
            recovery_since: None,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["mode"], "on");
        assert_eq!(value["outlet_source"], "persisted");
        assert!(value["recovery_since"].is_null());
    }
}
