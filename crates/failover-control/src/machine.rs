//! Failover state machine.
//!
//! Pure transition functions over [`StateRecord`]. Nothing here performs I/O
//! or reads the clock; the service feeds in samples and timestamps and
//! carries out any [`PowerCommand`] a transition asks for.
//!
//! # Automatic mode
//!
//! ```text
//!            link down (count < threshold)
//!               ┌──────┐
//!               ▼      │
//!        ┌──────────────┴─┐  count reaches threshold  ┌────────────────┐
//!        │  outlet off    │ ─────── PowerOn ────────▶ │  outlet on     │
//!        │  (monitoring)  │                           │  (waiting)     │
//!        └────────────────┘                           └───────┬────────┘
//!                ▲                                       link up│  ▲ link down
//!                │                                              ▼  │ (timer cleared)
//!                │            uptime ≥ recovery delay   ┌──────────┴─────┐
//!                └──────────────── PowerOff ─────────── │  recovering    │
//!                                                       │ (timer running)│
//!                                                       └────────────────┘
//! ```
//!
//! A command only changes the outlet fields once the outlet has acknowledged
//! it (see [`PowerCommand::settle`]). Until then the record keeps its sample
//! bookkeeping and the same command is asked for again on the next
//! qualifying sample.

use std::time::Duration;

use chrono::{DateTime, Utc};
use failover_core::{Mode, StateRecord};

/// Debounce and hysteresis parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Consecutive down samples needed before the outlet is turned on.
    pub failure_threshold: u32,
    /// Unbroken uptime needed before the outlet is released.
    pub recovery_delay: Duration,
}

/// An outlet command requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCommand {
    /// Turn the outlet on.
    PowerOn,
    /// Turn the outlet off.
    PowerOff,
}

impl PowerCommand {
    /// The command that drives the outlet to `on`.
    #[must_use]
    pub const fn to(on: bool) -> Self {
        if on {
            Self::PowerOn
        } else {
            Self::PowerOff
        }
    }

    /// The power state this command asks for.
    #[must_use]
    pub const fn target(self) -> bool {
        matches!(self, Self::PowerOn)
    }

    /// Record that the outlet acknowledged this command.
    ///
    /// Both directions clear the recovery timer: it only starts once the link
    /// is seen up after the outlet was turned on.
    pub fn settle(self, record: &mut StateRecord) {
        record.outlet_asserted = self.target();
        record.recovery_since = None;
    }
}

impl std::fmt::Display for PowerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::PowerOn => "power-on",
            Self::PowerOff => "power-off",
        })
    }
}

/// Result of feeding one health sample to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// The record after sample bookkeeping, before any command is applied.
    pub record: StateRecord,
    /// Outlet command to attempt, if any.
    pub command: Option<PowerCommand>,
}

impl Step {
    /// The record to persist once the command has been attempted.
    #[must_use]
    pub fn resolve(mut self, acknowledged: bool) -> StateRecord {
        if let (Some(command), true) = (self.command, acknowledged) {
            command.settle(&mut self.record);
        }
        self.record
    }
}

/// Feed one health sample to the automatic-mode machine.
///
/// Records in an override mode are returned unchanged with no command.
#[must_use]
pub fn observe(
    record: &StateRecord,
    link_up: bool,
    now: DateTime<Utc>,
    thresholds: &Thresholds,
) -> Step {
    let mut next = record.clone();

    if record.mode.is_override() {
        return Step {
            record: next,
            command: None,
        };
    }

    let command = if link_up {
        next.consecutive_failures = 0;

        if !next.outlet_asserted {
            None
        } else if let Some(elapsed) = next.recovery_elapsed(now) {
            // A clock that stepped backwards counts as no uptime yet.
            let elapsed = elapsed.to_std().unwrap_or(Duration::ZERO);
            (elapsed >= thresholds.recovery_delay).then_some(PowerCommand::PowerOff)
        } else {
            next.recovery_since = Some(now);
            None
        }
    } else {
        next.consecutive_failures = next.consecutive_failures.saturating_add(1);
        next.recovery_since = None;

        (!next.outlet_asserted && next.consecutive_failures >= thresholds.failure_threshold)
            .then_some(PowerCommand::PowerOn)
    };

    Step {
        record: next,
        command,
    }
}

/// How to carry out an operator mode change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModePlan {
    /// Already in the requested override with the outlet in place.
    Unchanged,
    /// Switch to automatic mode; persist the record as is.
    Reset(StateRecord),
    /// Command the outlet, and persist `on_success` only if it acknowledges.
    Command {
        /// Command to send.
        command: PowerCommand,
        /// The record once the override is in force.
        on_success: StateRecord,
    },
}

/// Plan a change to `target` mode.
///
/// Returning to automatic mode clears the failure count and recovery timer
/// but leaves the outlet belief alone, so automatic control resumes from the
/// current physical state.
#[must_use]
pub fn plan_mode_change(record: &StateRecord, target: Mode) -> ModePlan {
    let Some(power) = target.forced_power() else {
        return ModePlan::Reset(StateRecord {
            consecutive_failures: 0,
            recovery_since: None,
            mode: Mode::Auto,
            ..record.clone()
        });
    };

    if record.mode == target && record.outlet_asserted == power {
        return ModePlan::Unchanged;
    }

    let command = PowerCommand::to(power);
    let mut on_success = StateRecord {
        consecutive_failures: 0,
        mode: target,
        ..record.clone()
    };
    command.settle(&mut on_success);

    ModePlan::Command {
        command,
        on_success,
    }
}
