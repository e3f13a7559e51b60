//! The persisted controller state.
//!
//! [`StateRecord`] is the single entity the controller keeps across restarts.
//! It is mutated only by the per-cycle transition and by mode changes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Operating mode of the controller.
///
/// `Auto` is algorithmic; the other two are operator overrides that pin the
/// outlet to a power state regardless of link health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Mode {
    /// Outlet is driven by the WAN health state machine.
    #[default]
    #[serde(rename = "auto")]
    Auto,
    /// Outlet is held on.
    #[serde(rename = "on")]
    ForceOn,
    /// Outlet is held off.
    #[serde(rename = "off")]
    ForceOff,
}

impl Mode {
    /// Every mode, in the order they are presented to operators.
    pub const ALL: [Self; 3] = [Self::Auto, Self::ForceOn, Self::ForceOff];

    /// The wire representation (`auto`, `on`, `off`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::ForceOn => "on",
            Self::ForceOff => "off",
        }
    }

    /// The power state an override pins the outlet to, `None` for `Auto`.
    #[must_use]
    pub const fn forced_power(self) -> Option<bool> {
        match self {
            Self::Auto => None,
            Self::ForceOn => Some(true),
            Self::ForceOff => Some(false),
        }
    }

    /// Returns true for `ForceOn` and `ForceOff`.
    #[must_use]
    pub const fn is_override(self) -> bool {
        !matches!(self, Self::Auto)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| CoreError::InvalidMode(s.to_string()))
    }
}

/// The controller's durable state.
///
/// Missing fields deserialize to their defaults so an older or partially
/// written record still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StateRecord {
    /// Consecutive "down" samples since the last "up" sample.
    pub consecutive_failures: u32,
    /// Whether the controller believes it has commanded the outlet on.
    ///
    /// This is a belief, not the outlet's observed hardware state.
    pub outlet_asserted: bool,
    /// When the link was first seen up again while the outlet was asserted.
    pub recovery_since: Option<DateTime<Utc>>,
    /// Operator override.
    pub mode: Mode,
}

impl StateRecord {
    /// How long the link has been continuously up during the current
    /// recovery countdown, if one is running.
    #[must_use]
    pub fn recovery_elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.recovery_since.map(|since| now - since)
    }

    /// Check the record invariants.
    ///
    /// A recovery timer only exists while the outlet is asserted, and never
    /// alongside a non-zero failure count.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match self.recovery_since {
            Some(_) => self.outlet_asserted && self.consecutive_failures == 0,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_record() {
        let record = StateRecord::default();
        assert_eq!(record.consecutive_failures, 0);
        assert!(!record.outlet_asserted);
        assert!(record.recovery_since.is_none());
        assert_eq!(record.mode, Mode::Auto);
        assert!(record.is_consistent());
    }

    #[test]
    fn mode_wire_values() {
        assert_eq!(serde_json::to_string(&Mode::Auto).unwrap(), "\"auto\"");
        assert_eq!(serde_json::to_string(&Mode::ForceOn).unwrap(), "\"on\"");
        assert_eq!(serde_json::to_string(&Mode::ForceOff).unwrap(), "\"off\"");
        assert_eq!(
            serde_json::from_str::<Mode>("\"off\"").unwrap(),
            Mode::ForceOff
        );
    }

    #[test]
    fn mode_from_str() {
        assert_eq!("auto".parse::<Mode>().unwrap(), Mode::Auto);
        assert_eq!("on".parse::<Mode>().unwrap(), Mode::ForceOn);
        assert_eq!("off".parse::<Mode>().unwrap(), Mode::ForceOff);
        assert!(matches!(
            "ON".parse::<Mode>(),
            Err(CoreError::InvalidMode(s)) if s == "ON"
        ));
        assert!("force_on".parse::<Mode>().is_err());
    }

    #[test]
    fn forced_power() {
        assert_eq!(Mode::Auto.forced_power(), None);
        assert_eq!(Mode::ForceOn.forced_power(), Some(true));
        assert_eq!(Mode::ForceOff.forced_power(), Some(false));
        assert!(!Mode::Auto.is_override());
        assert!(Mode::ForceOff.is_override());
    }

    #[test]
    fn partial_record_fills_defaults() {
        let record: StateRecord =
            serde_json::from_str(r#"{"consecutive_failures": 2}"#).unwrap();
        assert_eq!(record.consecutive_failures, 2);
        assert!(!record.outlet_asserted);
        assert_eq!(record.mode, Mode::Auto);
    }

    #[test]
    fn record_json_shape() {
        let since = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = StateRecord {
            consecutive_failures: 0,
            outlet_asserted: true,
            recovery_since: Some(since),
            mode: Mode::Auto,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["outlet_asserted"], true);
        assert_eq!(value["recovery_since"], "2024-05-01T12:00:00Z");
        assert_eq!(value["mode"], "auto");
    }

    #[test]
    fn recovery_elapsed() {
        let since = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = StateRecord {
            outlet_asserted: true,
            recovery_since: Some(since),
            ..Default::default()
        };
        let now = since + Duration::seconds(90);
        assert_eq!(record.recovery_elapsed(now), Some(Duration::seconds(90)));
        assert_eq!(StateRecord::default().recovery_elapsed(now), None);
    }

    #[test]
    fn inconsistent_records() {
        let now = Utc::now();
        let timer_without_outlet = StateRecord {
            recovery_since: Some(now),
            ..Default::default()
        };
        assert!(!timer_without_outlet.is_consistent());

        let timer_with_failures = StateRecord {
            outlet_asserted: true,
            recovery_since: Some(now),
            consecutive_failures: 1,
            ..Default::default()
        };
        assert!(!timer_with_failures.is_consistent());
    }
}
