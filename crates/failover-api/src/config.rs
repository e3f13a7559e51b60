//! Process configuration.
//!
//! Everything is read from environment variables. Required settings that are
//! missing or empty are reported together so a misconfigured deployment can
//! be fixed in one pass; a present but malformed value is reported by name.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use failover_control::FailoverConfig;
use failover_probe::ProbeConfig;
use thiserror::Error;

/// Errors loading configuration. All of them are fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Required variables were not set.
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    /// A variable was set to a value that could not be used.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        /// The variable name.
        key: &'static str,
        /// The raw value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Configuration for the HTTP control surface.
#[derive(Clone)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:3051").
    pub listen_addr: String,

    /// Shared secret required by the mode-change endpoint.
    pub api_token: String,

    /// Mode changes allowed per client per hour.
    pub control_rate_limit_per_hour: u32,

    /// Read requests allowed per client per hour, per endpoint.
    pub status_rate_limit_per_hour: u32,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServerConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:3051".to_string()
    }

    const fn default_control_rate_limit() -> u32 {
        10
    }

    const fn default_status_rate_limit() -> u32 {
        30
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            api_token: String::new(),
            control_rate_limit_per_hour: Self::default_control_rate_limit(),
            status_rate_limit_per_hour: Self::default_status_rate_limit(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen_addr", &self.listen_addr)
            .field("api_token", &"<redacted>")
            .field("control_rate_limit_per_hour", &self.control_rate_limit_per_hour)
            .field("status_rate_limit_per_hour", &self.status_rate_limit_per_hour)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

/// Where the smart outlet lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutletConfig {
    /// Base URL of the outlet's RPC interface.
    pub base_url: String,
    /// Switch channel on the outlet.
    pub switch_id: u32,
}

/// Complete process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gateway controller coordinates and credentials.
    pub probe: ProbeConfig,
    /// Smart outlet coordinates.
    pub outlet: OutletConfig,
    /// State machine timing.
    pub failover: FailoverConfig,
    /// HTTP surface settings.
    pub server: ServerConfig,
    /// Path of the persisted state record.
    pub state_file: PathBuf,
}

const REQUIRED: [&str; 7] = [
    "OMADA_URL",
    "OMADA_USERNAME",
    "OMADA_PASSWORD",
    "OMADA_SITE_ID",
    "OMADA_GATEWAY_MAC",
    "SHELLY_BASE_URL",
    "API_TOKEN",
];

const DEFAULT_STATE_FILE: &str = "/app/state.json";

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let missing: Vec<_> = REQUIRED
            .into_iter()
            .filter(|key| env.get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }
        let required = |key: &'static str| env.get(key).unwrap_or_default();

        let call_timeout = Duration::from_secs(env.parse_min("CALL_TIMEOUT", 5, 1)?);

        let failover = FailoverConfig {
            poll_interval: Duration::from_secs(env.parse_min("CHECK_INTERVAL", 10, 1)?),
            failure_threshold: env.parse_min("FAILURE_THRESHOLD", 3, 1)?,
            recovery_delay: Duration::from_secs(env.parse_min("RECOVERY_DELAY", 600, 0)?),
            call_timeout,
        };

        let mut probe = ProbeConfig::new(
            required("OMADA_URL"),
            required("OMADA_USERNAME"),
            required("OMADA_PASSWORD"),
            required("OMADA_SITE_ID"),
            required("OMADA_GATEWAY_MAC"),
        );
        probe.wan_port = env.parse_min("OMADA_WAN_PORT", 1, 0)?;
        probe.verify_tls = env.parse_flag("OMADA_VERIFY_TLS", false)?;
        probe.timeout = call_timeout;

        let outlet = OutletConfig {
            base_url: required("SHELLY_BASE_URL"),
            switch_id: env.parse_min("SHELLY_SWITCH_ID", 0, 0)?,
        };

        let server = ServerConfig {
            listen_addr: env
                .get("LISTEN_ADDR")
                .unwrap_or_else(ServerConfig::default_listen_addr),
            api_token: required("API_TOKEN"),
            control_rate_limit_per_hour: env.parse_min(
                "CONTROL_RATE_LIMIT_PER_HOUR",
                ServerConfig::default_control_rate_limit(),
                1,
            )?,
            status_rate_limit_per_hour: env.parse_min(
                "STATUS_RATE_LIMIT_PER_HOUR",
                ServerConfig::default_status_rate_limit(),
                1,
            )?,
            ..ServerConfig::default()
        };

        let state_file = env
            .get("STATE_FILE")
            .map_or_else(|| PathBuf::from(DEFAULT_STATE_FILE), PathBuf::from);

        Ok(Self {
            probe,
            outlet,
            failover,
            server,
            state_file,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// The trimmed value, treating empty as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_min<T>(&self, key: &'static str, default: T, min: T) -> Result<T, ConfigError>
    where
        T: FromStr + PartialOrd + fmt::Display,
        T::Err: fmt::Display,
    {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        let value = raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        })?;
        if value < min {
            return Err(ConfigError::Invalid {
                key,
                value: raw,
                reason: format!("must be at least {min}"),
            });
        }
        Ok(value)
    }

    fn parse_flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value: raw,
                reason: "expected true or false".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("OMADA_URL", "https://omada.lan:8043"),
            ("OMADA_USERNAME", "monitor"),
            ("OMADA_PASSWORD", "secret"),
            ("OMADA_SITE_ID", "site-1"),
            ("OMADA_GATEWAY_MAC", "AA-BB-CC-DD-EE-FF"),
            ("SHELLY_BASE_URL", "http://192.168.1.50"),
            ("API_TOKEN", "letmein"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| env.get(key).map(ToString::to_string))
    }

    #[test]
    fn defaults() {
        let config = load(&base_env()).unwrap();

        assert_eq!(config.failover, FailoverConfig::default());
        assert_eq!(config.probe.wan_port, 1);
        assert!(!config.probe.verify_tls);
        assert_eq!(config.probe.timeout, Duration::from_secs(5));
        assert_eq!(config.outlet.switch_id, 0);
        assert_eq!(config.state_file, PathBuf::from("/app/state.json"));
        assert_eq!(config.server.listen_addr, "0.0.0.0:3051");
        assert_eq!(config.server.control_rate_limit_per_hour, 10);
        assert_eq!(config.server.status_rate_limit_per_hour, 30);
        assert_eq!(config.server.api_token, "letmein");
    }

    #[test]
    fn overrides() {
        let mut env = base_env();
        env.extend([
            ("CHECK_INTERVAL", "30"),
            ("FAILURE_THRESHOLD", "5"),
            ("RECOVERY_DELAY", "60"),
            ("CALL_TIMEOUT", "2"),
            ("OMADA_WAN_PORT", "2"),
            ("OMADA_VERIFY_TLS", "true"),
            ("SHELLY_SWITCH_ID", "1"),
            ("STATE_FILE", "/tmp/state.json"),
            ("LISTEN_ADDR", "127.0.0.1:9000"),
        ]);

        let config = load(&env).unwrap();
        assert_eq!(config.failover.poll_interval, Duration::from_secs(30));
        assert_eq!(config.failover.failure_threshold, 5);
        assert_eq!(config.failover.recovery_delay, Duration::from_secs(60));
        assert_eq!(config.failover.call_timeout, Duration::from_secs(2));
        assert_eq!(config.probe.timeout, Duration::from_secs(2));
        assert_eq!(config.probe.wan_port, 2);
        assert!(config.probe.verify_tls);
        assert_eq!(config.outlet.switch_id, 1);
        assert_eq!(config.state_file, PathBuf::from("/tmp/state.json"));
        assert_eq!(config.server.listen_addr, "127.0.0.1:9000");
    }

    #[test]
    fn lists_every_missing_variable() {
        let mut env = base_env();
        env.remove("OMADA_PASSWORD");
        env.insert("API_TOKEN", "   ");

        assert_eq!(
            load(&env).unwrap_err(),
            ConfigError::Missing(vec!["OMADA_PASSWORD", "API_TOKEN"])
        );
    }

    #[test]
    fn unparsable_number_is_fatal() {
        let mut env = base_env();
        env.insert("CHECK_INTERVAL", "ten");

        let err = load(&env).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "CHECK_INTERVAL",
                ..
            }
        ));
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let mut env = base_env();
        env.insert("FAILURE_THRESHOLD", "0");

        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("must be at least 1"));
    }

    #[test]
    fn bad_flag_is_rejected() {
        let mut env = base_env();
        env.insert("OMADA_VERIFY_TLS", "maybe");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid {
                key: "OMADA_VERIFY_TLS",
                ..
            })
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let config = load(&base_env()).unwrap();
        let rendered = format!("{:?}", config.server);
        assert!(!rendered.contains("letmein"));
    }
}
