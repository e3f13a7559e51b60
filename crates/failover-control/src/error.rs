//! Error types for the failover control layer.
//!
//! Outlet failures are transient and only surface to callers that asked for a
//! specific outcome (an operator mode change). The decision loop collapses
//! them into "retry next cycle".

use failover_core::Mode;
use thiserror::Error;

/// A result type using `ControlError`.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors returned by control operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The outlet did not acknowledge the command a mode change needs.
    #[error("outlet did not accept mode {mode}: {source}")]
    OutletRejected {
        /// The mode that was requested.
        mode: Mode,
        /// Why the outlet command failed.
        #[source]
        source: OutletError,
    },

    /// The requested mode string was not recognised.
    #[error(transparent)]
    InvalidMode(#[from] failover_core::CoreError),
}

/// Errors talking to the outlet.
#[derive(Debug, Error)]
pub enum OutletError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The outlet did not answer in time.
    #[error("outlet request timed out")]
    Timeout,

    /// The request failed before a response was received.
    #[error("outlet request failed: {0}")]
    Transport(String),

    /// The outlet answered with a non-success status.
    #[error("outlet returned HTTP {0}")]
    HttpStatus(u16),

    /// The outlet's answer could not be decoded.
    #[error("invalid outlet response: {0}")]
    Decode(String),

    /// The status response carried no power state.
    #[error("outlet did not report its power state")]
    UnknownState,
}

impl OutletError {
    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
