//! Health probe error types.
//!
//! Every variant means the same thing to the controller (the link counts as
//! down); the distinction only matters for logs.

use thiserror::Error;

/// A result type using `ProbeError`.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Errors that can occur while probing WAN health.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The request did not complete within the configured timeout.
    #[error("{stage} request timed out")]
    Timeout {
        /// Which request timed out (`login` or `gateway`).
        stage: &'static str,
    },

    /// The request failed before a response was received.
    #[error("{stage} request failed: {message}")]
    Transport {
        /// Which request failed.
        stage: &'static str,
        /// The underlying error.
        message: String,
    },

    /// The controller answered with a non-success HTTP status.
    #[error("{stage} returned HTTP {status}")]
    HttpStatus {
        /// Which request failed.
        stage: &'static str,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body could not be decoded.
    #[error("invalid {stage} response: {message}")]
    Decode {
        /// Which response was malformed.
        stage: &'static str,
        /// The decoder's message.
        message: String,
    },

    /// The controller answered with a non-zero `errorCode`.
    #[error("{stage} rejected with errorCode {code}: {message}")]
    Rejected {
        /// Which request was rejected.
        stage: &'static str,
        /// The controller's error code.
        code: i64,
        /// The controller's message, if any.
        message: String,
    },

    /// A field the probe depends on was absent.
    #[error("missing field in response: {0}")]
    MissingField(&'static str),

    /// The gateway reported no WAN entry for the configured port.
    #[error("no WAN port {0} in gateway port stats")]
    PortNotFound(u32),
}

impl ProbeError {
    /// Returns true if the controller was reached and answered.
    ///
    /// Useful to tell "management plane unreachable" from "gateway says down".
    #[must_use]
    pub const fn controller_reachable(&self) -> bool {
        !matches!(
            self,
            Self::Client(_) | Self::Timeout { .. } | Self::Transport { .. }
        )
    }
}
