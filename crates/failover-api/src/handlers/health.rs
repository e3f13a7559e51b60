//! Liveness endpoint.

use axum::Json;
use serde::Serialize;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `healthy` while the server answers.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Liveness handler.
///
/// Public, token-free and not rate limited so container liveness probes can
/// poll it freely. It does not touch the outlet or the state record.
///
/// ```text
/// GET /health
///
/// Response: 200 OK
/// {
///   "status": "healthy",
///   "service": "wan-failover",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "wan-failover",
        version: env!("CARGO_PKG_VERSION"),
    })
}
