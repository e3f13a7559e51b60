//! Mode change endpoint.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use failover_control::{FailoverControl, Mode};

use crate::auth::ControlToken;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for a mode change. The token is read by [`ControlToken`].
#[derive(Debug, Deserialize)]
pub struct ControlParams {
    /// Requested mode: `auto`, `on` or `off`.
    pub mode: Option<String>,
}

/// Response for a successful mode change.
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    /// Always true; failures use the error envelope.
    pub success: bool,
    /// The mode now in force.
    pub mode: Mode,
    /// Whether the controller believes the outlet is on.
    pub outlet_on: bool,
    /// Human-readable summary.
    pub message: String,
}

/// Switch the controller's mode.
///
/// The token is checked before the mode is looked at, so an unauthenticated
/// caller cannot discover which modes exist. The change itself runs on its own
/// task and finishes even if the caller goes away.
///
/// ```text
/// GET /control?mode=on&token=<secret>
///
/// Response: 200 OK
/// {"success": true, "mode": "on", "outlet_on": true,
///  "message": "Successfully set mode to 'on'"}
/// ```
pub async fn set_mode<C>(
    _token: ControlToken,
    State(state): State<Arc<AppState<C>>>,
    Query(params): Query<ControlParams>,
) -> Result<Json<ControlResponse>, ApiError>
where
    C: FailoverControl + 'static,
{
    let raw = params
        .mode
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("missing required parameter: mode".to_string()))?;
    let mode: Mode = raw
        .trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(failover_control::ControlError::from)?;

    // Detached so a dropped request (client gone, request timeout) cannot
    // cancel the change between the outlet command and the state commit.
    let control = Arc::clone(&state.control);
    let change = tokio::spawn(async move { control.apply_mode(mode).await })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, %mode, "Mode change task failed");
            ApiError::Internal(e.to_string())
        })??;

    Ok(Json(ControlResponse {
        success: true,
        mode: change.mode,
        outlet_on: change.outlet_on,
        message: format!("Successfully set mode to '{}'", change.mode),
    }))
}
