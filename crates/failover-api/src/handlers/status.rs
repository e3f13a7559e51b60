//! Status endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use failover_control::{FailoverControl, StatusReport};

use crate::state::AppState;

/// Report mode, outlet state and failover progress.
///
/// The outlet state is queried live; if the outlet does not answer the
/// persisted belief is reported and `outlet_source` says so.
///
/// ```text
/// GET /status
///
/// Response: 200 OK
/// {"mode": "auto", "outlet_on": false, "outlet_source": "live",
///  "consecutive_failures": 1, "recovery_since": null}
/// ```
pub async fn get_status<C>(State(state): State<Arc<AppState<C>>>) -> Json<StatusReport>
where
    C: FailoverControl + 'static,
{
    Json(state.control.status().await)
}
