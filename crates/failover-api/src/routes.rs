//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use failover_control::FailoverControl;

use crate::handlers::{control, health, modes, status};
use crate::rate_limit::{self, RateLimiter};
use crate::state::AppState;

/// Create the router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Liveness check (no token, no rate limit)
///
/// ## Read tier (rate limited per client)
/// - `GET /modes` - List selectable modes
/// - `GET /status` - Mode, outlet state and failover progress
///
/// ## Mutating tier (token required, rate limited per client)
/// - `GET /control?mode=<auto|on|off>&token=<secret>` - Change mode
pub fn create_router<C>(state: AppState<C>) -> Router
where
    C: FailoverControl + 'static,
{
    // Extract config values before moving state
    let control_limit = state.config.control_rate_limit_per_hour;
    let read_limit = state.config.status_rate_limit_per_hour;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::health))
        .route(
            "/modes",
            get(modes::list_modes).route_layer(from_fn_with_state(
                RateLimiter::per_hour("modes", read_limit),
                rate_limit::enforce,
            )),
        )
        .route(
            "/status",
            get(status::get_status::<C>).route_layer(from_fn_with_state(
                RateLimiter::per_hour("status", read_limit),
                rate_limit::enforce,
            )),
        )
        .route(
            "/control",
            get(control::set_mode::<C>).route_layer(from_fn_with_state(
                RateLimiter::per_hour("control", control_limit),
                rate_limit::enforce,
            )),
        )
        // Middleware
        .layer(
            ServiceBuilder::new()
                // Path only: the query string may carry the control token.
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                    tracing::info_span!(
                        "http",
                        method = %request.method(),
                        path = %request.uri().path()
                    )
                }))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}
