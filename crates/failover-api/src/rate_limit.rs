//! Per-client sliding-window rate limiting.
//!
//! Each [`RateLimiter`] admits at most `limit` requests per client address
//! within any `window`. Clients are keyed by peer IP when the server was
//! started with connection info, otherwise all requests share one bucket.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::ApiError;

const ONE_HOUR: Duration = Duration::from_secs(3600);

/// Sliding-window request limiter.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tier: &'static str,
    limit: usize,
    window: Duration,
    hits: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

impl RateLimiter {
    /// Create a limiter admitting `limit` requests per client per `window`.
    #[must_use]
    pub fn new(tier: &'static str, limit: u32, window: Duration) -> Self {
        Self {
            tier,
            limit: usize::try_from(limit).unwrap_or(usize::MAX),
            window,
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a limiter admitting `limit` requests per client per hour.
    #[must_use]
    pub fn per_hour(tier: &'static str, limit: u32) -> Self {
        Self::new(tier, limit, ONE_HOUR)
    }

    /// Record a request from `client` if it is within the limit.
    ///
    /// # Errors
    ///
    /// Returns the time until the oldest request in the window expires when
    /// the client is over the limit. Rejected requests are not recorded.
    pub fn check(&self, client: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut hits = self.hits.lock();

        // Drop idle clients so the map does not grow without bound.
        hits.retain(|_, times| {
            times.back().is_some_and(|last| now.duration_since(*last) < self.window)
        });

        let times = hits.entry(client.to_string()).or_default();
        while times
            .front()
            .is_some_and(|first| now.duration_since(*first) >= self.window)
        {
            times.pop_front();
        }

        if times.len() >= self.limit {
            let retry_after = times
                .front()
                .map_or(self.window, |first| self.window - now.duration_since(*first));
            return Err(retry_after);
        }

        times.push_back(now);
        Ok(())
    }

    #[cfg(test)]
    fn count(&self, client: &str) -> usize {
        self.hits.lock().get(client).map_or(0, VecDeque::len)
    }
}

/// Client key for a request: the peer IP, or `unknown` without connection info.
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.ip().to_string())
}

/// Middleware rejecting requests over the limiter's budget with 429.
pub async fn enforce(State(limiter): State<RateLimiter>, request: Request, next: Next) -> Response {
    let client = client_key(&request);

    match limiter.check(&client) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(
                tier = limiter.tier,
                client = %client,
                limit = limiter.limit,
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            ApiError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            }
            .into_response()
        }
    }
}
