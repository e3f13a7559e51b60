//! Control token check.
//!
//! This module provides the `ControlToken` extractor that admits a request
//! only if it carries the configured shared secret, either as the `token`
//! query parameter or as an `Authorization: Bearer` header.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;

use failover_control::FailoverControl;

use crate::error::ApiError;
use crate::state::AppState;

/// Proof that the request presented the control token.
#[derive(Debug, Clone, Copy)]
pub struct ControlToken;

#[derive(Debug, Deserialize)]
struct TokenParam {
    token: Option<String>,
}

#[async_trait]
impl<C> FromRequestParts<Arc<AppState<C>>> for ControlToken
where
    C: FailoverControl + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<C>>,
    ) -> Result<Self, Self::Rejection> {
        let from_query = Query::<TokenParam>::from_request_parts(parts, state)
            .await
            .ok()
            .and_then(|Query(p)| p.token);

        let provided = from_query.or_else(|| {
            parts
                .headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string)
        });

        match provided {
            Some(token) if token_matches(&state.config.api_token, &token) => Ok(Self),
            Some(_) => {
                tracing::warn!("Rejected control request with wrong token");
                Err(ApiError::Unauthorized)
            }
            None => Err(ApiError::Unauthorized),
        }
    }
}

/// Compare tokens without short-circuiting on the first differing byte.
///
/// An empty expected token never matches.
fn token_matches(expected: &str, provided: &str) -> bool {
    let (a, b) = (expected.as_bytes(), provided.as_bytes());
    if a.is_empty() || a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
