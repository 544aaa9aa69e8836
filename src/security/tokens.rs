//! Shared-token checks for the item routes.
//! Both tokens are read from the live configuration on every request.

use axum::{
    body::Body,
    extract::{Query, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::http::error::ApiError;
use crate::http::server::AppState;

pub const X_TOKEN: &str = "x-token";

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

pub async fn token_guard(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let config = state.config.load();

    if query.token.as_deref() != Some(config.auth.query_token.as_str()) {
        tracing::debug!(path = %request.uri().path(), "Rejected: query token");
        return ApiError::MissingQueryToken.into_response();
    }

    let header_token = request
        .headers()
        .get(X_TOKEN)
        .and_then(|v| v.to_str().ok());
    if header_token != Some(config.auth.header_token.as_str()) {
        tracing::debug!(path = %request.uri().path(), "Rejected: X-Token header");
        return ApiError::InvalidHeaderToken.into_response();
    }

    next.run(request).await
}
