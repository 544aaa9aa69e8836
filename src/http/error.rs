//! Client-facing handler errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Errors a handler reports to the client as `{"detail": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("X-Token header invalid")]
    InvalidHeaderToken,

    #[error("No Jessica token provided")]
    MissingQueryToken,

    #[error("Item not found")]
    ItemNotFound,

    #[error("Item already exists")]
    ItemExists,

    #[error("Request body too large")]
    BodyTooLarge,

    #[error("Response body unavailable")]
    ResponseUnavailable,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidHeaderToken | ApiError::MissingQueryToken => StatusCode::BAD_REQUEST,
            ApiError::ItemNotFound => StatusCode::NOT_FOUND,
            ApiError::ItemExists => StatusCode::FORBIDDEN,
            ApiError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ResponseUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(_) => ApiError::ItemExists,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
