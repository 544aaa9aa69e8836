//! Journal middleware.
//!
//! Buffers the request body, journals the exchange around the inner service,
//! buffers the response body for the output entry, then rebuilds both.
//! Entries keep at most `request_log.max_body_bytes` of each body; the bodies
//! passed on are never cut. Requests are read up to `security.max_body_size`.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{ConnectInfo, Request, State},
    http::{header, response::Parts, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::http::error::ApiError;
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::journal::{Capture, Captured, Exchange};

/// A response whose body has been read into memory.
struct BufferedResponse {
    parts: Parts,
    body: Bytes,
}

impl BufferedResponse {
    /// Read the whole body. Only a body stream that fails mid-way, which the
    /// client could not have received either, becomes a 500.
    async fn buffer(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        match to_bytes(body, usize::MAX).await {
            Ok(body) => Self { parts, body },
            Err(e) => {
                tracing::error!(error = %e, "Response body stream failed");
                Self::unavailable()
            }
        }
    }

    fn unavailable() -> Self {
        let error = ApiError::ResponseUnavailable;
        let (mut parts, ()) = Response::new(()).into_parts();
        parts.status = error.status();
        parts.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let body = Bytes::from(json!({ "detail": error.to_string() }).to_string());
        Self { parts, body }
    }
}

impl Captured for BufferedResponse {
    fn capture(&self) -> Capture {
        Capture::from_parts(&self.parts.headers, self.body.clone())
    }
}

impl IntoResponse for BufferedResponse {
    fn into_response(self) -> Response {
        Response::from_parts(self.parts, Body::from(self.body))
    }
}

pub async fn request_log(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let logger = state.logger.clone();
    if !logger.enabled() {
        return next.run(request).await;
    }

    let client_host = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let exchange = Exchange::new(request.uri().to_string(), request.method().as_str(), client_host);
    tracing::trace!(
        request_id = %request_id(request.headers()).unwrap_or("-"),
        url = %exchange.url,
        "Journaling request"
    );

    let read_limit = logger.read_limit();
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, read_limit).await;
    let captured = Capture::from_parts(&parts.headers, body.as_ref().ok().cloned().unwrap_or_default());

    let handled = async move {
        let response = match body {
            Ok(bytes) => next.run(Request::from_parts(parts, Body::from(bytes))).await,
            Err(e) => {
                tracing::warn!(error = %e, limit = read_limit, "Request body over limit or unreadable");
                ApiError::BodyTooLarge.into_response()
            }
        };
        Ok::<_, Infallible>(BufferedResponse::buffer(response).await)
    };

    match logger.around(&exchange, captured, handled).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
