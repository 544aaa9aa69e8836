//! `x-process-time` response header and request metrics.

use std::time::Instant;

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

use crate::observability::metrics;

pub const X_PROCESS_TIME: &str = "x-process-time";

/// Stamp responses with the seconds spent producing them.
pub async fn process_time(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let mut response = next.run(request).await;

    let elapsed = start.elapsed().as_secs_f64();
    if let Ok(value) = HeaderValue::from_str(&elapsed.to_string()) {
        response.headers_mut().insert(X_PROCESS_TIME, value);
    }
    metrics::record_request(&method, response.status().as_u16(), start);

    response
}
