use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, info};

/// Logs every request with its status and latency.
///
/// Health probes are logged at debug level only.
pub async fn request_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    if path == "/health" {
        debug!(%method, %path, status, latency_ms, "Request served");
    } else {
        info!(%method, %path, status, latency_ms, "Request served");
    }
    response
}
