//! Request pipeline stages shared by every route.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    BoxError,
};
use tracing::warn;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Pause for the configured latency, then hand the request on.
///
/// The pause happens before the handler runs and leaves the response
/// untouched. A zero latency skips the timer entirely.
pub async fn delay(State(latency): State<Duration>, req: Request, next: Next) -> Response {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
    next.run(req).await
}

/// Converts a failure from the request-timeout guard into a response.
///
/// Runs outside the content-type stage, so it sets the JSON content type
/// itself to keep every response uniform.
pub async fn handle_timeout(err: BoxError) -> Response {
    let status = if err.is::<tower::timeout::error::Elapsed>() {
        warn!("request exceeded the handling timeout");
        StatusCode::GATEWAY_TIMEOUT
    } else {
        warn!(error = %err, "request failed in middleware");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
    )
        .into_response()
}
