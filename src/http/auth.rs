//! Bearer-token guard standing in for the host's auth layer.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

/// Reject requests whose `Authorization: Bearer` token differs from the
/// configured one.
pub async fn require_bearer(State(expected): State<Arc<str>>, req: Request, next: Next) -> Response {
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == &*expected);

    if authorized {
        return next.run(req).await;
    }

    warn!(path = %req.uri().path(), "Rejected unauthenticated socket request");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "unauthorised" })),
    )
        .into_response()
}
