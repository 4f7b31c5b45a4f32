//! Request logging middleware.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Diagnostic tracer: logs method and full original URI for every request
/// before any routing decision. Always on, never rejects or mutates.
pub async fn trace_request(request: Request, next: Next) -> Response {
    tracing::info!(method = %request.method(), path = %request.uri(), "incoming request");
    next.run(request).await
}
