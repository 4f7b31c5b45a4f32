//! Router assembly and the request-admission pipeline.
//!
//! Every request passes, in order: security/CORS headers, panic catcher,
//! body-size ceiling, access log (development only), rate limiter,
//! diagnostic tracer, then routing (pages, mounted API, static files) and
//! finally the 404 responder.

pub mod api;
mod pages;

use axum::extract::{DefaultBodyLimit, OriginalUri};
use axum::handler::HandlerWithoutStateExt;
use axum::http::{Method, StatusCode};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::logging;
use crate::rate_limit;
use crate::security;
use crate::state::AppState;

/// Request body ceiling for JSON and url-encoded payloads (10 MB).
const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Build the complete application router.
pub fn router(state: AppState) -> Router {
    build(state, api::api_router())
}

/// Assemble the router around an already-built (or failed) API table.
///
/// Split out from [`router`] so the degrade branch can be exercised
/// directly: an `Err` table must still yield a serving router.
fn build(state: AppState, api: anyhow::Result<Router<AppState>>) -> Router {
    let api_routes = match api {
        Ok(table) => {
            tracing::info!("API route table mounted under /api");
            table
        }
        Err(err) => {
            // Degrade, don't crash: the server stays up with only the
            // backup route answering under /api.
            tracing::error!(error = %err, "failed to build API route table, continuing without it");
            Router::new()
        }
    }
    .route("/backup-test", get(backup_test));

    let public_dir = state.config.public_dir.clone();
    let development = state.config.is_development();

    let serve_public = ServeDir::new(&public_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found.into_service());

    let mut router = Router::new()
        .merge(pages::page_routes(&public_dir))
        .nest("/api", api_routes)
        .fallback_service(serve_public)
        .with_state(state.clone());

    // Layers apply inside-out: the last one added sees the request first.
    router = router.layer(middleware::from_fn(logging::trace_request));
    router = router.layer(middleware::from_fn_with_state(state, rate_limit::enforce));

    if development {
        router = router.layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::span!(
                        Level::INFO,
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        query = request.uri().query().unwrap_or("")
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );
    }

    router = router.layer(DefaultBodyLimit::max(BODY_LIMIT));
    router = router.layer(CatchPanicLayer::custom(security::panic_response));
    router = router.layer(security::cors_layer());
    for layer in security::header_layers() {
        router = router.layer(layer);
    }

    router
}

/// Liveness probe independent of the mounted API table.
async fn backup_test(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "backup test route is alive",
        "path": uri.path(),
    }))
}

/// Terminal responder for paths nothing else matched.
async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    tracing::warn!(method = %method, path = %uri.path(), "no route matched");
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "requested resource does not exist",
            "path": uri.path(),
            "method": method.as_str(),
        })),
    )
}
