//! Fixed HTML entry points.

use std::path::Path;

use axum::routing::get_service;
use axum::Router;
use tower_http::services::ServeFile;

use crate::state::AppState;

/// Page routes: the public form at `/` and the admin view at `/manage`.
/// Each unconditionally serves one file from the public directory.
pub fn page_routes(public_dir: &Path) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get_service(ServeFile::new(public_dir.join("index.html"))),
        )
        .route(
            "/manage",
            get_service(ServeFile::new(public_dir.join("admin.html"))),
        )
}
