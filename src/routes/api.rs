//! The mounted API route table.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::database::{StoredSubmission, Submission};
use crate::error::ApiError;
use crate::state::AppState;

/// Default page size for submission listings.
const LIST_LIMIT: u32 = 100;

/// Build the API route table.
///
/// Returned as a `Result` so the caller owns the degrade branch: a failure
/// here must be logged and survived, not propagated (the server keeps
/// running with only the backup route under `/api`).
pub fn api_router() -> anyhow::Result<Router<AppState>> {
    Ok(Router::new()
        .route("/health", get(health))
        .route("/test", get(test))
        .route("/submit", post(submit))
        .route("/submissions", get(list_submissions)))
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    success: bool,
    status: &'static str,
    version: &'static str,
    database: &'static str,
}

/// Health probe: service status plus whether the deferred database
/// connect has succeeded.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database: if state.database().is_some() {
            "connected"
        } else {
            "disconnected"
        },
    })
}

#[derive(Debug, Clone, Serialize)]
struct TestResponse {
    success: bool,
    message: &'static str,
}

async fn test() -> Json<TestResponse> {
    Json(TestResponse {
        success: true,
        message: "API route table is mounted",
    })
}

#[derive(Debug, Clone, Serialize)]
struct SubmitResponse {
    success: bool,
    id: i64,
}

/// Store one submission. Answers 503 while the database is not connected.
async fn submit(
    State(state): State<AppState>,
    Json(submission): Json<Submission>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let database = state.database().ok_or(ApiError::DatabaseUnavailable)?;
    let id = database.insert_submission(submission).await?;
    Ok(Json(SubmitResponse { success: true, id }))
}

#[derive(Debug, Clone, Serialize)]
struct SubmissionsResponse {
    success: bool,
    submissions: Vec<StoredSubmission>,
}

/// List stored submissions, newest first.
async fn list_submissions(
    State(state): State<AppState>,
) -> Result<Json<SubmissionsResponse>, ApiError> {
    let database = state.database().ok_or(ApiError::DatabaseUnavailable)?;
    let submissions = database.list_submissions(LIST_LIMIT).await?;
    Ok(Json(SubmissionsResponse {
        success: true,
        submissions,
    }))
}
