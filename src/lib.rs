//! practicelog — web server collecting daily practice submissions.
//!
//! A public form page and an admin view are served as static HTML; the
//! JSON API underneath stores submissions in SQLite. The interesting part
//! is the request-admission pipeline every request passes through:
//! security/CORS headers, a body-size ceiling, per-client rate limiting,
//! request tracing, static file serving, and enveloped 404/500 responders.
//! Startup binds the listener first and connects the database afterwards;
//! a failed connect degrades the API instead of stopping the server.

pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod rate_limit;
pub mod routes;
pub mod security;
pub mod state;

pub use self::config::{Config, Environment};
pub use self::error::ApiError;
pub use self::routes::router;
pub use self::state::AppState;
