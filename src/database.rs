//! SQLite-backed submission store and its deferred bootstrap.
//!
//! The connection is opened after the listener is already bound (see
//! `main.rs`), and a failed open leaves the server running without
//! persistence: routes that need the store answer 503, everything else
//! keeps working.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Delay between a successful bind and the connect attempt.
pub const CONNECT_DELAY: Duration = Duration::from_secs(3);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS submissions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    date        TEXT NOT NULL,
    name        TEXT NOT NULL,
    fields      TEXT NOT NULL,
    remark      TEXT,
    device_id   TEXT,
    created_at  TEXT NOT NULL
)";

/// One daily practice submission.
///
/// The numeric practice fields vary by deployment, so anything beyond the
/// fixed columns is kept as-is in `fields` and stored as a JSON column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub date: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(
        default,
        rename = "deviceId",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_id: Option<String>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// A stored submission, as returned by list queries.
#[derive(Debug, Clone, Serialize)]
pub struct StoredSubmission {
    pub id: i64,
    #[serde(flatten)]
    pub submission: Submission,
    pub created_at: String,
}

/// Handle to the SQLite store.
///
/// Queries run under `spawn_blocking`; the mutex is held only for the
/// duration of one statement.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and ensure the schema exists.
    pub async fn connect(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        tokio::task::spawn_blocking(move || Self::open_blocking(&path))
            .await
            .context("database open task failed")?
    }

    fn open_blocking(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        conn.execute(SCHEMA, [])
            .context("failed to create submissions table")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert a submission and return its row id.
    pub async fn insert_submission(&self, submission: Submission) -> anyhow::Result<i64> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let fields = serde_json::to_string(&submission.fields)
                .context("failed to serialize submission fields")?;
            let created_at = chrono::Utc::now().to_rfc3339();

            let conn = conn.lock();
            conn.execute(
                "INSERT INTO submissions (date, name, fields, remark, device_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    submission.date,
                    submission.name,
                    fields,
                    submission.remark,
                    submission.device_id,
                    created_at,
                ],
            )
            .context("failed to insert submission")?;

            Ok(conn.last_insert_rowid())
        })
        .await
        .context("database insert task failed")?
    }

    /// List stored submissions, newest first.
    pub async fn list_submissions(&self, limit: u32) -> anyhow::Result<Vec<StoredSubmission>> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            let mut stmt = conn
                .prepare(
                    "SELECT id, date, name, fields, remark, device_id, created_at
                     FROM submissions ORDER BY id DESC LIMIT ?1",
                )
                .context("failed to prepare submissions query")?;

            let rows = stmt
                .query_map(params![limit], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                })
                .context("failed to query submissions")?;

            let mut submissions = Vec::new();
            for row in rows {
                let (id, date, name, fields, remark, device_id, created_at) =
                    row.context("failed to read submission row")?;
                let fields = serde_json::from_str(&fields)
                    .context("stored submission fields are not valid JSON")?;
                submissions.push(StoredSubmission {
                    id,
                    submission: Submission {
                        date,
                        name,
                        remark,
                        device_id,
                        fields,
                    },
                    created_at,
                });
            }
            Ok(submissions)
        })
        .await
        .context("database list task failed")?
    }
}

/// Deferred bootstrap: wait `delay`, then attempt one connection.
///
/// Success stores the handle in the shared state; failure is logged and
/// the server keeps running without persistence. One attempt only.
pub async fn connect_after_delay(state: AppState, delay: Duration) {
    tokio::time::sleep(delay).await;

    let path = state.config.database_path.clone();
    match Database::connect(path).await {
        Ok(database) => {
            state.set_database(database);
            tracing::info!("database connected");
        }
        Err(err) => {
            tracing::warn!(error = %err, "database connection failed, server continues without persistence");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_submission() -> Submission {
        let mut fields = serde_json::Map::new();
        fields.insert("nineWord".to_string(), serde_json::json!(108));
        fields.insert("quietZen".to_string(), serde_json::json!(30));
        Submission {
            date: "2024-01-15".to_string(),
            name: "tester".to_string(),
            remark: Some("first entry".to_string()),
            device_id: Some("test-script".to_string()),
            fields,
        }
    }

    #[tokio::test]
    async fn insert_and_list_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::connect(dir.path().join("test.db")).await.unwrap();

        let id = database
            .insert_submission(sample_submission())
            .await
            .unwrap();
        assert!(id > 0);

        let stored = database.list_submissions(10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].submission.name, "tester");
        assert_eq!(stored[0].submission.fields["nineWord"], 108);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::connect(dir.path().join("test.db")).await.unwrap();

        for date in ["2024-01-01", "2024-01-02", "2024-01-03"] {
            let mut submission = sample_submission();
            submission.date = date.to_string();
            database.insert_submission(submission).await.unwrap();
        }

        let stored = database.list_submissions(2).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].submission.date, "2024-01-03");
        assert_eq!(stored[1].submission.date, "2024-01-02");
    }

    #[tokio::test]
    async fn connect_fails_on_unusable_path() {
        let dir = tempfile::tempdir().unwrap();
        // The directory itself is not a valid database file.
        let result = Database::connect(dir.path().to_path_buf()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn deferred_connect_failure_leaves_state_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::Config {
            port: 0,
            environment: crate::config::Environment::Production,
            public_dir: std::path::PathBuf::from("public"),
            // A directory is not a usable database file.
            database_path: dir.path().to_path_buf(),
            rate_limit_max: 100,
            rate_limit_window: Duration::from_secs(900),
        };
        let state = AppState::new(config.clone());

        connect_after_delay(state.clone(), Duration::ZERO).await;
        assert!(state.database().is_none());

        // With a usable path the same bootstrap installs the handle.
        config.database_path = dir.path().join("ok.db");
        let state = AppState::new(config);
        connect_after_delay(state.clone(), Duration::ZERO).await;
        assert!(state.database().is_some());
    }

    #[tokio::test]
    async fn submission_deserializes_flat_fields() {
        let submission: Submission = serde_json::from_value(serde_json::json!({
            "date": "2024-01-15",
            "name": "tester",
            "nineWord": 108,
            "buddhaWorship": 3,
            "remark": "ok",
            "deviceId": "web"
        }))
        .unwrap();

        assert_eq!(submission.fields["nineWord"], 108);
        assert_eq!(submission.fields["buddhaWorship"], 3);
        assert_eq!(submission.remark.as_deref(), Some("ok"));
        assert_eq!(submission.device_id.as_deref(), Some("web"));
        assert!(!submission.fields.contains_key("remark"));
    }
}
