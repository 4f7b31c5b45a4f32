//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Deployment mode, resolved from `APP_ENV`.
///
/// Development mode enables the per-request access log and lets internal
/// error messages through to clients; production mode keeps both off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port the server binds on.
    pub port: u16,

    /// Deployment mode (development or production).
    pub environment: Environment,

    /// Directory the static assets (including the two HTML entry points)
    /// are served from.
    pub public_dir: PathBuf,

    /// Path of the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum requests per client identity within one rate-limit window.
    pub rate_limit_max: u32,

    /// Length of the rate-limit window.
    pub rate_limit_window: Duration,
}

/// Default rate-limit ceiling per client within one window.
const DEFAULT_RATE_LIMIT: u32 = 100;

/// Default rate-limit window (15 minutes).
const DEFAULT_RATE_WINDOW_SECS: u64 = 15 * 60;

impl Config {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `PORT`: bind port (default: 3000)
    /// - `APP_ENV`: `development` | `production` (default: development)
    /// - `PRACTICELOG_PUBLIC_DIR`: static asset directory (default: "public")
    /// - `PRACTICELOG_DB_PATH`: SQLite file path (default: "data/practicelog.db")
    /// - `PRACTICELOG_RATE_LIMIT`: requests per window (default: 100)
    /// - `PRACTICELOG_RATE_WINDOW_SECS`: window length in seconds (default: 900)
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("PORT must be a port number, got {raw:?}"))?,
            Err(_) => 3000,
        };

        let environment =
            Environment::parse(&std::env::var("APP_ENV").unwrap_or_default());

        let public_dir = PathBuf::from(
            std::env::var("PRACTICELOG_PUBLIC_DIR").unwrap_or_else(|_| "public".to_string()),
        );

        let database_path = PathBuf::from(
            std::env::var("PRACTICELOG_DB_PATH")
                .unwrap_or_else(|_| "data/practicelog.db".to_string()),
        );

        let rate_limit_max = match std::env::var("PRACTICELOG_RATE_LIMIT") {
            Ok(raw) => raw.parse::<u32>().map_err(|_| {
                anyhow::anyhow!("PRACTICELOG_RATE_LIMIT must be a count, got {raw:?}")
            })?,
            Err(_) => DEFAULT_RATE_LIMIT,
        };

        let rate_limit_window = match std::env::var("PRACTICELOG_RATE_WINDOW_SECS") {
            Ok(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|_| {
                anyhow::anyhow!("PRACTICELOG_RATE_WINDOW_SECS must be seconds, got {raw:?}")
            })?),
            Err(_) => Duration::from_secs(DEFAULT_RATE_WINDOW_SECS),
        };

        tracing::info!(
            port,
            environment = environment.as_str(),
            public_dir = %public_dir.display(),
            database_path = %database_path.display(),
            rate_limit_max,
            rate_limit_window_secs = rate_limit_window.as_secs(),
            "configuration loaded"
        );

        Ok(Self {
            port,
            environment,
            public_dir,
            database_path,
            rate_limit_max,
            rate_limit_window,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize config tests that manipulate env vars.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "PORT",
        "APP_ENV",
        "PRACTICELOG_PUBLIC_DIR",
        "PRACTICELOG_DB_PATH",
        "PRACTICELOG_RATE_LIMIT",
        "PRACTICELOG_RATE_WINDOW_SECS",
    ];

    /// Helper to run config tests with isolated env vars.
    /// Uses a mutex to prevent concurrent env var races.
    fn with_env_vars<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_MUTEX.lock().unwrap();

        let saved: Vec<_> = ENV_KEYS
            .iter()
            .map(|k| (*k, std::env::var(k).ok()))
            .collect();

        // SAFETY: Serialized by mutex; only test code touches these vars.
        unsafe {
            for k in ENV_KEYS {
                std::env::remove_var(k);
            }
            for (k, v) in vars {
                std::env::set_var(k, v);
            }
        }

        f();

        // SAFETY: Restoring original env state.
        unsafe {
            for (k, v) in &saved {
                match v {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    #[test]
    fn config_defaults() {
        with_env_vars(&[], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.port, 3000);
            assert_eq!(config.environment, Environment::Development);
            assert_eq!(config.public_dir, PathBuf::from("public"));
            assert_eq!(config.database_path, PathBuf::from("data/practicelog.db"));
            assert_eq!(config.rate_limit_max, 100);
            assert_eq!(config.rate_limit_window, Duration::from_secs(900));
        });
    }

    #[test]
    fn config_custom_values() {
        with_env_vars(
            &[
                ("PORT", "8088"),
                ("APP_ENV", "production"),
                ("PRACTICELOG_PUBLIC_DIR", "/srv/assets"),
                ("PRACTICELOG_DB_PATH", "/var/lib/practicelog.db"),
                ("PRACTICELOG_RATE_LIMIT", "10"),
                ("PRACTICELOG_RATE_WINDOW_SECS", "60"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.port, 8088);
                assert_eq!(config.environment, Environment::Production);
                assert_eq!(config.public_dir, PathBuf::from("/srv/assets"));
                assert_eq!(config.database_path, PathBuf::from("/var/lib/practicelog.db"));
                assert_eq!(config.rate_limit_max, 10);
                assert_eq!(config.rate_limit_window, Duration::from_secs(60));
            },
        );
    }

    #[test]
    fn config_invalid_port_rejected() {
        with_env_vars(&[("PORT", "not-a-port")], || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn environment_parse_is_lenient() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("  PRODUCTION "), Environment::Production);
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(Environment::parse("staging"), Environment::Development);
        assert_eq!(Environment::parse(""), Environment::Development);
    }
}
