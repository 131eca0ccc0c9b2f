//! SQLite persistence for forumwatch: the dedup ledger plus runtime keyword and
//! source administration state.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use forumwatch_core::AppConfig;

pub mod ledger;
pub mod managed;
pub mod seen;

pub use ledger::{ClaimGuard, Ledger};
pub use managed::{DisabledItemRow, UserKeywordRow, UserSourceRow};
pub use seen::{LedgerStats, NotificationRow, SeenItemRow};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;

// Path relative to crates/forumwatch-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// How long a writer waits on SQLite's file lock before failing.
    pub busy_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            busy_timeout_secs: DEFAULT_BUSY_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
            busy_timeout_secs: config.db_busy_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to create ledger directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("failed to serialize matched keywords: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Open (creating if missing) the SQLite file at `path` in WAL mode.
///
/// # Errors
///
/// Returns [`LedgerError::Io`] if the parent directory cannot be created, or
/// [`LedgerError::Sqlx`] if the connection cannot be established.
pub async fn connect_pool(path: &Path, config: PoolConfig) -> Result<SqlitePool, LedgerError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LedgerError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Run all pending migrations against the pool.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_has_sane_defaults() {
        let config = PoolConfig::default();

        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.acquire_timeout_secs, DEFAULT_ACQUIRE_TIMEOUT_SECS);
        assert_eq!(config.busy_timeout_secs, DEFAULT_BUSY_TIMEOUT_SECS);
    }
}
