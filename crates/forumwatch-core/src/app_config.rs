use std::path::PathBuf;

/// Process-level settings read from the environment.
///
/// Everything about *what* to monitor lives in the YAML monitor file pointed
/// to by `config_path`; this struct only carries where to find things and how
/// the process should behave.
#[derive(Clone)]
pub struct AppConfig {
    pub config_path: PathBuf,
    pub log_level: String,
    /// Overrides `database_path` from the monitor file when set.
    pub database_path: Option<PathBuf>,
    /// Overrides `slack.webhook_url` from the monitor file when set.
    pub slack_webhook_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub db_busy_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("config_path", &self.config_path)
            .field("log_level", &self.log_level)
            .field("database_path", &self.database_path)
            .field(
                "slack_webhook_url",
                &self.slack_webhook_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("db_busy_timeout_secs", &self.db_busy_timeout_secs)
            .finish()
    }
}
