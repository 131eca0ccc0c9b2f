use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let non_empty = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let config_path = PathBuf::from(or_default("FORUMWATCH_CONFIG_PATH", "./config.yaml"));
    let log_level = or_default("FORUMWATCH_LOG_LEVEL", "info");
    let database_path = non_empty("FORUMWATCH_DATABASE_PATH").map(PathBuf::from);
    let slack_webhook_url = non_empty("SLACK_WEBHOOK_URL");

    let db_max_connections = parse_u32("FORUMWATCH_DB_MAX_CONNECTIONS", "5")?;
    if db_max_connections == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "FORUMWATCH_DB_MAX_CONNECTIONS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let db_acquire_timeout_secs = parse_u64("FORUMWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    let db_busy_timeout_secs = parse_u64("FORUMWATCH_DB_BUSY_TIMEOUT_SECS", "5")?;

    Ok(AppConfig {
        config_path,
        log_level,
        database_path,
        slack_webhook_url,
        db_max_connections,
        db_acquire_timeout_secs,
        db_busy_timeout_secs,
    })
}
