//! The YAML monitor file: sources, keyword groups and pipeline tuning.
//!
//! String values may reference environment variables as `${NAME}`; unset
//! variables substitute to an empty string so optional secrets can be left
//! out of the environment entirely.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

static ENV_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

/// Keyword groups: group name → pattern texts, in file order within a group.
/// Groups themselves iterate in name order, not file order.
pub type KeywordMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorFile {
    #[serde(default)]
    pub monitoring: MonitoringSettings,
    #[serde(default)]
    pub slack: SlackSettings,
    #[serde(default, alias = "forums")]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub keywords: KeywordMap,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Ledger used by historical scans, kept apart from live dedup state.
    #[serde(default = "default_history_database_path")]
    pub history_database_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    pub poll_interval_secs: u64,
    /// Total attempts allowed for server errors and network failures.
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub detection_threshold: f64,
    pub requests_per_minute: u32,
    /// Base of the exponential backoff: `backoff_base_secs * 2^attempt`.
    pub backoff_base_secs: u64,
    /// Pause on a 429 that carries no `Retry-After` header.
    pub default_retry_after_secs: u64,
    /// Look-back window for each live polling cycle.
    pub since_minutes: u64,
    /// Fetch the full topic when the listing carries no body.
    pub fetch_details: bool,
    pub user_agent: String,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            max_retries: 3,
            timeout_secs: 30,
            detection_threshold: 1.5,
            requests_per_minute: 30,
            backoff_base_secs: 5,
            default_retry_after_secs: 60,
            since_minutes: 30,
            fetch_details: true,
            user_agent: "forumwatch/0.1 (governance monitoring bot)".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackSettings {
    pub webhook_url: Option<String>,
    pub channel: Option<String>,
    pub username: String,
    pub icon_emoji: String,
}

impl Default for SlackSettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            channel: None,
            username: "Forum Governance Monitor".to_string(),
            icon_emoji: ":bell:".to_string(),
        }
    }
}

impl std::fmt::Debug for SlackSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackSettings")
            .field(
                "webhook_url",
                &self.webhook_url.as_ref().map(|_| "[redacted]"),
            )
            .field("channel", &self.channel)
            .field("username", &self.username)
            .field("icon_emoji", &self.icon_emoji)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    /// Registry key of the source implementation, e.g. `"discourse"`.
    #[serde(default = "default_source_kind", alias = "type")]
    pub kind: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Optional category allow-list; empty means every category.
    #[serde(default)]
    pub categories: Vec<String>,
}

fn default_source_kind() -> String {
    "discourse".to_string()
}

fn default_true() -> bool {
    true
}

fn default_database_path() -> PathBuf {
    PathBuf::from("forumwatch.db")
}

fn default_history_database_path() -> PathBuf {
    PathBuf::from("forumwatch_history.db")
}

/// Load, env-substitute and validate the monitor file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_monitor_file(path: &Path) -> Result<MonitorFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::MonitorFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_monitor_file(&content, |key| std::env::var(key).ok())
}

/// Parse monitor file text, resolving `${VAR}` references through `lookup`.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_monitor_file<F>(content: &str, lookup: F) -> Result<MonitorFile, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw: serde_yaml::Value = serde_yaml::from_str(content)?;
    let substituted = substitute_env(raw, &lookup);
    let file: MonitorFile = serde_yaml::from_value(substituted)?;
    validate_monitor_file(&file)?;
    Ok(file)
}

fn substitute_env<F>(value: serde_yaml::Value, lookup: &F) -> serde_yaml::Value
where
    F: Fn(&str) -> Option<String>,
{
    use serde_yaml::Value;

    match value {
        Value::String(s) => Value::String(substitute_str(&s, lookup)),
        Value::Sequence(items) => Value::Sequence(
            items
                .into_iter()
                .map(|item| substitute_env(item, lookup))
                .collect(),
        ),
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, substitute_env(v, lookup)))
                .collect(),
        ),
        other => other,
    }
}

fn substitute_str<F>(s: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_REF_RE
        .replace_all(s, |caps: &regex::Captures<'_>| {
            lookup(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

fn validate_monitor_file(file: &MonitorFile) -> Result<(), ConfigError> {
    let monitoring = &file.monitoring;
    if monitoring.requests_per_minute == 0 {
        return Err(ConfigError::Validation(
            "monitoring.requests_per_minute must be at least 1".to_string(),
        ));
    }
    if monitoring.max_retries == 0 {
        return Err(ConfigError::Validation(
            "monitoring.max_retries must be at least 1".to_string(),
        ));
    }
    if !monitoring.detection_threshold.is_finite() || monitoring.detection_threshold < 0.0 {
        return Err(ConfigError::Validation(format!(
            "monitoring.detection_threshold must be a non-negative number, got {}",
            monitoring.detection_threshold
        )));
    }

    let mut seen_names = HashSet::new();
    for source in &file.sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source name must be non-empty".to_string(),
            ));
        }
        if source.url.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{}' has an empty url",
                source.name
            )));
        }
        if !seen_names.insert(source.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source name: '{}'",
                source.name
            )));
        }
    }

    for group in file.keywords.keys() {
        validate_group_name(group)?;
    }

    Ok(())
}

/// Group names double as the prefix of the disabled-item key, so they must be
/// non-empty and free of `:`.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] describing the offending name.
pub fn validate_group_name(group: &str) -> Result<(), ConfigError> {
    if group.trim().is_empty() {
        return Err(ConfigError::Validation(
            "keyword group name must be non-empty".to_string(),
        ));
    }
    if group.contains(':') {
        return Err(ConfigError::Validation(format!(
            "keyword group name '{group}' must not contain ':'"
        )));
    }
    Ok(())
}
