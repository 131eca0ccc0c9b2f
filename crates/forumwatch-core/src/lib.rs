//! Shared domain types and configuration for forumwatch.

pub mod app_config;
pub mod config;
pub mod item;
pub mod managed;
pub mod monitor_file;

use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use item::{ContentItem, DetectionResult, ItemId, MatchLocation, MatchRecord};
pub use managed::{ItemKind, ItemOwner, NaturalKey};
pub use monitor_file::{
    load_monitor_file, parse_monitor_file, validate_group_name, KeywordMap, MonitorFile,
    MonitoringSettings, SlackSettings, SourceConfig,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read monitor config {path}: {source}")]
    MonitorFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse monitor config: {0}")]
    MonitorFileParse(#[from] serde_yaml::Error),

    #[error("invalid monitor config: {0}")]
    Validation(String),
}
