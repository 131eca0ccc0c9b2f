use thiserror::Error;

use forumwatch_core::{ConfigError, NaturalKey};
use forumwatch_db::LedgerError;
use forumwatch_fetch::FetchError;
use forumwatch_scoring::ScoringError;
use forumwatch_sources::SourceError;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// Persistence failure. Aborts the cycle and is fatal to the process.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("failed to build HTTP client: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Pattern(#[from] ScoringError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Disable/enable addressed something that is not in the monitor file.
    #[error("no built-in {0}")]
    UnknownItem(NaturalKey),

    #[error("invalid source: {0}")]
    InvalidSource(String),
}
