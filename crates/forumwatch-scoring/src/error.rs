use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("invalid pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
