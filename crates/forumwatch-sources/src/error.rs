use thiserror::Error;

use forumwatch_fetch::FetchError;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_name}: {error}")]
    Fetch {
        source_name: String,
        #[source]
        error: FetchError,
    },

    #[error("unknown source kind '{kind}' for source '{name}' (available: {available})")]
    UnknownKind {
        kind: String,
        name: String,
        available: String,
    },
}

impl SourceError {
    pub(crate) fn fetch(source_name: &str, error: FetchError) -> Self {
        SourceError::Fetch {
            source_name: source_name.to_owned(),
            error,
        }
    }
}
