use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network, TLS or timeout failure, returned once the retry budget is spent.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server errors persisted through every allowed attempt.
    #[error("giving up on {url} after {attempts} attempts (last status {last_status})")]
    ExhaustedRetries {
        url: String,
        attempts: u32,
        last_status: u16,
    },

    /// Non-retriable 4xx response (anything but 429).
    #[error("client request error {status} from {url}: {body}")]
    ClientRequest {
        status: u16,
        url: String,
        body: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// HTTP status carried by the error, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::ClientRequest { status, .. } => Some(*status),
            FetchError::ExhaustedRetries { last_status, .. } => Some(*last_status),
            FetchError::Transport(e) => e.status().map(|s| s.as_u16()),
            FetchError::Deserialize { .. } => None,
        }
    }
}
