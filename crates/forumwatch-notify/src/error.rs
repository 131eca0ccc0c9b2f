use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook returned HTTP {status}: {body}")]
    Webhook { status: u16, body: String },

    #[error("no Slack webhook URL configured")]
    MissingWebhook,
}
