//! Alert delivery: the [`Notifier`] contract, Slack webhooks, and a log-only
//! notifier for dry runs.

pub mod error;
pub mod format;
pub mod log;
pub mod slack;

use async_trait::async_trait;

use forumwatch_core::DetectionResult;

pub use error::NotifyError;
pub use log::LogNotifier;
pub use slack::SlackNotifier;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one alert and returns the channel's delivery receipt.
    async fn deliver(&self, result: &DetectionResult) -> Result<String, NotifyError>;

    /// Reports a monitoring failure for `source_name`.
    async fn deliver_error(&self, source_name: &str, message: &str) -> Result<(), NotifyError>;

    /// Sends a connectivity check message.
    async fn send_test(&self) -> Result<String, NotifyError>;
}
