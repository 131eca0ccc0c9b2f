//! Slack incoming-webhook notifier.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use forumwatch_core::{DetectionResult, SlackSettings};

use crate::error::NotifyError;
use crate::{format, Notifier};

const ERROR_BODY_PREVIEW_CHARS: usize = 200;

pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
    channel: Option<String>,
    username: String,
    icon_emoji: String,
}

impl SlackNotifier {
    /// Builds a notifier posting to `settings.webhook_url`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::MissingWebhook`] if no non-empty webhook URL is
    /// configured, or [`NotifyError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(settings: &SlackSettings, timeout: Duration) -> Result<Self, NotifyError> {
        let webhook_url = settings
            .webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(NotifyError::MissingWebhook)?
            .to_owned();
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            webhook_url,
            channel: settings.channel.clone().filter(|c| !c.is_empty()),
            username: settings.username.clone(),
            icon_emoji: settings.icon_emoji.clone(),
        })
    }

    /// Adds the channel override, username and icon to a payload.
    fn decorate(&self, mut payload: Value) -> Value {
        if let Some(obj) = payload.as_object_mut() {
            if let Some(channel) = &self.channel {
                obj.insert("channel".to_owned(), Value::from(channel.as_str()));
            }
            obj.insert("username".to_owned(), Value::from(self.username.as_str()));
            obj.insert("icon_emoji".to_owned(), Value::from(self.icon_emoji.as_str()));
        }
        payload
    }

    async fn post(&self, payload: Value) -> Result<String, NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.decorate(payload))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if status != reqwest::StatusCode::OK {
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
            tracing::error!(status = status.as_u16(), response = %preview, "slack send failed");
            return Err(NotifyError::Webhook {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("slack message sent");
        Ok(body)
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn deliver(&self, result: &DetectionResult) -> Result<String, NotifyError> {
        let receipt = self.post(format::alert(result)).await?;
        tracing::info!(
            item_id = %result.item.id,
            source = %result.item.source,
            score = result.score,
            "alert delivered to slack"
        );
        Ok(receipt)
    }

    async fn deliver_error(&self, source_name: &str, message: &str) -> Result<(), NotifyError> {
        self.post(format::error_alert(source_name, message)).await?;
        Ok(())
    }

    async fn send_test(&self) -> Result<String, NotifyError> {
        self.post(format::test_message()).await
    }
}
