//! Notifier that only logs, for `--dry-run`.

use async_trait::async_trait;

use forumwatch_core::DetectionResult;

use crate::error::NotifyError;
use crate::Notifier;

/// Receipt recorded for alerts that were only logged.
pub const DRY_RUN_RECEIPT: &str = "dry-run";

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, result: &DetectionResult) -> Result<String, NotifyError> {
        tracing::info!(
            item_id = %result.item.id,
            source = %result.item.source,
            title = %result.item.title,
            url = %result.item.url,
            score = result.score,
            keywords = ?result.matched_texts(),
            "alert (dry run)"
        );
        Ok(DRY_RUN_RECEIPT.to_owned())
    }

    async fn deliver_error(&self, source_name: &str, message: &str) -> Result<(), NotifyError> {
        tracing::warn!(source = source_name, error = message, "source error (dry run)");
        Ok(())
    }

    async fn send_test(&self) -> Result<String, NotifyError> {
        tracing::info!("test notification (dry run)");
        Ok(DRY_RUN_RECEIPT.to_owned())
    }
}
