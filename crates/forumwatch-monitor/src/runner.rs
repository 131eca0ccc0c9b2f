use tokio_util::sync::CancellationToken;

use crate::error::MonitorError;
use crate::monitor::Monitor;

impl Monitor {
    /// Runs cycles every `poll_interval_secs` until `cancel` fires.
    ///
    /// Sends a test notification first; its failure is only logged.
    /// Cancellation is observed between cycles, never inside one.
    ///
    /// # Errors
    ///
    /// Returns the first [`MonitorError`] a cycle fails with; those are
    /// persistence failures and fatal.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), MonitorError> {
        match self.notifier.send_test().await {
            Ok(_) => tracing::info!("test notification sent"),
            Err(e) => tracing::error!(error = %e, "test notification failed"),
        }

        let interval = self.poll_interval();
        tracing::info!(interval_secs = interval.as_secs(), "monitor running");

        loop {
            if cancel.is_cancelled() {
                break;
            }
            self.run_cycle().await?;

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }

        tracing::info!("monitor stopped");
        Ok(())
    }
}
