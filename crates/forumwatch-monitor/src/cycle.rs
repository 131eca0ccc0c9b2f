//! One pass over the active sources: fetch, score, dedup, deliver.

use futures::future::join_all;

use forumwatch_core::ContentItem;
use forumwatch_db::Ledger;
use forumwatch_notify::Notifier;
use forumwatch_scoring::ScoringEngine;
use forumwatch_sources::Source;

use crate::error::MonitorError;
use crate::monitor::{ActiveSource, Monitor};
use crate::report::CycleReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DetailFetch {
    Never,
    /// Only for listing items that carry no body text.
    WhenBodyEmpty,
    Always,
}

/// The collaborators one pass runs against. Live cycles and historical scans
/// differ only in which engine and ledger they use.
pub(crate) struct Pass<'a> {
    pub(crate) engine: &'a ScoringEngine,
    pub(crate) ledger: &'a Ledger,
    pub(crate) notifier: &'a dyn Notifier,
    pub(crate) details: DetailFetch,
    pub(crate) since_minutes: u64,
    /// Alerts go through the notifier but the item is only marked seen, so a
    /// later live pass still delivers it.
    pub(crate) dry_run: bool,
}

impl Pass<'_> {
    /// Polls every source concurrently and merges their reports.
    ///
    /// A failing source is reported through the notifier and skipped; a
    /// ledger failure in any source aborts the whole pass.
    pub(crate) async fn run(&self, sources: &[ActiveSource]) -> Result<CycleReport, MonitorError> {
        let outcomes = join_all(sources.iter().map(|s| self.poll_source(s.source.as_ref()))).await;

        let mut report = CycleReport::default();
        for outcome in outcomes {
            report.merge(outcome?);
        }
        Ok(report)
    }

    async fn poll_source(&self, source: &dyn Source) -> Result<CycleReport, MonitorError> {
        let mut report = CycleReport::default();
        tracing::info!(source = source.name(), "checking source");

        let items = match source.fetch_recent(self.since_minutes).await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(source = source.name(), error = %e, "source fetch failed");
                if let Err(notify_err) = self
                    .notifier
                    .deliver_error(source.name(), &e.to_string())
                    .await
                {
                    tracing::warn!(source = source.name(), error = %notify_err, "error alert not delivered");
                }
                report.failed_sources.push(source.name().to_owned());
                return Ok(report);
            }
        };

        for item in items {
            self.process_item(source, item, &mut report).await?;
        }
        Ok(report)
    }

    async fn process_item(
        &self,
        source: &dyn Source,
        item: ContentItem,
        report: &mut CycleReport,
    ) -> Result<(), MonitorError> {
        let item = self.with_detail(source, item).await;
        let result = self.engine.analyze(&item);
        report.items_checked += 1;

        if !result.triggered {
            self.ledger.mark_seen(&item, result.score).await?;
            return Ok(());
        }

        let _claim = self.ledger.claim(&item.id).await;
        if !self.ledger.should_notify(&item.id).await? {
            tracing::debug!(item_id = %item.id, "already notified; skipping");
            report.duplicates_skipped += 1;
            return Ok(());
        }

        let receipt = match self.notifier.deliver(&result).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::error!(item_id = %item.id, error = %e, "alert delivery failed");
                report.delivery_failures += 1;
                return Ok(());
            }
        };

        if self.dry_run {
            self.ledger.mark_seen(&item, result.score).await?;
            report.alerts_sent += 1;
            tracing::info!(
                source = %item.source,
                item_id = %item.id,
                score = result.score,
                "dry run alert; not recorded as notified"
            );
            return Ok(());
        }

        let recorded = self
            .ledger
            .mark_notified(&item, result.score, &result.matched_texts(), &receipt)
            .await?;
        if recorded {
            report.alerts_sent += 1;
            tracing::info!(
                source = %item.source,
                item_id = %item.id,
                score = result.score,
                "alert sent"
            );
        } else {
            report.duplicates_skipped += 1;
        }
        Ok(())
    }

    /// Replaces a listing item with its full detail when the policy asks for
    /// it. Any failure keeps the listing item.
    async fn with_detail(&self, source: &dyn Source, item: ContentItem) -> ContentItem {
        let wanted = match self.details {
            DetailFetch::Never => false,
            DetailFetch::WhenBodyEmpty => item.body.is_empty(),
            DetailFetch::Always => true,
        };
        if !wanted {
            return item;
        }

        match source.fetch_detail(&item.topic_id).await {
            Ok(Some(detail)) => detail,
            Ok(None) => {
                tracing::debug!(item_id = %item.id, "topic detail not found; using listing");
                item
            }
            Err(e) => {
                tracing::warn!(item_id = %item.id, error = %e, "topic detail fetch failed; using listing");
                item
            }
        }
    }
}

impl Monitor {
    /// Runs one monitoring cycle: reconcile, then poll every active source.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Ledger`] on any persistence failure. Source and
    /// delivery failures are counted in the report instead.
    pub async fn run_cycle(&self) -> Result<CycleReport, MonitorError> {
        self.reconcile().await?;
        let sources = self.active_sources();

        let pass = Pass {
            engine: &self.engine,
            ledger: &self.ledger,
            notifier: self.notifier.as_ref(),
            details: if self.file.monitoring.fetch_details {
                DetailFetch::WhenBodyEmpty
            } else {
                DetailFetch::Never
            },
            since_minutes: self.file.monitoring.since_minutes,
            dry_run: self.dry_run,
        };
        let report = pass.run(&sources).await?;

        let stats = self.ledger.get_stats().await?;
        tracing::info!(
            items_checked = report.items_checked,
            alerts_sent = report.alerts_sent,
            duplicates_skipped = report.duplicates_skipped,
            delivery_failures = report.delivery_failures,
            failed_sources = report.failed_sources.len(),
            total_seen = stats.total_seen,
            total_notified = stats.total_notified,
            "cycle complete"
        );
        Ok(report)
    }
}
