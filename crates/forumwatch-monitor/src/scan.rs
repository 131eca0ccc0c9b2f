use forumwatch_core::validate_group_name;
use forumwatch_db::Ledger;
use forumwatch_scoring::ScoringEngine;

use crate::cycle::{DetailFetch, Pass};
use crate::error::MonitorError;
use crate::monitor::Monitor;
use crate::report::CycleReport;

/// Threshold of ad-hoc single-keyword backfills: any single match triggers.
const BACKFILL_THRESHOLD: f64 = 1.0;

const MINUTES_PER_DAY: u64 = 24 * 60;

impl Monitor {
    /// Scans the last `days` of every active source against `history`, a
    /// ledger kept apart from live dedup state.
    ///
    /// With `keyword = Some((group, pattern))` only that pattern is scored
    /// (threshold 1.0), which backfills alerts for a newly added keyword.
    /// Otherwise the live keyword set is used. Details are always fetched.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Pattern`] or [`MonitorError::Config`] for an
    /// invalid backfill keyword, and [`MonitorError::Ledger`] on persistence
    /// failures.
    pub async fn scan_history(
        &self,
        days: u64,
        keyword: Option<(&str, &str)>,
        history: &Ledger,
    ) -> Result<CycleReport, MonitorError> {
        let backfill = match keyword {
            Some((group, pattern)) => {
                validate_group_name(group)?;
                Some(ScoringEngine::single(group, pattern, BACKFILL_THRESHOLD)?)
            }
            None => None,
        };

        self.reconcile().await?;
        let sources = self.active_sources();
        let since_minutes = days.saturating_mul(MINUTES_PER_DAY);

        tracing::info!(
            days,
            since_minutes,
            sources = sources.len(),
            backfill = ?keyword,
            "historical scan started"
        );

        let pass = Pass {
            engine: backfill.as_ref().unwrap_or(&self.engine),
            ledger: history,
            notifier: self.notifier.as_ref(),
            details: DetailFetch::Always,
            since_minutes,
            dry_run: self.dry_run,
        };
        let report = pass.run(&sources).await?;

        tracing::info!(
            items_checked = report.items_checked,
            alerts_sent = report.alerts_sent,
            "historical scan complete"
        );
        Ok(report)
    }
}
