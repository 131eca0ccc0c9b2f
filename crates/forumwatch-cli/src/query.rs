//! Read-only report output.

use forumwatch_monitor::{CycleReport, Monitor};

pub(crate) fn print_report(report: &CycleReport) {
    println!("items checked:      {}", report.items_checked);
    println!("alerts sent:        {}", report.alerts_sent);
    println!("duplicates skipped: {}", report.duplicates_skipped);
    println!("delivery failures:  {}", report.delivery_failures);
    if !report.failed_sources.is_empty() {
        println!("failed sources:     {}", report.failed_sources.join(", "));
    }
}

/// # Errors
///
/// Returns an error if the ledger cannot be read.
pub(crate) async fn run_stats(monitor: &Monitor) -> anyhow::Result<()> {
    monitor.reconcile().await?;
    let stats = monitor.stats().await?;
    println!("items seen:         {}", stats.total_seen);
    println!("items notified:     {}", stats.total_notified);
    println!("notifications sent: {}", stats.total_notifications);

    let sources = monitor.list_sources().await?;
    let active = sources.iter().filter(|s| s.active).count();
    println!("active sources:     {active}/{}", sources.len());

    let keywords = monitor.engine().snapshot();
    println!(
        "active keywords:    {} in {} groups",
        keywords.pattern_count(),
        keywords.group_count()
    );
    Ok(())
}
