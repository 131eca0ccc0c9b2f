/// Outcome counts of one polling cycle or historical scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub items_checked: usize,
    pub alerts_sent: usize,
    /// Triggered items that had already been notified.
    pub duplicates_skipped: usize,
    /// Triggered items whose delivery failed; they stay un-notified.
    pub delivery_failures: usize,
    /// Names of sources whose listing fetch failed.
    pub failed_sources: Vec<String>,
}

impl CycleReport {
    pub(crate) fn merge(&mut self, other: CycleReport) {
        self.items_checked += other.items_checked;
        self.alerts_sent += other.alerts_sent;
        self.duplicates_skipped += other.duplicates_skipped;
        self.delivery_failures += other.delivery_failures;
        self.failed_sources.extend(other.failed_sources);
    }
}
