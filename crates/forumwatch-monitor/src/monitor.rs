use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use forumwatch_core::{ItemKind, KeywordMap, MonitorFile, MonitoringSettings, NaturalKey, SourceConfig};
use forumwatch_db::{Ledger, LedgerStats};
use forumwatch_fetch::{FetchGate, GateConfig};
use forumwatch_notify::{Notifier, NotifyError};
use forumwatch_scoring::ScoringEngine;
use forumwatch_sources::{Source, SourceError, SourceRegistry};

use crate::error::MonitorError;

/// A built source together with the configuration it was built from, so
/// reconciliation can keep instances whose configuration did not change.
#[derive(Clone)]
pub(crate) struct ActiveSource {
    pub(crate) config: SourceConfig,
    pub(crate) source: Arc<dyn Source>,
}

/// Owns every runtime component and keeps the in-memory keyword and source
/// sets consistent with the monitor file plus the ledger's durable state.
pub struct Monitor {
    pub(crate) file: MonitorFile,
    pub(crate) gate: Arc<FetchGate>,
    pub(crate) engine: ScoringEngine,
    pub(crate) ledger: Ledger,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) registry: SourceRegistry,
    pub(crate) dry_run: bool,
    sources: RwLock<Arc<Vec<ActiveSource>>>,
}

impl Monitor {
    /// Builds the monitor. Sources are not built until the first
    /// [`Monitor::reconcile`].
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Source`] if an enabled built-in source names a
    /// kind the registry does not know, or [`MonitorError::Fetch`] if the HTTP
    /// client cannot be built.
    pub fn new(
        file: MonitorFile,
        ledger: Ledger,
        notifier: Arc<dyn Notifier>,
        registry: SourceRegistry,
    ) -> Result<Self, MonitorError> {
        if let Some(bad) = file
            .sources
            .iter()
            .find(|s| s.enabled && !registry.contains(&s.kind))
        {
            return Err(SourceError::UnknownKind {
                kind: bad.kind.clone(),
                name: bad.name.clone(),
                available: registry.kinds().join(", "),
            }
            .into());
        }

        let gate = Arc::new(FetchGate::new(&GateConfig::from_settings(&file.monitoring))?);
        let engine = ScoringEngine::new(&file.keywords, file.monitoring.detection_threshold);

        Ok(Self {
            file,
            gate,
            engine,
            ledger,
            notifier,
            registry,
            dry_run: false,
            sources: RwLock::new(Arc::new(Vec::new())),
        })
    }

    /// In dry-run mode alerts still reach the notifier, but the ledger only
    /// records the items as seen and never as notified.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &MonitoringSettings {
        &self.file.monitoring
    }

    #[must_use]
    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.file.monitoring.poll_interval_secs)
    }

    /// Names of the sources polled by the next cycle.
    #[must_use]
    pub fn active_source_names(&self) -> Vec<String> {
        self.active_sources()
            .iter()
            .map(|s| s.config.name.clone())
            .collect()
    }

    pub(crate) fn active_sources(&self) -> Arc<Vec<ActiveSource>> {
        Arc::clone(&self.sources.read())
    }

    /// # Errors
    ///
    /// Returns [`MonitorError::Ledger`] if the counts cannot be read.
    pub async fn stats(&self) -> Result<LedgerStats, MonitorError> {
        Ok(self.ledger.get_stats().await?)
    }

    /// # Errors
    ///
    /// Returns the notifier's error if the test message cannot be sent.
    pub async fn send_test(&self) -> Result<String, NotifyError> {
        self.notifier.send_test().await
    }

    /// Recomputes the active keyword and source sets from the monitor file
    /// and the ledger, and swaps them in.
    ///
    /// Active keywords are built-ins that are not disabled plus every
    /// user-owned keyword. Active sources are enabled built-ins that are not
    /// disabled plus every user-owned source.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Ledger`] if the ledger cannot be read.
    pub async fn reconcile(&self) -> Result<(), MonitorError> {
        let keywords = self.desired_keywords().await?;
        self.engine.set_keywords(&keywords);

        let configs = self.desired_sources().await?;
        let previous = self.active_sources();
        let mut active = Vec::with_capacity(configs.len());
        for config in configs {
            if let Some(existing) = previous.iter().find(|s| s.config == config) {
                active.push(existing.clone());
                continue;
            }
            match self.registry.build(&config, Arc::clone(&self.gate)) {
                Ok(source) => {
                    tracing::info!(source = %config.name, url = %config.url, kind = %config.kind, "source registered");
                    active.push(ActiveSource { config, source });
                }
                Err(e) => {
                    tracing::warn!(source = %config.name, error = %e, "skipping source");
                }
            }
        }

        tracing::debug!(
            keyword_groups = keywords.len(),
            sources = active.len(),
            "reconciled active sets"
        );
        *self.sources.write() = Arc::new(active);
        Ok(())
    }

    pub(crate) async fn disabled_keys(&self, kind: ItemKind) -> Result<HashSet<String>, MonitorError> {
        Ok(self
            .ledger
            .list_disabled_items(kind)
            .await?
            .into_iter()
            .map(|row| row.item_key)
            .collect())
    }

    async fn desired_keywords(&self) -> Result<KeywordMap, MonitorError> {
        let disabled = self.disabled_keys(ItemKind::Keyword).await?;
        let mut keywords = KeywordMap::new();

        for (group, patterns) in &self.file.keywords {
            for pattern in patterns {
                if disabled.contains(&NaturalKey::keyword(group, pattern).item_key()) {
                    continue;
                }
                push_keyword(&mut keywords, group, pattern);
            }
        }
        for row in self.ledger.list_user_keywords().await? {
            push_keyword(&mut keywords, &row.group_name, &row.pattern);
        }

        Ok(keywords)
    }

    async fn desired_sources(&self) -> Result<Vec<SourceConfig>, MonitorError> {
        let disabled = self.disabled_keys(ItemKind::Source).await?;
        let mut configs: Vec<SourceConfig> = self
            .file
            .sources
            .iter()
            .filter(|s| s.enabled && !disabled.contains(&s.name))
            .cloned()
            .collect();

        for row in self.ledger.list_user_sources().await? {
            if configs.iter().any(|c| c.name.eq_ignore_ascii_case(&row.name)) {
                tracing::warn!(source = %row.name, id = row.id, "user source shadows an existing name; skipping");
                continue;
            }
            configs.push(SourceConfig {
                name: row.name,
                url: row.url,
                kind: row.kind,
                enabled: true,
                categories: Vec::new(),
            });
        }

        Ok(configs)
    }
}

/// Appends without deduplicating: a pattern listed twice scores twice.
fn push_keyword(keywords: &mut KeywordMap, group: &str, pattern: &str) {
    keywords
        .entry(group.to_owned())
        .or_default()
        .push(pattern.to_owned());
}
