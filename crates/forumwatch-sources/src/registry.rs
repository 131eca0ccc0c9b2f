//! Kind-keyed construction of [`Source`] implementations.

use std::collections::BTreeMap;
use std::sync::Arc;

use forumwatch_core::SourceConfig;
use forumwatch_fetch::FetchGate;

use crate::discourse::{self, DiscourseSource};
use crate::error::SourceError;
use crate::Source;

/// Builds a source from its configuration and the shared fetch gate.
pub type SourceFactory = Arc<dyn Fn(&SourceConfig, Arc<FetchGate>) -> Arc<dyn Source> + Send + Sync>;

/// Maps a source `kind` (the `type` field of a source entry) to the factory
/// that builds it. New forum software is supported by registering a factory,
/// not by extending a type hierarchy.
#[derive(Clone)]
pub struct SourceRegistry {
    factories: BTreeMap<String, SourceFactory>,
}

impl Default for SourceRegistry {
    /// A registry with every built-in kind registered.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(
            discourse::KIND,
            Arc::new(
                |config: &SourceConfig, gate: Arc<FetchGate>| -> Arc<dyn Source> {
                    Arc::new(DiscourseSource::new(config, gate))
                },
            ),
        );
        registry
    }
}

impl SourceRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) the factory for `kind`.
    pub fn register(&mut self, kind: &str, factory: SourceFactory) {
        self.factories.insert(kind.to_owned(), factory);
    }

    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds in sorted order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Builds the source described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnknownKind`] if no factory is registered for
    /// `config.kind`.
    pub fn build(
        &self,
        config: &SourceConfig,
        gate: Arc<FetchGate>,
    ) -> Result<Arc<dyn Source>, SourceError> {
        let factory = self
            .factories
            .get(&config.kind)
            .ok_or_else(|| SourceError::UnknownKind {
                kind: config.kind.clone(),
                name: config.name.clone(),
                available: self.kinds().join(", "),
            })?;
        Ok(factory(config, gate))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use forumwatch_fetch::GateConfig;

    use super::*;

    fn gate() -> Arc<FetchGate> {
        Arc::new(
            FetchGate::new(&GateConfig {
                requests_per_minute: 60,
                max_retries: 1,
                backoff_base: Duration::ZERO,
                default_retry_after: Duration::from_secs(1),
                timeout: Duration::from_secs(1),
                user_agent: "test".to_string(),
            })
            .unwrap(),
        )
    }

    fn config(kind: &str) -> SourceConfig {
        SourceConfig {
            name: "arbitrum".to_string(),
            url: "https://forum.arbitrum.foundation/".to_string(),
            kind: kind.to_string(),
            enabled: true,
            categories: Vec::new(),
        }
    }

    #[test]
    fn default_registry_builds_discourse() {
        let registry = SourceRegistry::default();
        let source = registry.build(&config("discourse"), gate()).unwrap();
        assert_eq!(source.name(), "arbitrum");
        assert_eq!(source.kind(), "discourse");
    }

    #[test]
    fn unknown_kind_lists_available_kinds() {
        let registry = SourceRegistry::default();
        let err = registry.build(&config("phpbb"), gate()).err().unwrap();
        match err {
            SourceError::UnknownKind {
                kind, available, ..
            } => {
                assert_eq!(kind, "phpbb");
                assert_eq!(available, "discourse");
            }
            other @ SourceError::Fetch { .. } => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn registered_factory_is_used() {
        let mut registry = SourceRegistry::empty();
        assert!(!registry.contains("discourse"));
        registry.register(
            "custom",
            Arc::new(
                |config: &SourceConfig, gate: Arc<FetchGate>| -> Arc<dyn Source> {
                    Arc::new(DiscourseSource::new(config, gate))
                },
            ),
        );
        assert!(registry.contains("custom"));
        assert_eq!(registry.kinds(), vec!["custom"]);
        assert!(registry.build(&config("custom"), gate()).is_ok());
    }
}
