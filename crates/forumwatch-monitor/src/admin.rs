//! Runtime administration of keywords and sources.
//!
//! Built-in items (from the monitor file) can only be disabled and re-enabled;
//! user-owned items (from the ledger) can only be added and removed. Every
//! mutation is followed by a reconcile so the running sets match the ledger.

use forumwatch_core::{validate_group_name, ItemKind, ItemOwner, NaturalKey};
use forumwatch_scoring::ScoringEngine;

use crate::error::MonitorError;
use crate::monitor::Monitor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedKeyword {
    pub owner: ItemOwner,
    pub group: String,
    pub pattern: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedSource {
    pub owner: ItemOwner,
    pub name: String,
    pub url: String,
    pub kind: String,
    pub active: bool,
}

impl Monitor {
    fn built_in_keyword(&self, group: &str, pattern: &str) -> Result<NaturalKey, MonitorError> {
        let key = NaturalKey::keyword(group, pattern);
        let exists = self
            .file
            .keywords
            .get(group)
            .is_some_and(|patterns| patterns.iter().any(|p| p == pattern));
        if exists {
            Ok(key)
        } else {
            Err(MonitorError::UnknownItem(key))
        }
    }

    /// Source names match case-insensitively, as they do when a user source
    /// is checked against the built-ins. The key carries the configured name.
    fn built_in_source(&self, name: &str) -> Result<NaturalKey, MonitorError> {
        self.file
            .sources
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| NaturalKey::source(s.name.as_str()))
            .ok_or_else(|| MonitorError::UnknownItem(NaturalKey::source(name)))
    }

    /// # Errors
    ///
    /// Returns [`MonitorError::UnknownItem`] if the keyword is not built in.
    pub async fn disable_keyword(
        &self,
        group: &str,
        pattern: &str,
        disabled_by: &str,
    ) -> Result<(), MonitorError> {
        let key = self.built_in_keyword(group, pattern)?;
        self.ledger.disable_item(&key, disabled_by).await?;
        self.reconcile().await
    }

    /// Returns whether the keyword had been disabled.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::UnknownItem`] if the keyword is not built in.
    pub async fn enable_keyword(&self, group: &str, pattern: &str) -> Result<bool, MonitorError> {
        let key = self.built_in_keyword(group, pattern)?;
        let was_disabled = self.ledger.enable_item(&key).await?;
        self.reconcile().await?;
        Ok(was_disabled)
    }

    /// # Errors
    ///
    /// Returns [`MonitorError::UnknownItem`] if the source is not built in.
    pub async fn disable_source(&self, name: &str, disabled_by: &str) -> Result<(), MonitorError> {
        let key = self.built_in_source(name)?;
        self.ledger.disable_item(&key, disabled_by).await?;
        self.reconcile().await
    }

    /// Returns whether the source had been disabled.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::UnknownItem`] if the source is not built in.
    pub async fn enable_source(&self, name: &str) -> Result<bool, MonitorError> {
        let key = self.built_in_source(name)?;
        let was_disabled = self.ledger.enable_item(&key).await?;
        self.reconcile().await?;
        Ok(was_disabled)
    }

    /// Adds a user-owned keyword and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Config`] for an invalid group name or
    /// [`MonitorError::Pattern`] for a pattern that does not compile; nothing
    /// is stored in either case.
    pub async fn add_keyword(
        &self,
        group: &str,
        pattern: &str,
        added_by: &str,
    ) -> Result<i64, MonitorError> {
        validate_group_name(group)?;
        ScoringEngine::validate_pattern(pattern)?;
        let id = self.ledger.add_user_keyword(group, pattern, added_by).await?;
        self.reconcile().await?;
        Ok(id)
    }

    /// Permanently removes a user-owned keyword. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Ledger`] on persistence failures.
    pub async fn remove_keyword(&self, id: i64) -> Result<bool, MonitorError> {
        let removed = self.ledger.remove_user_keyword(id).await?;
        self.reconcile().await?;
        Ok(removed)
    }

    /// Adds a user-owned source and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidSource`] for a blank name or url or a
    /// name already in use, and [`MonitorError::Source`] for an unregistered
    /// kind.
    pub async fn add_source(
        &self,
        name: &str,
        url: &str,
        kind: &str,
        added_by: &str,
    ) -> Result<i64, MonitorError> {
        let name = name.trim();
        let url = url.trim();
        if name.is_empty() || url.is_empty() {
            return Err(MonitorError::InvalidSource(
                "name and url must be non-empty".to_string(),
            ));
        }
        if !self.registry.contains(kind) {
            return Err(forumwatch_sources::SourceError::UnknownKind {
                kind: kind.to_owned(),
                name: name.to_owned(),
                available: self.registry.kinds().join(", "),
            }
            .into());
        }
        let taken = self
            .file
            .sources
            .iter()
            .map(|s| s.name.clone())
            .chain(self.ledger.list_user_sources().await?.into_iter().map(|r| r.name))
            .any(|existing| existing.eq_ignore_ascii_case(name));
        if taken {
            return Err(MonitorError::InvalidSource(format!(
                "a source named '{name}' already exists"
            )));
        }

        let id = self.ledger.add_user_source(name, url, kind, added_by).await?;
        self.reconcile().await?;
        Ok(id)
    }

    /// Permanently removes a user-owned source. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Ledger`] on persistence failures.
    pub async fn remove_source(&self, id: i64) -> Result<bool, MonitorError> {
        let removed = self.ledger.remove_user_source(id).await?;
        self.reconcile().await?;
        Ok(removed)
    }

    /// Every built-in and user-owned keyword with its current state.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Ledger`] if the ledger cannot be read.
    pub async fn list_keywords(&self) -> Result<Vec<ManagedKeyword>, MonitorError> {
        let disabled = self.disabled_keys(ItemKind::Keyword).await?;
        let mut out = Vec::new();

        for (group, patterns) in &self.file.keywords {
            for pattern in patterns {
                let key = NaturalKey::keyword(group, pattern);
                out.push(ManagedKeyword {
                    active: !disabled.contains(&key.item_key()),
                    owner: ItemOwner::BuiltIn(key),
                    group: group.clone(),
                    pattern: pattern.clone(),
                });
            }
        }
        for row in self.ledger.list_user_keywords().await? {
            out.push(ManagedKeyword {
                owner: ItemOwner::UserOwned(row.id),
                group: row.group_name,
                pattern: row.pattern,
                active: row.active,
            });
        }

        Ok(out)
    }

    /// Every built-in and user-owned source with its current state.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Ledger`] if the ledger cannot be read.
    pub async fn list_sources(&self) -> Result<Vec<ManagedSource>, MonitorError> {
        let disabled = self.disabled_keys(ItemKind::Source).await?;
        let mut out: Vec<ManagedSource> = self
            .file
            .sources
            .iter()
            .map(|s| ManagedSource {
                owner: ItemOwner::BuiltIn(NaturalKey::source(&s.name)),
                name: s.name.clone(),
                url: s.url.clone(),
                kind: s.kind.clone(),
                active: s.enabled && !disabled.contains(&s.name),
            })
            .collect();

        for row in self.ledger.list_user_sources().await? {
            out.push(ManagedSource {
                owner: ItemOwner::UserOwned(row.id),
                name: row.name,
                url: row.url,
                kind: row.kind,
                active: row.enabled,
            });
        }

        Ok(out)
    }
}
