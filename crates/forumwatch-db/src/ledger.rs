//! The dedup ledger handle and its per-item claim locks.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use sqlx::SqlitePool;
use tokio::sync::OwnedMutexGuard;

use forumwatch_core::{ContentItem, ItemId, ItemKind, NaturalKey};

use crate::managed::{self, DisabledItemRow, UserKeywordRow, UserSourceRow};
use crate::seen::{self, LedgerStats, NotificationRow, SeenItemRow};
use crate::{connect_pool, run_migrations, LedgerError, PoolConfig};

type ClaimMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Durable record of seen and notified items plus runtime administration
/// state. Cloning shares the pool and the claim table.
#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
    claims: Arc<ClaimMap>,
}

/// Exclusive in-process claim on one item id. Released on drop.
pub struct ClaimGuard {
    item_id: String,
    claims: Arc<ClaimMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        let mut claims = self.claims.lock();
        drop(self.guard.take());
        // Only the map's own reference left: nobody holds or waits on it.
        if claims
            .get(&self.item_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            claims.remove(&self.item_id);
        }
    }
}

impl Ledger {
    /// Opens the ledger file at `path`, creating it and its parent directory
    /// if needed, and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the file cannot be opened or migrated.
    pub async fn open(path: &Path, config: PoolConfig) -> Result<Self, LedgerError> {
        let pool = connect_pool(path, config).await?;
        run_migrations(&pool).await?;
        tracing::info!(path = %path.display(), "ledger opened");
        Ok(Self::from_pool(pool))
    }

    /// Wraps an already-migrated pool.
    #[must_use]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            claims: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Waits for, then takes, the in-process claim on `item_id`. Holders of
    /// the claim are serialized; distinct ids never contend.
    pub async fn claim(&self, item_id: &ItemId) -> ClaimGuard {
        let lock = {
            let mut claims = self.claims.lock();
            Arc::clone(claims.entry(item_id.as_str().to_owned()).or_default())
        };
        let guard = lock.lock_owned().await;
        ClaimGuard {
            item_id: item_id.as_str().to_owned(),
            claims: Arc::clone(&self.claims),
            guard: Some(guard),
        }
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Sqlx`] if the query fails.
    pub async fn should_notify(&self, item_id: &ItemId) -> Result<bool, LedgerError> {
        seen::should_notify(&self.pool, item_id.as_str()).await
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Sqlx`] if the upsert fails.
    pub async fn mark_seen(&self, item: &ContentItem, score: f64) -> Result<(), LedgerError> {
        seen::mark_seen(&self.pool, item, score).await
    }

    /// Returns `false` if the item had already been notified.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if serialization or the transaction fails.
    pub async fn mark_notified(
        &self,
        item: &ContentItem,
        score: f64,
        keywords: &[String],
        receipt: &str,
    ) -> Result<bool, LedgerError> {
        let recorded = seen::mark_notified(&self.pool, item, score, keywords, receipt).await?;
        if recorded {
            tracing::info!(item_id = %item.id, source = %item.source, score, "notification recorded");
        } else {
            tracing::debug!(item_id = %item.id, "item already notified; nothing recorded");
        }
        Ok(recorded)
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Sqlx`] if the query fails.
    pub async fn get_seen_item(&self, item_id: &ItemId) -> Result<Option<SeenItemRow>, LedgerError> {
        seen::get_seen_item(&self.pool, item_id.as_str()).await
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Sqlx`] if the query fails.
    pub async fn list_notifications(
        &self,
        item_id: &ItemId,
    ) -> Result<Vec<NotificationRow>, LedgerError> {
        seen::list_notifications(&self.pool, item_id.as_str()).await
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Sqlx`] if the query fails.
    pub async fn get_stats(&self) -> Result<LedgerStats, LedgerError> {
        seen::get_stats(&self.pool).await
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Sqlx`] if the insert fails.
    pub async fn disable_item(&self, key: &NaturalKey, disabled_by: &str) -> Result<(), LedgerError> {
        managed::disable_item(&self.pool, key, disabled_by).await?;
        tracing::info!(key = %key, disabled_by, "built-in item disabled");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Sqlx`] if the delete fails.
    pub async fn enable_item(&self, key: &NaturalKey) -> Result<bool, LedgerError> {
        let was_disabled = managed::enable_item(&self.pool, key).await?;
        tracing::info!(key = %key, was_disabled, "built-in item enabled");
        Ok(was_disabled)
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Sqlx`] if the query fails.
    pub async fn list_disabled_items(
        &self,
        kind: ItemKind,
    ) -> Result<Vec<DisabledItemRow>, LedgerError> {
        managed::list_disabled_items(&self.pool, kind).await
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Sqlx`] if the insert fails.
    pub async fn add_user_keyword(
        &self,
        group: &str,
        pattern: &str,
        added_by: &str,
    ) -> Result<i64, LedgerError> {
        let id = managed::add_user_keyword(&self.pool, group, pattern, added_by).await?;
        tracing::info!(id, group, pattern, "user keyword added");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Sqlx`] if the delete fails.
    pub async fn remove_user_keyword(&self, id: i64) -> Result<bool, LedgerError> {
        let removed = managed::remove_user_keyword(&self.pool, id).await?;
        tracing::info!(id, removed, "user keyword removed");
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Sqlx`] if the query fails.
    pub async fn list_user_keywords(&self) -> Result<Vec<UserKeywordRow>, LedgerError> {
        managed::list_user_keywords(&self.pool).await
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Sqlx`] if the insert fails.
    pub async fn add_user_source(
        &self,
        name: &str,
        url: &str,
        kind: &str,
        added_by: &str,
    ) -> Result<i64, LedgerError> {
        let id = managed::add_user_source(&self.pool, name, url, kind, added_by).await?;
        tracing::info!(id, name, url, kind, "user source added");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Sqlx`] if the delete fails.
    pub async fn remove_user_source(&self, id: i64) -> Result<bool, LedgerError> {
        let removed = managed::remove_user_source(&self.pool, id).await?;
        tracing::info!(id, removed, "user source removed");
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Sqlx`] if the query fails.
    pub async fn list_user_sources(&self) -> Result<Vec<UserSourceRow>, LedgerError> {
        managed::list_user_sources(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn ledger_without_pool() -> Ledger {
        // The claim table never touches the pool; a lazy pool never connects.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .connect_lazy("sqlite::memory:")
            .unwrap();
        Ledger::from_pool(pool)
    }

    #[tokio::test]
    async fn claim_serializes_same_item() {
        let ledger = ledger_without_pool();
        let id = ItemId::new("forum", "1");

        let first = ledger.claim(&id).await;
        let second = tokio::time::timeout(Duration::from_millis(50), ledger.claim(&id)).await;
        assert!(second.is_err(), "second claim must wait for the first");

        drop(first);
        let second = tokio::time::timeout(Duration::from_millis(50), ledger.claim(&id)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn claims_on_distinct_items_do_not_contend() {
        let ledger = ledger_without_pool();
        let _a = ledger.claim(&ItemId::new("forum", "1")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(50),
            ledger.claim(&ItemId::new("forum", "2")),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn released_claims_are_pruned() {
        let ledger = ledger_without_pool();
        let guard = ledger.claim(&ItemId::new("forum", "1")).await;
        assert_eq!(ledger.claims.lock().len(), 1);
        drop(guard);
        assert!(ledger.claims.lock().is_empty());
    }
}
