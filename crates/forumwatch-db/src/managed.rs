//! Database operations for runtime administration: `managed_keywords`,
//! `managed_sources` and `disabled_items`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use forumwatch_core::{ItemKind, NaturalKey};

use crate::LedgerError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A user-owned keyword from `managed_keywords`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserKeywordRow {
    pub id: i64,
    pub group_name: String,
    pub pattern: String,
    pub added_by: String,
    pub added_at: DateTime<Utc>,
    pub active: bool,
}

/// A user-owned source from `managed_sources`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserSourceRow {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub kind: String,
    pub enabled: bool,
    pub added_by: String,
    pub added_at: DateTime<Utc>,
}

/// A disabled built-in item. Existence of the row is what disables it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DisabledItemRow {
    pub kind: String,
    pub item_key: String,
    pub disabled_by: String,
    pub disabled_at: DateTime<Utc>,
}

impl DisabledItemRow {
    /// Decodes the stored kind and key. `None` for rows this build cannot
    /// interpret.
    #[must_use]
    pub fn natural_key(&self) -> Option<NaturalKey> {
        let kind = self.kind.parse::<ItemKind>().ok()?;
        NaturalKey::parse(kind, &self.item_key)
    }
}

// ---------------------------------------------------------------------------
// disabled_items
// ---------------------------------------------------------------------------

/// Disables a built-in item. Disabling an already-disabled item is a no-op
/// that keeps the original `disabled_by` and `disabled_at`.
///
/// # Errors
///
/// Returns [`LedgerError::Sqlx`] if the insert fails.
pub async fn disable_item(
    pool: &SqlitePool,
    key: &NaturalKey,
    disabled_by: &str,
) -> Result<(), LedgerError> {
    sqlx::query(
        "INSERT INTO disabled_items (kind, item_key, disabled_by, disabled_at) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(kind, item_key) DO NOTHING",
    )
    .bind(key.kind().as_str())
    .bind(key.item_key())
    .bind(disabled_by)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Re-enables a built-in item. Returns whether it had been disabled.
///
/// # Errors
///
/// Returns [`LedgerError::Sqlx`] if the delete fails.
pub async fn enable_item(pool: &SqlitePool, key: &NaturalKey) -> Result<bool, LedgerError> {
    let result = sqlx::query("DELETE FROM disabled_items WHERE kind = ?1 AND item_key = ?2")
        .bind(key.kind().as_str())
        .bind(key.item_key())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// # Errors
///
/// Returns [`LedgerError::Sqlx`] if the query fails.
pub async fn list_disabled_items(
    pool: &SqlitePool,
    kind: ItemKind,
) -> Result<Vec<DisabledItemRow>, LedgerError> {
    let rows = sqlx::query_as::<_, DisabledItemRow>(
        "SELECT kind, item_key, disabled_by, disabled_at \
         FROM disabled_items WHERE kind = ?1 ORDER BY item_key",
    )
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// managed_keywords
// ---------------------------------------------------------------------------

/// Inserts a user-owned keyword and returns its surrogate id.
///
/// # Errors
///
/// Returns [`LedgerError::Sqlx`] if the insert fails.
pub async fn add_user_keyword(
    pool: &SqlitePool,
    group: &str,
    pattern: &str,
    added_by: &str,
) -> Result<i64, LedgerError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO managed_keywords (group_name, pattern, added_by, added_at, active) \
         VALUES (?1, ?2, ?3, ?4, 1) \
         RETURNING id",
    )
    .bind(group)
    .bind(pattern)
    .bind(added_by)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Permanently deletes a user-owned keyword. Returns whether a row existed.
///
/// # Errors
///
/// Returns [`LedgerError::Sqlx`] if the delete fails.
pub async fn remove_user_keyword(pool: &SqlitePool, id: i64) -> Result<bool, LedgerError> {
    let result = sqlx::query("DELETE FROM managed_keywords WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Active user-owned keywords, oldest first.
///
/// # Errors
///
/// Returns [`LedgerError::Sqlx`] if the query fails.
pub async fn list_user_keywords(pool: &SqlitePool) -> Result<Vec<UserKeywordRow>, LedgerError> {
    let rows = sqlx::query_as::<_, UserKeywordRow>(
        "SELECT id, group_name, pattern, added_by, added_at, active \
         FROM managed_keywords WHERE active = 1 ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// managed_sources
// ---------------------------------------------------------------------------

/// Inserts a user-owned source and returns its surrogate id.
///
/// # Errors
///
/// Returns [`LedgerError::Sqlx`] if the insert fails.
pub async fn add_user_source(
    pool: &SqlitePool,
    name: &str,
    url: &str,
    kind: &str,
    added_by: &str,
) -> Result<i64, LedgerError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO managed_sources (name, url, kind, enabled, added_by, added_at) \
         VALUES (?1, ?2, ?3, 1, ?4, ?5) \
         RETURNING id",
    )
    .bind(name)
    .bind(url)
    .bind(kind)
    .bind(added_by)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Permanently deletes a user-owned source. Returns whether a row existed.
///
/// # Errors
///
/// Returns [`LedgerError::Sqlx`] if the delete fails.
pub async fn remove_user_source(pool: &SqlitePool, id: i64) -> Result<bool, LedgerError> {
    let result = sqlx::query("DELETE FROM managed_sources WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Enabled user-owned sources, oldest first.
///
/// # Errors
///
/// Returns [`LedgerError::Sqlx`] if the query fails.
pub async fn list_user_sources(pool: &SqlitePool) -> Result<Vec<UserSourceRow>, LedgerError> {
    let rows = sqlx::query_as::<_, UserSourceRow>(
        "SELECT id, name, url, kind, enabled, added_by, added_at \
         FROM managed_sources WHERE enabled = 1 ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled(kind: &str, key: &str) -> DisabledItemRow {
        DisabledItemRow {
            kind: kind.to_string(),
            item_key: key.to_string(),
            disabled_by: "ops".to_string(),
            disabled_at: Utc::now(),
        }
    }

    #[test]
    fn disabled_row_decodes_keyword_key() {
        assert_eq!(
            disabled("keyword", "governance:treasury").natural_key(),
            Some(NaturalKey::keyword("governance", "treasury"))
        );
    }

    #[test]
    fn disabled_row_with_unknown_kind_is_ignored() {
        assert_eq!(disabled("forum", "arbitrum").natural_key(), None);
    }
}
