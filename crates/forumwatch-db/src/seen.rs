//! Database operations for `seen_items` and `notification_log`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use forumwatch_core::ContentItem;

use crate::LedgerError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `seen_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SeenItemRow {
    pub item_id: String,
    pub source: String,
    pub title: String,
    pub url: String,
    /// Running maximum of every score this item has been observed with.
    pub detection_score: f64,
    pub first_seen_at: DateTime<Utc>,
    pub notified_at: Option<DateTime<Utc>>,
    /// JSON array of matched substrings, set when the item is notified.
    pub keywords_matched: Option<String>,
}

/// A row from the append-only `notification_log` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub item_id: String,
    pub source: String,
    pub sent_at: DateTime<Utc>,
    pub delivery_receipt: String,
    pub score: f64,
}

/// Aggregate counts over the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerStats {
    pub total_seen: i64,
    pub total_notified: i64,
    pub total_notifications: i64,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// True iff `item_id` has never been notified.
///
/// # Errors
///
/// Returns [`LedgerError::Sqlx`] if the query fails.
pub async fn should_notify(pool: &SqlitePool, item_id: &str) -> Result<bool, LedgerError> {
    let notified: Option<Option<DateTime<Utc>>> =
        sqlx::query_scalar("SELECT notified_at FROM seen_items WHERE item_id = ?1")
            .bind(item_id)
            .fetch_optional(pool)
            .await?;

    Ok(!matches!(notified, Some(Some(_))))
}

/// Records an observation of `item`. On an existing row only the score moves,
/// and only upwards.
///
/// # Errors
///
/// Returns [`LedgerError::Sqlx`] if the upsert fails.
pub async fn mark_seen(pool: &SqlitePool, item: &ContentItem, score: f64) -> Result<(), LedgerError> {
    sqlx::query(
        "INSERT INTO seen_items (item_id, source, title, url, detection_score, first_seen_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         ON CONFLICT(item_id) DO UPDATE SET \
             detection_score = MAX(seen_items.detection_score, excluded.detection_score)",
    )
    .bind(item.id.as_str())
    .bind(&item.source)
    .bind(&item.title)
    .bind(&item.url)
    .bind(score)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Marks `item` as notified and appends one `notification_log` row, in one
/// transaction.
///
/// The stored score becomes the score that triggered the alert, replacing any
/// higher score recorded while the item stayed below the threshold.
///
/// The update only applies while `notified_at IS NULL`. Returns `false`, having
/// written nothing, if the item was already notified.
///
/// # Errors
///
/// Returns [`LedgerError::Serialize`] if `keywords` cannot be encoded, or
/// [`LedgerError::Sqlx`] if any statement or the commit fails.
pub async fn mark_notified(
    pool: &SqlitePool,
    item: &ContentItem,
    score: f64,
    keywords: &[String],
    receipt: &str,
) -> Result<bool, LedgerError> {
    let keywords_json = serde_json::to_string(keywords)?;
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO seen_items \
             (item_id, source, title, url, detection_score, first_seen_at, notified_at, keywords_matched) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7) \
         ON CONFLICT(item_id) DO UPDATE SET \
             notified_at = excluded.notified_at, \
             detection_score = excluded.detection_score, \
             keywords_matched = excluded.keywords_matched \
         WHERE seen_items.notified_at IS NULL",
    )
    .bind(item.id.as_str())
    .bind(&item.source)
    .bind(&item.title)
    .bind(&item.url)
    .bind(score)
    .bind(now)
    .bind(&keywords_json)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO notification_log (item_id, source, sent_at, delivery_receipt, score) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(item.id.as_str())
    .bind(&item.source)
    .bind(now)
    .bind(receipt)
    .bind(score)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

/// Fetches one `seen_items` row.
///
/// # Errors
///
/// Returns [`LedgerError::Sqlx`] if the query fails.
pub async fn get_seen_item(
    pool: &SqlitePool,
    item_id: &str,
) -> Result<Option<SeenItemRow>, LedgerError> {
    let row = sqlx::query_as::<_, SeenItemRow>(
        "SELECT item_id, source, title, url, detection_score, first_seen_at, \
                notified_at, keywords_matched \
         FROM seen_items WHERE item_id = ?1",
    )
    .bind(item_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Notification history for one item, oldest first.
///
/// # Errors
///
/// Returns [`LedgerError::Sqlx`] if the query fails.
pub async fn list_notifications(
    pool: &SqlitePool,
    item_id: &str,
) -> Result<Vec<NotificationRow>, LedgerError> {
    let rows = sqlx::query_as::<_, NotificationRow>(
        "SELECT id, item_id, source, sent_at, delivery_receipt, score \
         FROM notification_log WHERE item_id = ?1 ORDER BY id",
    )
    .bind(item_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`LedgerError::Sqlx`] if the query fails.
pub async fn get_stats(pool: &SqlitePool) -> Result<LedgerStats, LedgerError> {
    let (total_seen, total_notified, total_notifications): (i64, i64, i64) = sqlx::query_as(
        "SELECT \
             (SELECT COUNT(*) FROM seen_items), \
             (SELECT COUNT(*) FROM seen_items WHERE notified_at IS NOT NULL), \
             (SELECT COUNT(*) FROM notification_log)",
    )
    .fetch_one(pool)
    .await?;

    Ok(LedgerStats {
        total_seen,
        total_notified,
        total_notifications,
    })
}
