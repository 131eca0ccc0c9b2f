//! Discourse forums, read through their public unauthenticated JSON API.

mod types;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;

use forumwatch_core::{ContentItem, ItemId, SourceConfig};
use forumwatch_fetch::{FetchError, FetchGate};

use crate::error::SourceError;
use crate::html::strip_html;
use crate::Source;

use self::types::{CategoriesResponse, LatestResponse, PostsResponse, Topic};

pub const KIND: &str = "discourse";

const UNKNOWN_CATEGORY: &str = "Unknown";
const UNKNOWN_AUTHOR: &str = "unknown";

pub struct DiscourseSource {
    name: String,
    base_url: String,
    /// Lowercased category allow-list; empty admits every category.
    categories: Vec<String>,
    gate: Arc<FetchGate>,
    /// Category id → name, loaded once on first successful fetch.
    category_names: RwLock<HashMap<u64, String>>,
}

impl DiscourseSource {
    #[must_use]
    pub fn new(config: &SourceConfig, gate: Arc<FetchGate>) -> Self {
        Self {
            name: config.name.clone(),
            base_url: config.url.trim_end_matches('/').to_owned(),
            categories: config.categories.iter().map(|c| c.to_lowercase()).collect(),
            gate,
            category_names: RwLock::new(HashMap::new()),
        }
    }

    /// Populates the category cache. Failure is tolerated: items then carry
    /// the `"Unknown"` category and the load is retried on the next call.
    async fn ensure_categories(&self) {
        if !self.category_names.read().is_empty() {
            return;
        }

        let url = format!("{}/categories.json", self.base_url);
        match self.gate.get_json::<CategoriesResponse>(&url, &[]).await {
            Ok(response) => {
                let names: HashMap<u64, String> = response
                    .category_list
                    .categories
                    .into_iter()
                    .map(|c| (c.id, c.name))
                    .collect();
                tracing::info!(source = %self.name, count = names.len(), "categories loaded");
                *self.category_names.write() = names;
            }
            Err(e) => {
                tracing::warn!(source = %self.name, error = %e, "categories load failed");
            }
        }
    }

    fn category_name(&self, category_id: Option<u64>) -> String {
        category_id
            .and_then(|id| self.category_names.read().get(&id).cloned())
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_owned())
    }

    fn admits_category(&self, category: &str) -> bool {
        self.categories.is_empty() || self.categories.contains(&category.to_lowercase())
    }

    fn to_item(&self, topic: Topic, body: Option<String>) -> ContentItem {
        let topic_id = topic.id.to_string();
        let created_at = topic
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc));
        let body = body
            .filter(|b| !b.is_empty())
            .or_else(|| topic.excerpt.as_deref().map(strip_html))
            .unwrap_or_default();

        ContentItem {
            id: ItemId::new(&self.name, &topic_id),
            source: self.name.clone(),
            url: format!("{}/t/{}/{}", self.base_url, topic.slug, topic_id),
            category: self.category_name(topic.category_id),
            author: topic
                .last_poster_username
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_owned()),
            topic_id,
            title: topic.title,
            body,
            created_at,
            reply_count: topic.reply_count,
            like_count: topic.like_count,
        }
    }
}

#[async_trait]
impl Source for DiscourseSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        KIND
    }

    async fn fetch_recent(&self, since_minutes: u64) -> Result<Vec<ContentItem>, SourceError> {
        self.ensure_categories().await;

        let url = format!("{}/latest.json", self.base_url);
        let response: LatestResponse = self
            .gate
            .get_json(&url, &[("order", "created"), ("ascending", "false")])
            .await
            .map_err(|e| SourceError::fetch(&self.name, e))?;

        let cutoff = cutoff(Utc::now(), since_minutes);
        let fetched = response.topic_list.topics.len();
        let items: Vec<ContentItem> = response
            .topic_list
            .topics
            .into_iter()
            .map(|topic| self.to_item(topic, None))
            .filter(|item| item.created_at >= cutoff)
            .filter(|item| self.admits_category(&item.category))
            .collect();

        tracing::info!(
            source = %self.name,
            fetched,
            kept = items.len(),
            since_minutes,
            "topics fetched"
        );
        Ok(items)
    }

    async fn fetch_detail(&self, topic_id: &str) -> Result<Option<ContentItem>, SourceError> {
        self.ensure_categories().await;

        let posts_url = format!("{}/t/{topic_id}/posts.json", self.base_url);
        let posts: PostsResponse = match self.gate.get_json(&posts_url, &[]).await {
            Ok(posts) => posts,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(SourceError::fetch(&self.name, e)),
        };
        let body = posts
            .post_stream
            .posts
            .first()
            .map(|p| strip_html(&p.cooked));

        let topic_url = format!("{}/t/{topic_id}.json", self.base_url);
        let topic: Topic = match self.gate.get_json(&topic_url, &[]).await {
            Ok(topic) => topic,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(SourceError::fetch(&self.name, e)),
        };

        Ok(Some(self.to_item(topic, body)))
    }
}

fn is_not_found(err: &FetchError) -> bool {
    matches!(err, FetchError::ClientRequest { status: 404, .. })
}

fn cutoff(now: DateTime<Utc>, since_minutes: u64) -> DateTime<Utc> {
    i64::try_from(since_minutes)
        .ok()
        .and_then(TimeDelta::try_minutes)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn cutoff_subtracts_window() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(
            cutoff(now, 30),
            Utc.with_ymd_and_hms(2025, 3, 1, 11, 30, 0).unwrap()
        );
    }

    #[test]
    fn huge_window_saturates_to_the_beginning_of_time() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(cutoff(now, u64::MAX), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn not_found_only_matches_404() {
        let not_found = FetchError::ClientRequest {
            status: 404,
            url: "u".to_string(),
            body: String::new(),
        };
        let forbidden = FetchError::ClientRequest {
            status: 403,
            url: "u".to_string(),
            body: String::new(),
        };
        assert!(is_not_found(&not_found));
        assert!(!is_not_found(&forbidden));
    }
}
