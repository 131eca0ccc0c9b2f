use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Globally stable identifier of a content item: `"{source}_{topic_id}"`.
///
/// Two fetches of the same topic from the same source always produce the same
/// id, which is what the dedup ledger keys on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    #[must_use]
    pub fn new(source: &str, topic_id: &str) -> Self {
        Self(format!("{source}_{topic_id}"))
    }

    /// Wraps an id previously produced by [`ItemId::new`], e.g. one read back
    /// from the ledger.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized unit of source content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ItemId,
    /// Name of the configured source this item came from.
    pub source: String,
    /// Source-local topic identifier, used for detail fetches.
    pub topic_id: String,
    pub title: String,
    /// Plain-text body. Empty when the listing endpoint carries no excerpt.
    pub body: String,
    pub author: String,
    pub category: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub reply_count: u32,
    pub like_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchLocation {
    Title,
    Body,
}

impl std::fmt::Display for MatchLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchLocation::Title => write!(f, "title"),
            MatchLocation::Body => write!(f, "body"),
        }
    }
}

/// One successful pattern match against one location of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub group: String,
    pub pattern: String,
    pub location: MatchLocation,
    pub matched_text: String,
}

/// Outcome of scoring one item. Derived on every cycle, never stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub item: ContentItem,
    pub triggered: bool,
    pub score: f64,
    pub matches: Vec<MatchRecord>,
}

impl DetectionResult {
    /// Matched substrings in match order, as recorded in the ledger's
    /// `keywords_matched` column.
    #[must_use]
    pub fn matched_texts(&self) -> Vec<String> {
        self.matches.iter().map(|m| m.matched_text.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_joins_source_and_topic() {
        let id = ItemId::new("arbitrum", "1234");
        assert_eq!(id.as_str(), "arbitrum_1234");
        assert_eq!(id.to_string(), "arbitrum_1234");
    }

    #[test]
    fn item_id_is_stable_across_constructions() {
        assert_eq!(ItemId::new("uniswap", "42"), ItemId::new("uniswap", "42"));
        assert_ne!(ItemId::new("uniswap", "42"), ItemId::new("aave", "42"));
    }

    #[test]
    fn match_location_serializes_lowercase() {
        let json = serde_json::to_string(&MatchLocation::Title).unwrap();
        assert_eq!(json, "\"title\"");
    }
}
