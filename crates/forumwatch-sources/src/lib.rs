//! Content sources: the [`Source`] contract, the kind-keyed
//! [`SourceRegistry`], and the Discourse implementation.

pub mod discourse;
pub mod error;
mod html;
pub mod registry;

use async_trait::async_trait;

use forumwatch_core::ContentItem;

pub use discourse::DiscourseSource;
pub use error::SourceError;
pub use registry::{SourceFactory, SourceRegistry};

/// A pollable forum.
#[async_trait]
pub trait Source: Send + Sync {
    /// Configured name; also the prefix of every [`forumwatch_core::ItemId`]
    /// this source produces.
    fn name(&self) -> &str;

    /// Registry kind this source was built from.
    fn kind(&self) -> &str;

    /// Items created within the last `since_minutes`, newest first.
    async fn fetch_recent(&self, since_minutes: u64) -> Result<Vec<ContentItem>, SourceError>;

    /// The full item for `topic_id`, or `None` if the topic does not exist.
    async fn fetch_detail(&self, topic_id: &str) -> Result<Option<ContentItem>, SourceError>;
}
