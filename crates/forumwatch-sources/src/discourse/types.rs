//! Response shapes for the public Discourse JSON endpoints.
//!
//! Discourse omits fields freely (a topic with no replies may have no
//! `reply_count`, uncategorized topics have no `category_id`), so every field
//! this crate does not strictly need defaults instead of failing the parse.

use serde::Deserialize;

/// `GET /categories.json`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CategoriesResponse {
    pub(crate) category_list: CategoryList,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CategoryList {
    pub(crate) categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Category {
    pub(crate) id: u64,
    pub(crate) name: String,
}

/// `GET /latest.json`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LatestResponse {
    pub(crate) topic_list: TopicList,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TopicList {
    pub(crate) topics: Vec<Topic>,
}

/// A topic, as it appears both in `/latest.json` listings and as the body of
/// `GET /t/{id}.json`.
#[derive(Debug, Deserialize)]
pub(crate) struct Topic {
    pub(crate) id: u64,
    #[serde(default)]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) slug: String,
    #[serde(default)]
    pub(crate) category_id: Option<u64>,
    /// RFC 3339, e.g. `"2025-03-01T12:00:00.000Z"`.
    #[serde(default)]
    pub(crate) created_at: Option<String>,
    /// Listing-only HTML snippet of the first post.
    #[serde(default)]
    pub(crate) excerpt: Option<String>,
    #[serde(default)]
    pub(crate) last_poster_username: Option<String>,
    #[serde(default)]
    pub(crate) reply_count: u32,
    #[serde(default)]
    pub(crate) like_count: u32,
}

/// `GET /t/{id}/posts.json`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PostsResponse {
    pub(crate) post_stream: PostStream,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PostStream {
    pub(crate) posts: Vec<Post>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Post {
    /// Rendered HTML of the post.
    pub(crate) cooked: String,
}
