//! `DiscourseSource` against a wiremock Discourse.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, TimeDelta, Utc};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use forumwatch_core::SourceConfig;
use forumwatch_fetch::{FetchGate, GateConfig};
use forumwatch_sources::{DiscourseSource, Source, SourceError};

fn gate() -> Arc<FetchGate> {
    Arc::new(
        FetchGate::new(&GateConfig {
            requests_per_minute: 60_000,
            max_retries: 1,
            backoff_base: Duration::ZERO,
            default_retry_after: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
            user_agent: "forumwatch-test/0.1".to_string(),
        })
        .unwrap(),
    )
}

fn source(server: &MockServer, categories: &[&str]) -> DiscourseSource {
    DiscourseSource::new(
        &SourceConfig {
            name: "arbitrum".to_string(),
            url: format!("{}/", server.uri()),
            kind: "discourse".to_string(),
            enabled: true,
            categories: categories.iter().map(|c| (*c).to_string()).collect(),
        },
        gate(),
    )
}

fn minutes_ago(minutes: i64) -> String {
    (Utc::now() - TimeDelta::minutes(minutes)).to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn mount_categories(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/categories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "category_list": {"categories": [
                {"id": 5, "name": "Governance"},
                {"id": 9, "name": "General"}
            ]}
        })))
        .mount(server)
        .await;
}

async fn mount_latest(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param("order", "created"))
        .and(query_param("ascending", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "topic_list": {"topics": [
                {
                    "id": 101,
                    "title": "Treasury diversification",
                    "slug": "treasury-diversification",
                    "category_id": 5,
                    "created_at": minutes_ago(5),
                    "excerpt": "Proposal to move &amp; rebalance <b>funds</b>",
                    "last_poster_username": "alice",
                    "reply_count": 3,
                    "like_count": 7
                },
                {
                    "id": 102,
                    "title": "Coffee chat",
                    "slug": "coffee-chat",
                    "category_id": 9,
                    "created_at": minutes_ago(10)
                },
                {
                    "id": 90,
                    "title": "Old news",
                    "slug": "old-news",
                    "category_id": 5,
                    "created_at": minutes_ago(600)
                }
            ]}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn fetch_recent_normalizes_and_filters_by_age() {
    let server = MockServer::start().await;
    mount_categories(&server).await;
    mount_latest(&server).await;

    let items = source(&server, &[]).fetch_recent(30).await.unwrap();

    assert_eq!(items.len(), 2);
    let first = &items[0];
    assert_eq!(first.id.as_str(), "arbitrum_101");
    assert_eq!(first.topic_id, "101");
    assert_eq!(first.category, "Governance");
    assert_eq!(first.author, "alice");
    assert_eq!(first.body, "Proposal to move & rebalance funds");
    assert_eq!(first.reply_count, 3);
    assert_eq!(first.like_count, 7);
    assert_eq!(
        first.url,
        format!("{}/t/treasury-diversification/101", server.uri())
    );

    let second = &items[1];
    assert_eq!(second.author, "unknown");
    assert!(second.body.is_empty());
}

#[tokio::test]
async fn fetch_recent_applies_category_allow_list_case_insensitively() {
    let server = MockServer::start().await;
    mount_categories(&server).await;
    mount_latest(&server).await;

    let items = source(&server, &["governance"]).fetch_recent(30).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].topic_id, "101");
}

#[tokio::test]
async fn category_failure_falls_back_to_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/categories.json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    mount_latest(&server).await;

    let items = source(&server, &[]).fetch_recent(30).await.unwrap();

    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.category == "Unknown"));
}

#[tokio::test]
async fn listing_failure_is_a_source_error() {
    let server = MockServer::start().await;
    mount_categories(&server).await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = source(&server, &[]).fetch_recent(30).await.unwrap_err();
    assert!(
        matches!(err, SourceError::Fetch { ref source_name, .. } if source_name == "arbitrum"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn fetch_detail_uses_first_post_body() {
    let server = MockServer::start().await;
    mount_categories(&server).await;
    Mock::given(method("GET"))
        .and(path("/t/101/posts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "post_stream": {"posts": [
                {"cooked": "<p>Full proposal:</p>\n<ul><li>Move 10% of the treasury</li></ul>"},
                {"cooked": "<p>a reply</p>"}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/t/101.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 101,
            "title": "Treasury diversification",
            "slug": "treasury-diversification",
            "category_id": 5,
            "created_at": minutes_ago(5),
            "last_poster_username": "bob"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let item = source(&server, &[])
        .fetch_detail("101")
        .await
        .unwrap()
        .expect("topic exists");

    assert_eq!(item.body, "Full proposal: Move 10% of the treasury");
    assert_eq!(item.category, "Governance");
    assert_eq!(item.author, "bob");
    assert_eq!(item.id.as_str(), "arbitrum_101");
}

#[tokio::test]
async fn fetch_detail_missing_topic_is_none() {
    let server = MockServer::start().await;
    mount_categories(&server).await;
    Mock::given(method("GET"))
        .and(path("/t/404/posts.json"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let detail = source(&server, &[]).fetch_detail("404").await.unwrap();
    assert!(detail.is_none());
}

#[tokio::test]
async fn categories_are_loaded_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/categories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "category_list": {"categories": [{"id": 5, "name": "Governance"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_latest(&server).await;

    let src = source(&server, &[]);
    src.fetch_recent(30).await.unwrap();
    src.fetch_recent(30).await.unwrap();
}
