//! Integration tests for `FetchGate` against a local wiremock server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use forumwatch_fetch::{FetchError, FetchGate, GateConfig};

/// Fast gate for behaviour tests: effectively unpaced, no backoff sleeps.
fn test_gate(max_retries: u32) -> FetchGate {
    gate_with(60_000, max_retries, Duration::from_secs(60))
}

fn gate_with(requests_per_minute: u32, max_retries: u32, default_retry_after: Duration) -> FetchGate {
    FetchGate::new(&GateConfig {
        requests_per_minute,
        max_retries,
        backoff_base: Duration::ZERO,
        default_retry_after,
        timeout: Duration::from_secs(5),
        user_agent: "forumwatch-test/0.1".to_string(),
    })
    .expect("failed to build test gate")
}

#[tokio::test]
async fn returns_parsed_body_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param("order", "created"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"topic_list": {"topics": []}})))
        .expect(1)
        .mount(&server)
        .await;

    let gate = test_gate(3);
    let body: Value = gate
        .get_json(&format!("{}/latest.json", server.uri()), &[("order", "created")])
        .await
        .expect("should succeed");

    assert_eq!(body["topic_list"]["topics"], json!([]));
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .expect(1)
        .mount(&server)
        .await;

    let gate = test_gate(3);
    let result = gate
        .get_json::<Value>(&format!("{}/t/1.json", server.uri()), &[])
        .await;

    match result {
        Err(FetchError::ClientRequest { status, body, .. }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "not here");
        }
        other => panic!("expected ClientRequest, got: {other:?}"),
    }
}

#[tokio::test]
async fn three_server_errors_exhaust_a_budget_of_three() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let gate = test_gate(3);
    let result = gate
        .get_json::<Value>(&format!("{}/latest.json", server.uri()), &[])
        .await;

    assert!(
        matches!(
            result,
            Err(FetchError::ExhaustedRetries {
                attempts: 3,
                last_status: 500,
                ..
            })
        ),
        "expected ExhaustedRetries, got: {result:?}"
    );
}

#[tokio::test]
async fn recovers_when_server_error_clears_within_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let gate = test_gate(3);
    let body: Value = gate
        .get_json(&format!("{}/latest.json", server.uri()), &[])
        .await
        .expect("third attempt should succeed");
    assert_eq!(body["ok"], json!(true));
}

#[tokio::test]
async fn rate_limiting_does_not_consume_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(3)
        .with_priority(1)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    // A budget of one attempt would be spent by the first 429 if it counted.
    let gate = test_gate(1);
    let body: Value = gate
        .get_json(&format!("{}/latest.json", server.uri()), &[])
        .await
        .expect("429s must not exhaust the retry budget");
    assert_eq!(body["ok"], json!(true));
}

#[tokio::test]
async fn rate_limiting_pauses_for_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let gate = test_gate(3);
    let start = Instant::now();
    gate.get_json::<Value>(&format!("{}/latest.json", server.uri()), &[])
        .await
        .expect("should succeed after the pause");

    assert!(
        start.elapsed() >= Duration::from_secs(1),
        "expected at least 1s pause, got {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn rate_limiting_without_header_uses_default_pause() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let gate = gate_with(60_000, 3, Duration::from_secs(1));
    let start = Instant::now();
    gate.get_json::<Value>(&format!("{}/latest.json", server.uri()), &[])
        .await
        .expect("should succeed after the default pause");

    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn consecutive_calls_respect_requests_per_minute() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let gate = gate_with(30, 3, Duration::from_secs(60));
    let url = format!("{}/latest.json", server.uri());

    let start = Instant::now();
    gate.get_json::<Value>(&url, &[]).await.unwrap();
    gate.get_json::<Value>(&url, &[]).await.unwrap();

    assert!(
        start.elapsed() >= Duration::from_secs(2),
        "30 rpm must space calls by 2s, got {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn pacing_is_shared_across_concurrent_callers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&server)
        .await;

    let gate = Arc::new(gate_with(120, 3, Duration::from_secs(60)));
    let url = format!("{}/latest.json", server.uri());

    let start = Instant::now();
    let calls = (0..3).map(|_| {
        let gate = Arc::clone(&gate);
        let url = url.clone();
        tokio::spawn(async move { gate.get_json::<Value>(&url, &[]).await })
    });
    for handle in futures::future::join_all(calls).await {
        handle.expect("task panicked").expect("request failed");
    }

    // Three dispatches at 500ms spacing need at least 1s in total.
    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn invalid_json_is_a_deserialize_error_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let gate = test_gate(3);
    let result = gate
        .get_json::<Value>(&format!("{}/latest.json", server.uri()), &[])
        .await;
    assert!(matches!(result, Err(FetchError::Deserialize { .. })));
}

#[tokio::test]
async fn network_failure_returns_transport_error_after_budget() {
    let gate = test_gate(2);
    // Port 1 is reserved and refuses connections.
    let result = gate
        .get_json::<Value>("http://127.0.0.1:1/latest.json", &[])
        .await;
    assert!(
        matches!(result, Err(FetchError::Transport(_))),
        "expected Transport, got: {result:?}"
    );
}
