//! Data API client tests: credential failover, quota signalling, cache replay.

use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};
use youtube_fetcher::api::{YoutubeApiClient, MAX_IDS_PER_REQUEST};
use youtube_fetcher::utils::{ApiMode, ApiSettings, FetcherError};

fn settings(server_uri: &str, mode: ApiMode, cache: &TempDir, keys: &[&str]) -> ApiSettings {
    let mut settings = ApiSettings::new(
        mode,
        cache.path().to_path_buf(),
        keys.iter().map(|k| k.to_string()).collect(),
    );
    settings.base_url = server_uri.to_string();
    settings.rotation_cooldown = Duration::ZERO;
    settings
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Answers a `videos` lookup with one item per requested id
struct EchoIds;

impl Respond for EchoIds {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let requested = request
            .url
            .query_pairs()
            .find(|(name, _)| name == "id")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        let items: Vec<Value> = requested
            .split(',')
            .map(|id| json!({"id": id, "snippet": {"description": format!("about {}", id)}}))
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({"items": items}))
    }
}

#[tokio::test]
async fn live_mode_requires_a_key() {
    let cache = TempDir::new().unwrap();
    let result = YoutubeApiClient::new(&settings("http://localhost", ApiMode::Live, &cache, &[]));
    assert!(matches!(result, Err(FetcherError::Config(_))));
}

#[tokio::test]
async fn fetches_descriptions() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/videos"))
        .and(query_param("part", "snippet"))
        .and(query_param("key", "k1"))
        .respond_with(EchoIds)
        .expect(1)
        .mount(&server)
        .await;

    let client = YoutubeApiClient::new(&settings(&server.uri(), ApiMode::Live, &cache, &["k1"])).unwrap();
    let descriptions = client
        .get_video_descriptions(&ids(&["a", "b"]))
        .await
        .unwrap();

    assert_eq!(descriptions.len(), 2);
    assert_eq!(descriptions["a"].description, "about a");
}

#[tokio::test]
async fn single_exhausted_key_signals_quota() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let client = YoutubeApiClient::new(&settings(&server.uri(), ApiMode::Live, &cache, &["only"])).unwrap();

    let err = client.get_video_descriptions(&ids(&["a"])).await.unwrap_err();
    assert!(err.is_quota_exceeded());
    assert_eq!(err.to_string(), "YOUTUBE_QUOTA_EXCEEDED");

    // The pool stays exhausted without another round trip.
    let again = client.get_video_descriptions(&ids(&["b"])).await;
    assert!(matches!(again, Err(FetcherError::QuotaExceeded)));
}

#[tokio::test]
async fn rejected_key_fails_over_to_next() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/channels"))
        .and(query_param("key", "first"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/channels"))
        .and(query_param("key", "second"))
        .and(query_param("part", "statistics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [
            {"id": "UC1", "statistics": {"subscriberCount": "1500"}},
            {"id": "UC2", "statistics": {"hiddenSubscriberCount": true}},
            {"id": "UC3", "statistics": {"subscriberCount": 42}}
        ]})))
        .expect(2)
        .mount(&server)
        .await;

    let client = YoutubeApiClient::new(&settings(
        &server.uri(),
        ApiMode::Live,
        &cache,
        &["first", "second"],
    ))
    .unwrap();

    let counts = client
        .get_channel_subscribers(&ids(&["UC1", "UC2", "UC3"]))
        .await
        .unwrap();
    assert_eq!(counts.get("UC1"), Some(&1500));
    assert_eq!(counts.get("UC2"), None);
    assert_eq!(counts.get("UC3"), Some(&42));

    // Second call goes straight to the surviving key.
    client
        .get_channel_subscribers(&ids(&["UC1"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn upstream_error_is_empty_result() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = YoutubeApiClient::new(&settings(&server.uri(), ApiMode::Live, &cache, &["k"])).unwrap();
    assert!(client
        .get_video_descriptions(&ids(&["a"]))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn batch_is_capped_at_fifty_ids() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(EchoIds)
        .mount(&server)
        .await;

    let client = YoutubeApiClient::new(&settings(&server.uri(), ApiMode::Live, &cache, &["k"])).unwrap();
    let requested: Vec<String> = (0..60).map(|i| format!("v{}", i)).collect();
    let descriptions = client.get_video_descriptions(&requested).await.unwrap();

    assert_eq!(descriptions.len(), MAX_IDS_PER_REQUEST);
    assert!(descriptions.contains_key("v49"));
    assert!(!descriptions.contains_key("v50"));
}

#[tokio::test]
async fn empty_input_makes_no_request() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .respond_with(EchoIds)
        .expect(0)
        .mount(&server)
        .await;

    let client = YoutubeApiClient::new(&settings(&server.uri(), ApiMode::Live, &cache, &["k"])).unwrap();
    assert!(client.get_video_descriptions(&[]).await.unwrap().is_empty());
    assert!(client.get_channel_subscribers(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn mock_mode_replays_live_responses() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(EchoIds)
        .expect(1)
        .mount(&server)
        .await;

    let live = YoutubeApiClient::new(&settings(&server.uri(), ApiMode::Live, &cache, &["k"])).unwrap();
    let recorded = live.get_video_descriptions(&ids(&["x", "y"])).await.unwrap();

    // Nothing listens here; a network call would fail.
    let mock = YoutubeApiClient::new(&settings("http://127.0.0.1:9", ApiMode::Mock, &cache, &[])).unwrap();
    let replayed = mock.get_video_descriptions(&ids(&["x", "y"])).await.unwrap();
    assert_eq!(replayed, recorded);

    let miss = mock.get_video_descriptions(&ids(&["other"])).await.unwrap();
    assert!(miss.is_empty());
}
