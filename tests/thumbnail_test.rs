//! Thumbnail pipeline tests: ordering, partial failure and the concurrency bound.

mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use common::{entry, jpeg_bytes, png_bytes, FakeExtractor};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use youtube_fetcher::downloader::{DownloadConfig, MediaType, ThumbnailPipeline};
use youtube_fetcher::extractor::SearchExtractor;

fn config(concurrency: usize) -> DownloadConfig {
    DownloadConfig {
        concurrency,
        timeout: Duration::from_secs(5),
        retry_attempts: 1,
        retry_delay: Duration::from_millis(5),
    }
}

fn pipeline(extractor: FakeExtractor, concurrency: usize) -> ThumbnailPipeline {
    let extractor: Arc<dyn SearchExtractor> = Arc::new(extractor);
    ThumbnailPipeline::new(extractor, config(concurrency)).unwrap()
}

async fn serve(server: &MockServer, name: &str, response: ResponseTemplate) -> String {
    Mock::given(method("GET"))
        .and(path(format!("/{}", name)))
        .respond_with(response)
        .mount(server)
        .await;
    format!("{}/{}", server.uri(), name)
}

fn image(body: Vec<u8>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "image/jpeg")
}

#[tokio::test]
async fn partial_failures_keep_input_order() {
    let server = MockServer::start().await;
    let mut entries = Vec::new();
    for (i, ok) in [true, false, true, false, true].into_iter().enumerate() {
        let response = if ok {
            image(jpeg_bytes())
        } else {
            ResponseTemplate::new(404)
        };
        let url = serve(&server, &format!("t{}.jpg", i), response).await;
        entries.push(entry(&format!("v{}", i), Some(url)));
    }

    let batch = pipeline(FakeExtractor::with_entries(entries), 10)
        .fetch("cats", 20)
        .await
        .expect("three downloads succeed");

    assert_eq!(batch.query, "cats");
    assert_eq!(batch.count, 3);
    let names: Vec<_> = batch
        .thumbnails
        .iter()
        .map(|t| t.url.rsplit('/').next().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["t0.jpg", "t2.jpg", "t4.jpg"]);
    assert!(batch.thumbnails.iter().all(|t| t.media_type == MediaType::Jpeg));
}

#[tokio::test]
async fn slow_first_download_stays_first() {
    let server = MockServer::start().await;
    let slow = serve(
        &server,
        "slow.png",
        image(png_bytes()).set_delay(Duration::from_millis(300)),
    )
    .await;
    let fast = serve(&server, "fast.jpg", image(jpeg_bytes())).await;

    let batch = pipeline(
        FakeExtractor::with_entries(vec![entry("a", Some(slow.clone())), entry("b", Some(fast))]),
        10,
    )
    .fetch("q", 5)
    .await
    .unwrap();

    assert_eq!(batch.thumbnails[0].url, slow);
    // Byte signature wins over the declared content type.
    assert_eq!(batch.thumbnails[0].media_type, MediaType::Png);
}

#[tokio::test]
async fn result_is_truncated_after_downloads() {
    let server = MockServer::start().await;
    let mut entries = Vec::new();
    for i in 0..6 {
        let url = serve(&server, &format!("{}.jpg", i), image(jpeg_bytes())).await;
        entries.push(entry(&format!("v{}", i), Some(url)));
    }

    let batch = pipeline(FakeExtractor::with_entries(entries), 10)
        .fetch("q", 4)
        .await
        .unwrap();
    assert_eq!(batch.count, 4);
    assert_eq!(batch.thumbnails.len(), 4);
}

#[tokio::test]
async fn scrape_requests_five_spare_cards() {
    let extractor = Arc::new(FakeExtractor::with_entries(vec![entry("a", None)]));
    let pipeline = ThumbnailPipeline::new(extractor.clone(), config(2)).unwrap();

    pipeline.fetch("q", 4).await;
    assert_eq!(extractor.last_max_results(), 9);

    // An unbounded request saturates instead of overflowing.
    pipeline.fetch("q", usize::MAX).await;
    assert_eq!(extractor.last_max_results(), usize::MAX);
    assert_eq!(extractor.calls(), 2);
}

#[tokio::test]
async fn spare_cards_fill_in_for_failed_downloads() {
    let server = MockServer::start().await;
    let mut entries = Vec::new();
    for i in 0..9 {
        let response = if i < 5 {
            ResponseTemplate::new(404)
        } else {
            image(jpeg_bytes())
        };
        let url = serve(&server, &format!("p{}.jpg", i), response).await;
        entries.push(entry(&format!("v{}", i), Some(url)));
    }

    let batch = pipeline(FakeExtractor::with_entries(entries), 4)
        .fetch("q", 4)
        .await
        .expect("the padded tail downloads");

    assert_eq!(batch.count, 4);
    let names: Vec<_> = batch
        .thumbnails
        .iter()
        .map(|t| t.url.rsplit('/').next().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["p5.jpg", "p6.jpg", "p7.jpg", "p8.jpg"]);
}

#[tokio::test]
async fn payload_serializes_base64() {
    let server = MockServer::start().await;
    let url = serve(&server, "one.jpg", image(jpeg_bytes())).await;

    let batch = pipeline(FakeExtractor::with_entries(vec![entry("v", Some(url))]), 2)
        .fetch("q", 1)
        .await
        .unwrap();

    let json = serde_json::to_value(&batch).unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["thumbnails"][0]["media_type"], "image/jpeg");
    let encoded = json["thumbnails"][0]["base64"].as_str().unwrap();
    assert_eq!(STANDARD.decode(encoded).unwrap(), jpeg_bytes());
}

#[tokio::test]
async fn absence_when_nothing_downloads() {
    let server = MockServer::start().await;
    let broken = serve(&server, "gone.jpg", ResponseTemplate::new(404)).await;
    let empty = serve(&server, "empty.jpg", ResponseTemplate::new(200)).await;

    let all_failed = pipeline(
        FakeExtractor::with_entries(vec![entry("a", Some(broken)), entry("b", Some(empty))]),
        4,
    );
    assert!(all_failed.fetch("q", 10).await.is_none());

    let no_urls = pipeline(FakeExtractor::with_entries(vec![entry("a", None)]), 4);
    assert!(no_urls.fetch("q", 10).await.is_none());

    let scrape_failed = pipeline(FakeExtractor::failing(), 4);
    assert!(scrape_failed.fetch("q", 10).await.is_none());
}

#[tokio::test]
async fn concurrency_ceiling_serializes_downloads() {
    let server = MockServer::start().await;
    let delay = Duration::from_millis(150);
    let mut urls = Vec::new();
    for i in 0..4 {
        urls.push(serve(&server, &format!("{}.jpg", i), image(jpeg_bytes()).set_delay(delay)).await);
    }

    let serial = pipeline(FakeExtractor::failing(), 1);
    let started = Instant::now();
    let results = serial.download_all(&urls).await;
    assert!(results.iter().all(Option::is_some));
    assert!(started.elapsed() >= delay * 4);

    let parallel = pipeline(FakeExtractor::failing(), 4);
    let started = Instant::now();
    parallel.download_all(&urls).await;
    assert!(started.elapsed() < delay * 4);
}
