use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use youtube_fetcher::extractor::blob::extract_initial_data;
use youtube_fetcher::extractor::parse_view_count;
use youtube_fetcher::extractor::youtube::parse_search_page;

fn results_page(cards: usize) -> String {
    let items: Vec<_> = (0..cards)
        .map(|i| {
            json!({"videoRenderer": {
                "videoId": format!("vid{}", i),
                "title": {"runs": [{"text": format!("Video \"{}\" {{braces}}", i)}]},
                "viewCountText": {"simpleText": "12,345 views"},
                "thumbnail": {"thumbnails": [{"url": format!("https://i.ytimg.com/vi/vid{}/hq.jpg", i)}]}
            }})
        })
        .collect();
    let data = json!({
        "estimatedResults": "1000000",
        "contents": {"twoColumnSearchResultsRenderer": {"primaryContents": {
            "sectionListRenderer": {"contents": [{"itemSectionRenderer": {"contents": items}}]}
        }}}
    });
    // Surrounding markup comparable to a real page
    let padding = "<div class=\"style-scope\"></div>".repeat(2_000);
    format!(
        "<html>{}<script>var ytInitialData = {};</script>{}</html>",
        padding, data, padding
    )
}

fn benchmark_blob_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("Blob Extraction");

    for cards in [5usize, 20, 50] {
        let html = results_page(cards);
        group.bench_with_input(BenchmarkId::new("extract_initial_data", cards), &html, |b, html| {
            b.iter(|| extract_initial_data(black_box(html)))
        });
        group.bench_with_input(BenchmarkId::new("parse_search_page", cards), &html, |b, html| {
            b.iter(|| parse_search_page(black_box(html), black_box(cards)))
        });
    }

    group.finish();
}

fn benchmark_view_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("View Count Parsing");
    let inputs = ["1,234,567 views", "1.2M views", "850K views", "No views", "3B views"];

    for input in inputs {
        group.bench_with_input(BenchmarkId::new("parse_view_count", input), &input, |b, input| {
            b.iter(|| parse_view_count(black_box(input)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_blob_extraction, benchmark_view_counts);
criterion_main!(benches);
