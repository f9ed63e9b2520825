use crate::extractor::models::{OutputFormat, ScrapeResult, SearchPage};
use async_trait::async_trait;

/// Source of search results
///
/// Separates the pipeline and job handlers from how the results page is
/// obtained, so they can be driven by a fixed page in tests.
#[async_trait]
pub trait SearchExtractor: Send + Sync {
    /// Short identifier used in logs
    fn id(&self) -> &'static str;

    /// Fetch and parse up to `max_results` video cards.
    ///
    /// `None` covers every expected failure: network, blocked page, changed
    /// markup, malformed data.
    async fn search(&self, query: &str, max_results: usize) -> Option<SearchPage>;

    /// Search and render the entries in the requested shape
    async fn scrape(
        &self,
        query: &str,
        max_results: usize,
        format: OutputFormat,
    ) -> Option<ScrapeResult> {
        let page = self.search(query, max_results).await?;
        Some(page.render(format))
    }
}
