//! Site crawling: polite fetching, frontier management, crawl orchestration

mod engine;
mod fetcher;
mod frontier;

pub use engine::{
    retry_failed_with_fetch, scrape_site, AuthFetchResult, AuthRetryStats, CrawlEngine, CrawlStats,
    FailedUrl,
};
pub use fetcher::{build_http_client, FetchError, FetchedPage, PoliteFetcher, DEFAULT_RETRIES};
pub use frontier::CrawlFrontier;
