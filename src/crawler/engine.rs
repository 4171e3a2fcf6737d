//! Crawl engine - drives one site's crawl to completion
//!
//! The engine owns the frontier, the polite fetcher, and the stats for a
//! single crawl run. Pages are fetched in breadth-first frontier order;
//! one page's failure never aborts the crawl. A parsed artifact already on
//! disk is the resume signal: the page is counted as skipped and not
//! refetched unless the run is forced.

use crate::article::{extract_article, parse_index};
use crate::artifacts;
use crate::crawler::fetcher::{build_http_client, PoliteFetcher};
use crate::crawler::frontier::CrawlFrontier;
use crate::url::{canonicalize_url, slug_from_url};
use crate::{HarvestError, Result};
use reqwest::cookie::Jar;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// A page that could not be fetched, extracted, or persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedUrl {
    pub url: String,
    pub error: String,
    pub site_code: String,
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tried_auth_state: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_status: Option<String>,
}

/// Per-site counters accumulated over one crawl invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlStats {
    pub downloaded: u64,
    pub skipped: u64,
    pub errors: u64,
    pub assets: u64,
    #[serde(default)]
    pub failed_urls: Vec<FailedUrl>,
}

/// Outcome of one authenticated fetch attempt, supplied by the caller
#[derive(Debug, Default)]
pub struct AuthFetchResult {
    pub html: Option<String>,
    pub http_status: Option<u16>,
    pub error: Option<String>,
}

/// Counters for the post-crawl authenticated retry pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthRetryStats {
    pub attempted: u64,
    pub succeeded: u64,
}

/// Drives one site's breadth-first crawl
pub struct CrawlEngine {
    site_code: String,
    base_url: String,
    out_dir: PathBuf,
    download_assets: bool,
    max_pages: u64,
    force: bool,
    fetcher: PoliteFetcher,
    frontier: CrawlFrontier,
    stats: CrawlStats,
}

impl CrawlEngine {
    /// Creates an engine for one site run
    ///
    /// The HTTP client (and optional cookie jar) is constructed here and
    /// owned by this engine; concurrent site runs each get their own.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        site_code: &str,
        base_url: &str,
        out_dir: &Path,
        rate_limit_seconds: f64,
        download_assets: bool,
        max_pages: u64,
        user_agent: &str,
        force: bool,
        cookies: Option<Arc<Jar>>,
    ) -> Result<Self> {
        let client = build_http_client(user_agent, cookies)?;
        let fetcher = PoliteFetcher::new(client, Duration::from_secs_f64(rate_limit_seconds));
        Ok(Self {
            site_code: site_code.to_string(),
            base_url: base_url.to_string(),
            out_dir: out_dir.to_path_buf(),
            download_assets,
            max_pages,
            force,
            fetcher,
            frontier: CrawlFrontier::new(),
            stats: CrawlStats::default(),
        })
    }

    /// Runs the crawl to completion and returns the accumulated stats
    ///
    /// Seeds the frontier from the index page, or from `urls_override`
    /// when given. If the initial index fetch fails outright, the run
    /// reports one error with zero downloads and stops.
    pub async fn run(mut self, urls_override: Option<Vec<(String, String)>>) -> CrawlStats {
        match urls_override {
            None => {
                let index = match self.fetcher.get(&self.base_url).await {
                    Ok(page) => page,
                    Err(e) => {
                        tracing::warn!("Index fetch failed for {}: {}", self.base_url, e);
                        self.stats.errors += 1;
                        self.stats.failed_urls.push(FailedUrl {
                            url: self.base_url.clone(),
                            error: e.to_string(),
                            site_code: self.site_code.clone(),
                            http_status: e.http_status(),
                            tried_auth_state: None,
                            final_status: None,
                        });
                        return self.stats;
                    }
                };
                let links = parse_index(&index.body, &self.base_url);
                tracing::info!(
                    "Seeded {} links from index page for site {}",
                    links.len(),
                    self.site_code
                );
                for link in links {
                    self.frontier.enqueue(link.url, link.category);
                }
            }
            Some(seeds) => {
                tracing::info!(
                    "Seeded {} override URLs for site {}",
                    seeds.len(),
                    self.site_code
                );
                for (url, category) in seeds {
                    self.frontier.enqueue(url, category);
                }
            }
        }

        while let Some((url, category)) = self.frontier.pop() {
            let canonical = match canonicalize_url(&url) {
                Ok(canonical) => canonical,
                Err(e) => {
                    self.record_failure(&url, &e.to_string(), None);
                    continue;
                }
            };
            if !self.frontier.mark_visited(&canonical) {
                continue;
            }
            if self.max_pages > 0 && self.stats.downloaded >= self.max_pages {
                tracing::info!(
                    "Page budget of {} reached for site {}",
                    self.max_pages,
                    self.site_code
                );
                break;
            }

            let slug = slug_from_url(&canonical);
            let parsed_path = self
                .out_dir
                .join("parsed")
                .join(&self.site_code)
                .join(format!("{slug}.json"));
            if parsed_path.exists() && !self.force {
                self.stats.skipped += 1;
                continue;
            }

            tracing::debug!("Processing {}", canonical);
            match self.process_page(&canonical, &category).await {
                Ok(outbound_links) => {
                    self.stats.downloaded += 1;
                    for link in outbound_links {
                        if !self.frontier.is_visited(&link) {
                            self.frontier.enqueue(link, category.clone());
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to process {}: {}", canonical, e);
                    let status = http_status_of(&e);
                    self.record_failure(&canonical, &e.to_string(), status);
                }
            }
        }

        tracing::info!(
            "Site {} done: downloaded={}, skipped={}, errors={}, assets={}",
            self.site_code,
            self.stats.downloaded,
            self.stats.skipped,
            self.stats.errors,
            self.stats.assets
        );
        self.stats
    }

    /// Fetches, extracts, and persists one page; returns its outbound links
    async fn process_page(&mut self, url: &str, category: &str) -> Result<Vec<String>> {
        let page = self.fetcher.get(url).await?;
        let mut article = extract_article(&page.body, url, &self.site_code, Some(category))?;
        if self.download_assets {
            self.stats.assets += artifacts::download_assets(
                &mut article.images,
                &self.out_dir,
                &self.site_code,
                self.fetcher.client(),
            )
            .await;
        }
        artifacts::save_artifacts(&article, &page.body, &self.out_dir)?;
        Ok(article.outbound_links)
    }

    fn record_failure(&mut self, url: &str, error: &str, http_status: Option<u16>) {
        self.stats.errors += 1;
        self.stats.failed_urls.push(FailedUrl {
            url: url.to_string(),
            error: error.to_string(),
            site_code: self.site_code.clone(),
            http_status,
            tried_auth_state: None,
            final_status: None,
        });
    }
}

fn http_status_of(error: &HarvestError) -> Option<u16> {
    match error {
        HarvestError::Fetch(fetch_error) => fetch_error.http_status(),
        _ => None,
    }
}

/// Crawls one site and returns its stats
///
/// # Arguments
///
/// * `site_code` - Short site identifier (e.g. `ru`)
/// * `base_url` - Help-center index URL for the site
/// * `out_dir` - Output root for raw/parsed/assets artifacts
/// * `rate_limit_seconds` - Minimum interval between requests
/// * `download_assets` - Whether to fetch referenced images
/// * `max_pages` - Page budget for this run (0 = unlimited)
/// * `user_agent` - User-agent string for all requests
/// * `force` - Re-fetch pages whose parsed artifact already exists
/// * `cookies` - Optional cookie jar for authenticated pages
#[allow(clippy::too_many_arguments)]
pub async fn scrape_site(
    site_code: &str,
    base_url: &str,
    out_dir: &Path,
    rate_limit_seconds: f64,
    download_assets: bool,
    max_pages: u64,
    user_agent: &str,
    force: bool,
    cookies: Option<Arc<Jar>>,
) -> Result<CrawlStats> {
    let engine = CrawlEngine::new(
        site_code,
        base_url,
        out_dir,
        rate_limit_seconds,
        download_assets,
        max_pages,
        user_agent,
        force,
        cookies,
    )?;
    Ok(engine.run(None).await)
}

/// Resubmits failed URLs through a caller-supplied authenticated fetch
///
/// On success the page is extracted and persisted exactly like a crawled
/// page and its record is removed from the failure list; on failure the
/// record is annotated and retained. The fetch function is external to the
/// core (typically backed by a browser session with captured auth state).
pub async fn retry_failed_with_fetch<F, Fut>(
    stats: &mut CrawlStats,
    site_code: &str,
    out_dir: &Path,
    fetch: F,
) -> AuthRetryStats
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = AuthFetchResult>,
{
    let mut retry_stats = AuthRetryStats::default();
    let failed = std::mem::take(&mut stats.failed_urls);
    let mut remaining = Vec::new();

    for mut item in failed {
        retry_stats.attempted += 1;
        let result = fetch(item.url.clone()).await;

        let mut last_error = result.error;
        if let Some(html) = result.html.filter(|html| html.contains("<h1")) {
            let persisted = extract_article(&html, &item.url, site_code, None)
                .map_err(HarvestError::from)
                .and_then(|article| artifacts::save_artifacts(&article, &html, out_dir));
            match persisted {
                Ok(_) => {
                    stats.downloaded += 1;
                    retry_stats.succeeded += 1;
                    continue;
                }
                Err(e) => last_error = Some(e.to_string()),
            }
        }

        item.tried_auth_state = Some(true);
        item.final_status = Some("failed_with_auth_state".to_string());
        item.http_status = result.http_status;
        if let Some(error) = last_error {
            item.error = error;
        }
        remaining.push(item);
    }

    stats.failed_urls = remaining;
    retry_stats
}
