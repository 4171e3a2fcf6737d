//! Polite HTTP fetcher
//!
//! All page fetches for a crawl run go through one [`PoliteFetcher`], which
//! enforces a minimum inter-request interval and retries transient failures
//! with a fixed backoff schedule. The underlying client is reused across
//! requests for connection reuse and cookie persistence.

use reqwest::cookie::Jar;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};

/// Total attempts per URL, including the first
pub const DEFAULT_RETRIES: usize = 3;

/// Backoff delays indexed by attempt, clamped to the last entry
const BACKOFF_MS: [u64; 3] = [500, 1000, 2000];

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// HTTP statuses that warrant a retry
const RETRYABLE_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

/// Terminal fetch failure, produced after retries exhaust
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },
}

impl FetchError {
    /// The HTTP status, when the failure carries one
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            FetchError::Network { .. } => None,
        }
    }
}

/// A successfully fetched page body
#[derive(Debug)]
pub struct FetchedPage {
    pub body: String,
    pub status: u16,
}

/// What the retry loop should do after a retryable failure
#[derive(Debug, PartialEq, Eq)]
enum RetryDecision {
    Retry(Duration),
    Fail,
}

fn retry_decision(attempt: usize) -> RetryDecision {
    if attempt + 1 >= DEFAULT_RETRIES {
        RetryDecision::Fail
    } else {
        let delay = BACKOFF_MS[attempt.min(BACKOFF_MS.len() - 1)];
        RetryDecision::Retry(Duration::from_millis(delay))
    }
}

/// Builds the HTTP client shared by one crawl run
///
/// An optional cookie jar enables authenticated fetches; it is owned by
/// this client and never shared across concurrent site runs.
pub fn build_http_client(
    user_agent: &str,
    cookies: Option<Arc<Jar>>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);
    if let Some(jar) = cookies {
        builder = builder.cookie_provider(jar);
    }
    builder.build()
}

/// Rate-limited HTTP GET with bounded retry
pub struct PoliteFetcher {
    client: Client,
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl PoliteFetcher {
    pub fn new(client: Client, min_interval: Duration) -> Self {
        Self {
            client,
            min_interval,
            last_request: None,
        }
    }

    /// The underlying client, for best-effort side requests (assets)
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
    }

    /// Fetches a URL, blocking until the rate-limit interval has elapsed
    ///
    /// # Retry policy
    ///
    /// Up to [`DEFAULT_RETRIES`] attempts total. Network failures and HTTP
    /// {429, 500, 502, 503, 504} retry with 0.5s/1s/2s backoff; on the final
    /// attempt they surface as a terminal [`FetchError`]. Any other non-2xx
    /// status fails immediately without retry. A 2xx response
    /// short-circuits and returns the body.
    pub async fn get(&mut self, url: &str) -> Result<FetchedPage, FetchError> {
        let mut attempt = 0;
        loop {
            self.wait_for_rate_limit().await;
            let outcome = self.client.get(url).send().await;
            self.last_request = Some(Instant::now());

            let response = match outcome {
                Ok(response) => response,
                Err(e) => {
                    match retry_decision(attempt) {
                        RetryDecision::Retry(delay) => {
                            tracing::debug!("Network error for {url}, retrying in {delay:?}: {e}");
                            sleep(delay).await;
                            attempt += 1;
                            continue;
                        }
                        RetryDecision::Fail => {
                            return Err(FetchError::Network {
                                url: url.to_string(),
                                message: e.to_string(),
                            });
                        }
                    }
                }
            };

            let status = response.status().as_u16();
            if RETRYABLE_STATUS.contains(&status) {
                match retry_decision(attempt) {
                    RetryDecision::Retry(delay) => {
                        tracing::debug!("HTTP {status} for {url}, retrying in {delay:?}");
                        sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    RetryDecision::Fail => {
                        return Err(FetchError::HttpStatus {
                            url: url.to_string(),
                            status,
                        });
                    }
                }
            }
            if !response.status().is_success() {
                return Err(FetchError::HttpStatus {
                    url: url.to_string(),
                    status,
                });
            }

            let body = response.text().await.map_err(|e| FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            return Ok(FetchedPage { body, status });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for_tests() -> PoliteFetcher {
        let client = build_http_client("kb-harvest-test/1.0", None).expect("client");
        PoliteFetcher::new(client, Duration::from_millis(0))
    }

    #[test]
    fn test_retry_decision_schedule() {
        assert_eq!(
            retry_decision(0),
            RetryDecision::Retry(Duration::from_millis(500))
        );
        assert_eq!(
            retry_decision(1),
            RetryDecision::Retry(Duration::from_millis(1000))
        );
        assert_eq!(retry_decision(2), RetryDecision::Fail);
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let mut fetcher = fetcher_for_tests();
        let page = fetcher
            .get(&format!("{}/page", server.uri()))
            .await
            .expect("fetch");
        assert_eq!(page.body, "hello");
        assert_eq!(page.status, 200);
    }

    #[tokio::test]
    async fn test_retries_on_503_then_succeeds_with_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let mut fetcher = fetcher_for_tests();
        let page = fetcher
            .get(&format!("{}/flaky", server.uri()))
            .await
            .expect("fetch");
        assert_eq!(page.body, "ok");
        // Two retries: 0.5s after the first 503, 1.0s after the second.
        assert!(started.elapsed() >= Duration::from_millis(1400));
    }

    #[tokio::test]
    async fn test_retryable_status_exhausts_to_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mut fetcher = fetcher_for_tests();
        let err = fetcher
            .get(&format!("{}/down", server.uri()))
            .await
            .expect_err("should fail");
        assert_eq!(err.http_status(), Some(503));
    }

    #[tokio::test]
    async fn test_non_retryable_status_fails_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let mut fetcher = fetcher_for_tests();
        let err = fetcher
            .get(&format!("{}/missing", server.uri()))
            .await
            .expect_err("should fail");
        assert_eq!(err.http_status(), Some(404));
        // No backoff sleeps for a non-retryable status.
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_network_error_has_no_status() {
        // Port 1 is never bound, so the connection is refused.
        let mut fetcher = fetcher_for_tests();
        let err = fetcher
            .get("http://127.0.0.1:1/unreachable")
            .await
            .expect_err("should fail");
        assert_eq!(err.http_status(), None);
    }

    #[tokio::test]
    async fn test_rate_limit_spaces_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = build_http_client("kb-harvest-test/1.0", None).expect("client");
        let mut fetcher = PoliteFetcher::new(client, Duration::from_millis(200));
        let url = format!("{}/a", server.uri());

        let started = std::time::Instant::now();
        fetcher.get(&url).await.expect("first");
        fetcher.get(&url).await.expect("second");
        assert!(started.elapsed() >= Duration::from_millis(200));
    }
}
