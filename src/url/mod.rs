//! URL canonicalization and scope checks
//!
//! Canonical URLs are the deduplication keys for the crawl frontier and the
//! basis for artifact slugs, so every rule here has to be idempotent:
//! canonicalizing an already-canonical URL must be a no-op.

use crate::{UrlError, UrlResult};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Path prefix that marks a URL as part of the help center.
pub const HELP_CENTER_PREFIX: &str = "/helpcenter/";

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_-]+").expect("valid slug pattern"));

/// Canonicalizes a URL to a stable comparison key
///
/// Strips the query string and fragment, and forces the path to end with
/// exactly one trailing slash so that `/a` and `/a/` map to the same key.
///
/// # Examples
///
/// ```
/// use kb_harvest::url::canonicalize_url;
///
/// let url = canonicalize_url("https://avto.pro/helpcenter/payments/article/?utm=1#top").unwrap();
/// assert_eq!(url, "https://avto.pro/helpcenter/payments/article/");
/// ```
pub fn canonicalize_url(url: &str) -> UrlResult<String> {
    let mut parsed = Url::parse(url).map_err(|e| UrlError::Parse(e.to_string()))?;

    let trimmed = parsed.path().trim_end_matches('/');
    let clean_path = if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("{trimmed}/")
    };
    parsed.set_path(&clean_path);
    parsed.set_query(None);
    parsed.set_fragment(None);

    Ok(parsed.into())
}

/// Returns true if the URL is on the given host and under the help-center prefix
///
/// The host comparison includes an explicit port when one is present, so
/// `127.0.0.1:8080` and `127.0.0.1` are distinct hosts.
pub fn is_in_scope(url: &str, base_host: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            host_key(&parsed) == base_host && parsed.path().starts_with(HELP_CENTER_PREFIX)
        }
        Err(_) => false,
    }
}

/// Returns the host (plus explicit port, if any) used for scope comparisons
pub fn host_key(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

/// Derives a filesystem-safe slug from a URL's final path segment
///
/// Non-alphanumeric characters (other than `-` and `_`) are collapsed to
/// `-`. A URL with no path segments yields `index`; a segment that cleans
/// down to nothing yields `page`.
pub fn slug_from_url(url: &str) -> String {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());

    let last_segment = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .next_back()
        .unwrap_or("index")
        .to_string();

    let slug = NON_SLUG_CHARS.replace_all(&last_segment, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "page".to_string()
    } else {
        slug.to_string()
    }
}
