//! Artifact persistence
//!
//! Every successfully fetched page produces three artifacts under the
//! output root, keyed by slug: the raw HTML, the parsed JSON record, and a
//! derived Markdown rendering. The parsed JSON is the unit of
//! resumability: its presence on disk tells a later run to skip the page.
//!
//! Layout:
//! - `raw/<site>/<slug>.html`
//! - `parsed/<site>/<slug>.json`
//! - `parsed/<site>/<slug>.md`
//! - `assets/<site>/<sha1(src)>.<ext>`
//! - `scrape_report.json`

use crate::article::{Image, ParsedArticle};
use crate::crawler::{AuthRetryStats, FailedUrl};
use crate::url::slug_from_url;
use crate::Result;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static URL_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.([a-zA-Z0-9]{3,4})($|\?)").expect("valid pattern"));

/// Saves raw HTML, parsed JSON, and a Markdown rendering for an article
///
/// Returns the raw and parsed artifact paths.
pub fn save_artifacts(
    article: &ParsedArticle,
    raw_html: &str,
    out_dir: &Path,
) -> Result<(PathBuf, PathBuf)> {
    let slug = slug_from_url(&article.url);
    let raw_dir = out_dir.join("raw").join(&article.site_code);
    let parsed_dir = out_dir.join("parsed").join(&article.site_code);
    fs::create_dir_all(&raw_dir)?;
    fs::create_dir_all(&parsed_dir)?;

    let raw_path = raw_dir.join(format!("{slug}.html"));
    let parsed_path = parsed_dir.join(format!("{slug}.json"));
    let md_path = parsed_dir.join(format!("{slug}.md"));

    fs::write(&raw_path, raw_html)?;
    fs::write(&parsed_path, serde_json::to_string_pretty(article)?)?;
    fs::write(&md_path, render_markdown(article))?;

    Ok((raw_path, parsed_path))
}

/// Renders an article as `# title` plus `## heading` / text blocks
fn render_markdown(article: &ParsedArticle) -> String {
    let mut lines = vec![format!("# {}", article.title.trim())];
    for section in &article.sections {
        if let Some(heading) = section.heading.as_deref() {
            if !heading.is_empty() {
                lines.push(format!("## {heading}"));
            }
        }
        if !section.text.is_empty() {
            lines.push(section.text.clone());
        }
    }
    format!("{}\n", lines.join("\n\n").trim())
}

/// Downloads image assets and records local paths back onto the entries
///
/// Best-effort: individual failures are silently skipped and never counted
/// as crawl errors. Files are named by the SHA-1 hex digest of the source
/// URL, with the extension taken from the response content type or the
/// URL itself.
pub async fn download_assets(
    images: &mut [Image],
    out_dir: &Path,
    site_code: &str,
    client: &Client,
) -> u64 {
    if images.is_empty() {
        return 0;
    }
    let assets_dir = out_dir.join("assets").join(site_code);
    if fs::create_dir_all(&assets_dir).is_err() {
        return 0;
    }

    let mut downloaded = 0;
    for image in images.iter_mut() {
        let response = match client.get(&image.src).send().await {
            Ok(response) if response.status().is_success() => response,
            _ => continue,
        };
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let Ok(bytes) = response.bytes().await else {
            continue;
        };

        let extension = guess_extension(content_type.as_deref(), &image.src);
        let name = format!("{}{extension}", hex::encode(Sha1::digest(image.src.as_bytes())));
        let path = assets_dir.join(name);
        if fs::write(&path, &bytes).is_err() {
            continue;
        }
        image.local_path = Some(path.to_string_lossy().into_owned());
        downloaded += 1;
    }
    downloaded
}

fn guess_extension(content_type: Option<&str>, src: &str) -> String {
    if let Some(content_type) = content_type {
        if content_type.contains("png") {
            return ".png".to_string();
        }
        if content_type.contains("jpeg") || content_type.contains("jpg") {
            return ".jpg".to_string();
        }
        if content_type.contains("gif") {
            return ".gif".to_string();
        }
    }
    URL_EXTENSION
        .captures(src)
        .map(|captures| format!(".{}", &captures[1]))
        .unwrap_or_else(|| ".img".to_string())
}

/// Aggregated counters across all site runs of one invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportTotals {
    pub downloaded: u64,
    pub skipped: u64,
    pub errors: u64,
    pub assets: u64,
}

/// The persisted end-of-run report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeReport {
    pub total: ReportTotals,
    pub failed_urls: Vec<FailedUrl>,
    pub retries_with_auth_state: AuthRetryStats,
}

/// Writes `scrape_report.json` under the output root
pub fn write_scrape_report(report: &ScrapeReport, out_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join("scrape_report.json");
    fs::write(&path, serde_json::to_string_pretty(report)?)?;
    Ok(path)
}
