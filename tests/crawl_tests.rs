//! Integration tests for the crawl engine
//!
//! These tests use wiremock to stand up a mock help center and exercise
//! the full crawl cycle end-to-end: index seeding, frontier traversal,
//! artifact persistence, resume semantics, budgets, and failure accounting.

use kb_harvest::article::ParsedArticle;
use kb_harvest::crawler::scrape_site;
use sha1::{Digest, Sha1};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_AGENT: &str = "kb-harvest-test/1.0";

fn index_html() -> String {
    r#"<html lang="ru"><body>
        <h1>Help center</h1>
        <h2>Payments</h2>
        <ul>
            <li><a href="/helpcenter/payments/article-one/">One</a></li>
            <li><a href="/helpcenter/payments/article-two/">Two</a></li>
        </ul>
    </body></html>"#
        .to_string()
}

fn article_html(title: &str, cross_link: Option<&str>) -> String {
    let link = cross_link
        .map(|href| format!(r#"<a href="{href}">Related</a>"#))
        .unwrap_or_default();
    format!(
        r#"<html lang="ru-RU"><body>
        <main>
            <h1>{title}</h1>
            <p>Opening paragraph for {title}.</p>
            <h2>Steps</h2>
            <p>Follow the steps carefully.</p>
            {link}
        </main>
        </body></html>"#
    )
}

async fn mount_page(server: &MockServer, url_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

async fn standard_site(server: &MockServer) {
    mount_page(server, "/helpcenter/", index_html()).await;
    mount_page(
        server,
        "/helpcenter/payments/article-one/",
        article_html("Article one", Some("/helpcenter/payments/article-three/")),
    )
    .await;
    mount_page(
        server,
        "/helpcenter/payments/article-two/",
        article_html("Article two", None),
    )
    .await;
    mount_page(
        server,
        "/helpcenter/payments/article-three/",
        article_html("Article three", None),
    )
    .await;
}

#[tokio::test]
async fn test_full_crawl_persists_artifacts_and_follows_links() {
    let server = MockServer::start().await;
    standard_site(&server).await;
    let out_dir = tempfile::tempdir().expect("tempdir");
    let base_url = format!("{}/helpcenter/", server.uri());

    let stats = scrape_site(
        "ru", &base_url, out_dir.path(), 0.0, false, 0, USER_AGENT, false, None,
    )
    .await
    .expect("scrape");

    // Two index links plus the link discovered on article one.
    assert_eq!(stats.downloaded, 3);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.errors, 0);
    assert!(stats.failed_urls.is_empty());

    for slug in ["article-one", "article-two", "article-three"] {
        assert!(out_dir.path().join(format!("raw/ru/{slug}.html")).exists());
        assert!(out_dir.path().join(format!("parsed/ru/{slug}.json")).exists());
        assert!(out_dir.path().join(format!("parsed/ru/{slug}.md")).exists());
    }

    let parsed: ParsedArticle = serde_json::from_str(
        &std::fs::read_to_string(out_dir.path().join("parsed/ru/article-one.json"))
            .expect("read"),
    )
    .expect("parse");
    assert_eq!(parsed.title, "Article one");
    assert_eq!(parsed.site_code, "ru");
    assert_eq!(parsed.locale, "ru");
    assert_eq!(parsed.category, "Payments");
    assert_eq!(parsed.sections.len(), 1);
    assert_eq!(parsed.content_hash.len(), 64);
    assert_eq!(parsed.outbound_links.len(), 1);

    // The discovered article carries the category hint forward.
    let discovered: ParsedArticle = serde_json::from_str(
        &std::fs::read_to_string(out_dir.path().join("parsed/ru/article-three.json"))
            .expect("read"),
    )
    .expect("parse");
    assert_eq!(discovered.category, "Payments");

    let markdown = std::fs::read_to_string(out_dir.path().join("parsed/ru/article-one.md"))
        .expect("read");
    assert!(markdown.starts_with("# Article one"));
    assert!(markdown.contains("## Steps"));
}

#[tokio::test]
async fn test_rerun_skips_existing_artifacts() {
    let server = MockServer::start().await;
    standard_site(&server).await;
    let out_dir = tempfile::tempdir().expect("tempdir");
    let base_url = format!("{}/helpcenter/", server.uri());

    let first = scrape_site(
        "ru", &base_url, out_dir.path(), 0.0, false, 0, USER_AGENT, false, None,
    )
    .await
    .expect("scrape");
    assert_eq!(first.downloaded, 3);

    let second = scrape_site(
        "ru", &base_url, out_dir.path(), 0.0, false, 0, USER_AGENT, false, None,
    )
    .await
    .expect("scrape");
    assert_eq!(second.downloaded, 0);
    // Only the two index links are revisited: nothing is fetched, so the
    // cross-link on article one is never rediscovered.
    assert_eq!(second.skipped, 2);
    assert_eq!(second.errors, 0);
}

#[tokio::test]
async fn test_force_refetches_existing_artifacts() {
    let server = MockServer::start().await;
    standard_site(&server).await;
    let out_dir = tempfile::tempdir().expect("tempdir");
    let base_url = format!("{}/helpcenter/", server.uri());

    scrape_site(
        "ru", &base_url, out_dir.path(), 0.0, false, 0, USER_AGENT, false, None,
    )
    .await
    .expect("scrape");

    let forced = scrape_site(
        "ru", &base_url, out_dir.path(), 0.0, false, 0, USER_AGENT, true, None,
    )
    .await
    .expect("scrape");
    assert_eq!(forced.downloaded, 3);
    assert_eq!(forced.skipped, 0);
}

#[tokio::test]
async fn test_page_failure_does_not_abort_crawl() {
    let server = MockServer::start().await;
    let out_dir = tempfile::tempdir().expect("tempdir");
    let base_url = format!("{}/helpcenter/", server.uri());

    let index = r#"<html><body>
        <h2>Payments</h2>
        <ul>
            <li><a href="/helpcenter/payments/broken/">Broken</a></li>
            <li><a href="/helpcenter/payments/article-two/">Two</a></li>
        </ul>
    </body></html>"#;
    mount_page(&server, "/helpcenter/", index.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/helpcenter/payments/broken/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/helpcenter/payments/article-two/",
        article_html("Article two", None),
    )
    .await;

    let stats = scrape_site(
        "ru", &base_url, out_dir.path(), 0.0, false, 0, USER_AGENT, false, None,
    )
    .await
    .expect("scrape");

    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.failed_urls.len(), 1);
    let failure = &stats.failed_urls[0];
    assert!(failure.url.ends_with("/helpcenter/payments/broken/"));
    assert_eq!(failure.http_status, Some(404));
    assert_eq!(failure.site_code, "ru");
}

#[tokio::test]
async fn test_index_failure_reports_one_error_and_stops() {
    let server = MockServer::start().await;
    let out_dir = tempfile::tempdir().expect("tempdir");
    let base_url = format!("{}/helpcenter/", server.uri());

    Mock::given(method("GET"))
        .and(path("/helpcenter/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let stats = scrape_site(
        "ru", &base_url, out_dir.path(), 0.0, false, 0, USER_AGENT, false, None,
    )
    .await
    .expect("scrape");

    assert_eq!(stats.downloaded, 0);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.failed_urls.len(), 1);
    assert_eq!(stats.failed_urls[0].url, base_url);
}

#[tokio::test]
async fn test_page_budget_limits_downloads() {
    let server = MockServer::start().await;
    standard_site(&server).await;
    let out_dir = tempfile::tempdir().expect("tempdir");
    let base_url = format!("{}/helpcenter/", server.uri());

    let stats = scrape_site(
        "ru", &base_url, out_dir.path(), 0.0, false, 1, USER_AGENT, false, None,
    )
    .await
    .expect("scrape");

    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn test_duplicate_index_links_fetched_once() {
    let server = MockServer::start().await;
    let out_dir = tempfile::tempdir().expect("tempdir");
    let base_url = format!("{}/helpcenter/", server.uri());

    // The same article listed twice, once without trailing slash.
    let index = r#"<html><body>
        <h2>Payments</h2>
        <ul>
            <li><a href="/helpcenter/payments/article-one/">One</a></li>
            <li><a href="/helpcenter/payments/article-one">One again</a></li>
        </ul>
    </body></html>"#;
    mount_page(&server, "/helpcenter/", index.to_string()).await;
    mount_page(
        &server,
        "/helpcenter/payments/article-one/",
        article_html("Article one", None),
    )
    .await;

    let stats = scrape_site(
        "ru", &base_url, out_dir.path(), 0.0, false, 0, USER_AGENT, false, None,
    )
    .await
    .expect("scrape");

    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.skipped, 0);
}

#[tokio::test]
async fn test_asset_download_records_local_path() {
    let server = MockServer::start().await;
    let out_dir = tempfile::tempdir().expect("tempdir");
    let base_url = format!("{}/helpcenter/", server.uri());

    let index = r#"<html><body>
        <h2>Payments</h2>
        <ul><li><a href="/helpcenter/payments/article-one/">One</a></li></ul>
    </body></html>"#;
    let article = r#"<html lang="ru"><body><main>
        <h1>Article one</h1>
        <p>Body text.</p>
        <img src="/images/card.png" alt="card">
    </main></body></html>"#;
    mount_page(&server, "/helpcenter/", index.to_string()).await;
    mount_page(&server, "/helpcenter/payments/article-one/", article.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/images/card.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(&b"png-bytes"[..], "image/png"))
        .mount(&server)
        .await;

    let stats = scrape_site(
        "ru", &base_url, out_dir.path(), 0.0, true, 0, USER_AGENT, false, None,
    )
    .await
    .expect("scrape");

    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.assets, 1);

    let image_url = format!("{}/images/card.png", server.uri());
    let asset_name = format!("{}.png", hex::encode(Sha1::digest(image_url.as_bytes())));
    let asset_path = out_dir.path().join("assets/ru").join(&asset_name);
    assert!(asset_path.exists(), "missing asset {}", asset_path.display());

    let parsed: ParsedArticle = serde_json::from_str(
        &std::fs::read_to_string(out_dir.path().join("parsed/ru/article-one.json"))
            .expect("read"),
    )
    .expect("parse");
    assert_eq!(
        parsed.images[0].local_path.as_deref(),
        Some(asset_path.to_string_lossy().as_ref())
    );
}

#[tokio::test]
async fn test_asset_failure_is_silent() {
    let server = MockServer::start().await;
    let out_dir = tempfile::tempdir().expect("tempdir");
    let base_url = format!("{}/helpcenter/", server.uri());

    let index = r#"<html><body>
        <h2>Payments</h2>
        <ul><li><a href="/helpcenter/payments/article-one/">One</a></li></ul>
    </body></html>"#;
    let article = r#"<html lang="ru"><body><main>
        <h1>Article one</h1>
        <p>Body text.</p>
        <img src="/images/missing.png" alt="gone">
    </main></body></html>"#;
    mount_page(&server, "/helpcenter/", index.to_string()).await;
    mount_page(&server, "/helpcenter/payments/article-one/", article.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/images/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let stats = scrape_site(
        "ru", &base_url, out_dir.path(), 0.0, true, 0, USER_AGENT, false, None,
    )
    .await
    .expect("scrape");

    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.assets, 0);
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn test_out_of_scope_links_not_followed() {
    let server = MockServer::start().await;
    let out_dir = tempfile::tempdir().expect("tempdir");
    let base_url = format!("{}/helpcenter/", server.uri());

    let index = r#"<html><body>
        <h2>Payments</h2>
        <ul><li><a href="/helpcenter/payments/article-one/">One</a></li></ul>
    </body></html>"#;
    let article = r#"<html lang="ru"><body><main>
        <h1>Article one</h1>
        <p>Body text.</p>
        <a href="/blog/off-topic/">Blog</a>
        <a href="https://elsewhere.example/helpcenter/foreign/">Foreign</a>
    </main></body></html>"#;
    mount_page(&server, "/helpcenter/", index.to_string()).await;
    mount_page(&server, "/helpcenter/payments/article-one/", article.to_string()).await;

    let stats = scrape_site(
        "ru", &base_url, out_dir.path(), 0.0, false, 0, USER_AGENT, false, None,
    )
    .await
    .expect("scrape");

    assert_eq!(stats.downloaded, 1);
    assert!(!out_dir.path().join("parsed/ru/off-topic.json").exists());

    let parsed: ParsedArticle = serde_json::from_str(
        &std::fs::read_to_string(out_dir.path().join("parsed/ru/article-one.json"))
            .expect("read"),
    )
    .expect("parse");
    assert!(parsed.outbound_links.is_empty());
}

#[tokio::test]
async fn test_override_seed_list_bypasses_index() {
    let server = MockServer::start().await;
    let out_dir = tempfile::tempdir().expect("tempdir");
    let base_url = format!("{}/helpcenter/", server.uri());

    // No index mounted: the override list must be the only seed source.
    mount_page(
        &server,
        "/helpcenter/payments/article-two/",
        article_html("Article two", None),
    )
    .await;

    let engine = kb_harvest::crawler::CrawlEngine::new(
        "ru", &base_url, out_dir.path(), 0.0, false, 0, USER_AGENT, false, None,
    )
    .expect("engine");
    let seeds = vec![(
        format!("{}/helpcenter/payments/article-two/", server.uri()),
        "Payments".to_string(),
    )];
    let stats = engine.run(Some(seeds)).await;

    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.errors, 0);
    assert!(out_dir.path().join("parsed/ru/article-two.json").exists());
}
