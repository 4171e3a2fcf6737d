//! HTML extraction for index and article pages
//!
//! The extractor turns one fetched document into a [`ParsedArticle`]:
//! title, heading-scoped sections, flattened plain text, image references,
//! and in-scope outbound links. No network or file I/O happens here.

use crate::article::{Image, ParsedArticle, Section};
use crate::url::{canonicalize_url, host_key, is_in_scope};
use crate::UrlError;
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};
use url::Url;

/// Elements whose subtrees never contain article content
const STRIP_TAGS: &[&str] = &["header", "footer", "nav", "aside", "script", "style"];

/// Elements that can scope an article body around its title
const CONTAINER_TAGS: &[&str] = &["main", "article", "section", "div"];

/// One article link discovered on an index page
#[derive(Debug, Clone)]
pub struct IndexLink {
    /// Canonical article URL
    pub url: String,
    /// Category heading the link was listed under
    pub category: String,
    pub link_text: String,
}

/// Parses an index page into article links with their category headings
///
/// Every `<h2>` is treated as a category; the first `<ul>`/`<ol>` sibling
/// that follows it supplies the article anchors. Links that resolve outside
/// `base_url` are dropped.
pub fn parse_index(html: &str, base_url: &str) -> Vec<IndexLink> {
    let document = Html::parse_document(html);
    let mut results = Vec::new();

    let Ok(h2_selector) = Selector::parse("h2") else {
        return results;
    };
    let Ok(anchor_selector) = Selector::parse("a[href]") else {
        return results;
    };
    let Ok(base) = Url::parse(base_url) else {
        return results;
    };

    for h2 in document.select(&h2_selector) {
        let category = collapsed_text(h2);

        // Some locales put decorative markup between the heading and its
        // list; scan forward to the first list sibling.
        let list = h2
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| matches!(el.value().name(), "ul" | "ol"));
        let Some(list) = list else {
            continue;
        };

        for anchor in list.select(&anchor_selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if href.is_empty() {
                continue;
            }
            let Ok(link) = base.join(href) else {
                continue;
            };
            if !link.as_str().starts_with(base_url) {
                continue;
            }
            let Ok(canonical) = canonicalize_url(link.as_str()) else {
                continue;
            };
            results.push(IndexLink {
                url: canonical,
                category: category.clone(),
                link_text: collapsed_text(anchor),
            });
        }
    }

    results
}

/// Extracts structured fields from article HTML
///
/// # Algorithm
///
/// 1. Detect the locale from `<html lang>`, keeping only the primary
///    subtag, falling back to the site code.
/// 2. Title = first `<h1>`, else the document `<title>`.
/// 3. Scope extraction to the nearest `main`/`article`/`section`/`div`
///    ancestor of the title; fall back to `<body>`, then the document.
/// 4. Ignore `header`/`footer`/`nav`/`aside`/`script`/`style` subtrees.
/// 5. Walk the container in document order: `h2`/`h3` start sections,
///    `p`/`li` append to the open section; `h1`/`h2`/`h3`/`p`/`li` feed the
///    flattened plain text independently of section grouping.
pub fn extract_article(
    html: &str,
    url: &str,
    site_code: &str,
    category_hint: Option<&str>,
) -> Result<ParsedArticle, UrlError> {
    let page_url = Url::parse(url).map_err(|e| UrlError::Parse(e.to_string()))?;
    let base_host = host_key(&page_url);
    let document = Html::parse_document(html);

    let locale = detect_locale(&document, site_code);

    let title_element = first_match(&document, "h1").or_else(|| first_match(&document, "title"));
    let title = title_element.map(collapsed_text).unwrap_or_default();

    let container = title_element
        .and_then(|el| {
            el.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|a| CONTAINER_TAGS.contains(&a.value().name()))
        })
        .or_else(|| first_match(&document, "body"))
        .unwrap_or_else(|| document.root_element());

    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;
    let mut text_blocks: Vec<String> = Vec::new();
    let mut images: Vec<Image> = Vec::new();
    let mut outbound_links: Vec<String> = Vec::new();

    for node in container.descendants() {
        if node.id() == container.id() {
            continue;
        }
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        if in_stripped_subtree(element, container) {
            continue;
        }

        match element.value().name() {
            "h1" => {
                let text = collapsed_text(element);
                if !text.is_empty() {
                    text_blocks.push(text);
                }
            }
            "h2" | "h3" => {
                if let Some(section) = current.take() {
                    sections.push(section);
                }
                let heading = collapsed_text(element);
                if !heading.is_empty() {
                    text_blocks.push(heading.clone());
                }
                current = Some(Section {
                    heading: Some(heading),
                    text: String::new(),
                });
            }
            "p" | "li" => {
                let text = collapsed_text(element);
                if text.is_empty() {
                    continue;
                }
                text_blocks.push(text.clone());
                if let Some(section) = current.as_mut() {
                    if section.text.is_empty() {
                        section.text = text;
                    } else {
                        section.text.push('\n');
                        section.text.push_str(&text);
                    }
                }
            }
            "img" => {
                let Some(src) = element.value().attr("src") else {
                    continue;
                };
                if src.is_empty() {
                    continue;
                }
                let Ok(absolute) = page_url.join(src) else {
                    continue;
                };
                images.push(Image {
                    src: absolute.into(),
                    alt: element.value().attr("alt").unwrap_or_default().to_string(),
                    local_path: None,
                });
            }
            "a" => {
                let Some(href) = element.value().attr("href") else {
                    continue;
                };
                if href.is_empty() {
                    continue;
                }
                let Ok(absolute) = page_url.join(href) else {
                    continue;
                };
                if !is_in_scope(absolute.as_str(), &base_host) {
                    continue;
                }
                if let Ok(canonical) = canonicalize_url(absolute.as_str()) {
                    outbound_links.push(canonical);
                }
            }
            _ => {}
        }
    }
    if let Some(section) = current.take() {
        sections.push(section);
    }

    let plain_text = text_blocks.join("\n").trim().to_string();
    let content_hash = hex::encode(Sha256::digest(plain_text.as_bytes()));

    Ok(ParsedArticle {
        url: canonicalize_url(url)?,
        site_code: site_code.to_string(),
        locale,
        category: category_hint.unwrap_or_default().to_string(),
        title,
        sections,
        plain_text,
        images,
        outbound_links,
        content_hash,
    })
}

/// Detects the document locale, keeping only the primary language subtag
fn detect_locale(document: &Html, fallback: &str) -> String {
    let lang = document
        .root_element()
        .value()
        .attr("lang")
        .unwrap_or_default();
    let lang = if lang.is_empty() { fallback } else { lang }.to_lowercase();
    let primary = lang.split('-').next().unwrap_or_default();
    if primary.is_empty() {
        fallback.to_string()
    } else {
        primary.to_string()
    }
}

fn first_match<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

/// Returns the element's text with inter-element whitespace collapsed
fn collapsed_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when the element sits under a stripped subtree within the container
fn in_stripped_subtree(element: ElementRef, container: ElementRef) -> bool {
    for ancestor in element.ancestors() {
        if ancestor.id() == container.id() {
            return false;
        }
        if let Some(ancestor) = ElementRef::wrap(ancestor) {
            if STRIP_TAGS.contains(&ancestor.value().name()) {
                return true;
            }
        }
    }
    false
}
