//! Parsed-article data model
//!
//! A [`ParsedArticle`] is the unit of resumability for the crawl: its JSON
//! artifact on disk is the signal that a page has already been processed.
//! Instances are created once per fetched page and never mutated afterwards
//! (asset download fills in image paths before persistence).

mod extract;

pub use extract::{extract_article, parse_index, IndexLink};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One heading-scoped block of article body text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub heading: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// An image reference found in an article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    #[serde(default)]
    pub alt: String,
    /// Local file path, filled in when assets are downloaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
}

/// Structured content extracted from one help-center page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedArticle {
    /// Canonical page URL
    pub url: String,
    pub site_code: String,
    /// Locale detected from the document, falling back to the site code
    pub locale: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Newline-joined text of every heading/paragraph/list item
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub images: Vec<Image>,
    /// In-scope outbound links, canonicalized
    #[serde(default)]
    pub outbound_links: Vec<String>,
    /// SHA-256 hex digest of the plain text
    #[serde(default)]
    pub content_hash: String,
}

impl ParsedArticle {
    /// Returns the stored content hash, or computes it from the plain text
    ///
    /// This value is propagated verbatim to every chunk of the article so
    /// downstream consumers can detect unchanged articles across runs.
    pub fn source_hash(&self) -> String {
        if !self.content_hash.is_empty() {
            return self.content_hash.clone();
        }
        hex::encode(Sha256::digest(self.plain_text.as_bytes()))
    }
}
