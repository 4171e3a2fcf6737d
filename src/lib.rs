//! Kb-Harvest: a polite help-center corpus builder
//!
//! This crate ingests a multi-locale help-center website into a normalized,
//! retrieval-ready corpus: it crawls article pages politely, extracts
//! structured content, and splits that content into bounded, overlap-aware
//! text chunks with stable identifiers and provenance metadata.

pub mod article;
pub mod artifacts;
pub mod chunk;
pub mod config;
pub mod crawler;
pub mod preprocess;
pub mod text;
pub mod url;

use thiserror::Error;

/// Main error type for Kb-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),
}

/// Result type alias for Kb-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use article::{extract_article, parse_index, Image, ParsedArticle, Section};
pub use chunk::{chunk_article, Chunk, ChunkMetadata};
pub use config::Config;
pub use crawler::{scrape_site, CrawlStats, FailedUrl, FetchError, PoliteFetcher};
pub use url::{canonicalize_url, is_in_scope, slug_from_url};
