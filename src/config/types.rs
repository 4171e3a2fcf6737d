use serde::Deserialize;

/// Main configuration structure for Kb-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scrape: ScrapeConfig,
    pub chunking: ChunkingConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteEntry>,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    /// Output root for raw/parsed/assets artifacts
    #[serde(rename = "out-dir")]
    pub out_dir: String,

    /// Minimum time between requests, in seconds
    #[serde(rename = "rate-limit-seconds", default = "default_rate_limit")]
    pub rate_limit_seconds: f64,

    /// User-agent string sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Whether to download referenced images
    #[serde(rename = "download-assets", default = "default_true")]
    pub download_assets: bool,

    /// Page budget per site (0 = unlimited)
    #[serde(rename = "max-pages", default)]
    pub max_pages: u64,
}

/// Chunking parameters
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkingConfig {
    /// Output root for the chunk store
    #[serde(rename = "out-dir")]
    pub out_dir: String,

    /// Target chunk size in characters
    #[serde(rename = "size-chars", default = "default_size_chars")]
    pub size_chars: usize,

    /// Overlap window carried between adjacent chunks
    #[serde(rename = "overlap-chars", default = "default_overlap_chars")]
    pub overlap_chars: usize,

    /// Chunks below this length are merged into their successor
    #[serde(rename = "min-chars", default = "default_min_chars")]
    pub min_chars: usize,

    /// Fold bullet glyphs to `- ` during final normalization
    #[serde(rename = "normalize-bullets", default = "default_true")]
    pub normalize_bullets: bool,
}

/// One help-center site to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Short site identifier (e.g. "ru")
    pub code: String,

    /// Help-center index URL
    #[serde(rename = "base-url")]
    pub base_url: String,
}

fn default_rate_limit() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_size_chars() -> usize {
    1200
}

fn default_overlap_chars() -> usize {
    200
}

fn default_min_chars() -> usize {
    300
}
