//! Configuration loading and validation
//!
//! The configuration is constructed once at process start and passed into
//! the crawl and chunking entry points; there is no global state.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{ChunkingConfig, Config, ScrapeConfig, SiteEntry};
pub use validation::validate;
