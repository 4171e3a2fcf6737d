//! Kb-Harvest main entry point
//!
//! Command-line interface for the help-center corpus builder: `scrape`
//! crawls configured sites into raw/parsed artifacts, `chunk` turns parsed
//! articles into the retrieval-ready chunk store.

use anyhow::Context;
use clap::{Parser, Subcommand};
use kb_harvest::artifacts::{write_scrape_report, ReportTotals, ScrapeReport};
use kb_harvest::config::{load_config_with_hash, Config, SiteEntry};
use kb_harvest::crawler::{scrape_site, AuthRetryStats};
use kb_harvest::preprocess::{preprocess_site, write_params, ChunkParams};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Kb-Harvest: a polite help-center corpus builder
#[derive(Parser, Debug)]
#[command(name = "kb-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Help-center crawl-and-chunk corpus builder", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl configured help-center sites into raw/parsed artifacts
    Scrape {
        /// Comma-separated site codes to scrape (defaults to all configured)
        #[arg(long)]
        sites: Option<String>,

        /// Re-download even if a parsed artifact already exists
        #[arg(long)]
        force: bool,

        /// Override the configured page budget (0 = unlimited)
        #[arg(long)]
        max_pages: Option<u64>,

        /// Override the configured seconds between requests
        #[arg(long)]
        rate_limit: Option<f64>,

        /// Override the configured asset-download flag
        #[arg(long)]
        download_assets: Option<bool>,
    },

    /// Chunk parsed articles into the retrieval-ready chunk store
    Chunk {
        /// Comma-separated site codes to preprocess (defaults to all configured)
        #[arg(long)]
        sites: Option<String>,

        /// Re-chunk even if an article's content hash is unchanged
        #[arg(long)]
        force: bool,

        /// Also write one Markdown file of chunk texts per article
        #[arg(long)]
        also_md: bool,

        /// Override the configured chunk size
        #[arg(long)]
        size_chars: Option<usize>,

        /// Override the configured overlap window
        #[arg(long)]
        overlap_chars: Option<usize>,

        /// Override the configured minimum chunk length
        #[arg(long)]
        min_chars: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Scrape {
            sites,
            force,
            max_pages,
            rate_limit,
            download_assets,
        } => {
            handle_scrape(
                &config,
                sites.as_deref(),
                force,
                max_pages,
                rate_limit,
                download_assets,
            )
            .await
        }
        Command::Chunk {
            sites,
            force,
            also_md,
            size_chars,
            overlap_chars,
            min_chars,
        } => handle_chunk(
            &config,
            sites.as_deref(),
            force,
            also_md,
            size_chars,
            overlap_chars,
            min_chars,
        ),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kb_harvest=info,warn"),
            1 => EnvFilter::new("kb_harvest=debug,info"),
            2 => EnvFilter::new("kb_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Splits a comma-separated site-code list, dropping empty entries
fn parse_sites_arg(sites_arg: &str) -> Vec<String> {
    sites_arg
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolves the sites to operate on, warning about unknown codes
fn select_sites<'a>(config: &'a Config, sites_arg: Option<&str>) -> Vec<&'a SiteEntry> {
    match sites_arg {
        None => config.sites.iter().collect(),
        Some(arg) => {
            let mut selected = Vec::new();
            for code in parse_sites_arg(arg) {
                match config.sites.iter().find(|site| site.code == code) {
                    Some(site) => selected.push(site),
                    None => tracing::warn!("No base URL configured for site '{}', skipping", code),
                }
            }
            selected
        }
    }
}

/// Handles the scrape subcommand: crawl each site, then write the report
///
/// Individual page failures never affect the exit code; they are surfaced
/// through the persisted report. Only a configuration failure is fatal.
async fn handle_scrape(
    config: &Config,
    sites_arg: Option<&str>,
    force: bool,
    max_pages: Option<u64>,
    rate_limit: Option<f64>,
    download_assets: Option<bool>,
) -> anyhow::Result<()> {
    let out_dir = PathBuf::from(&config.scrape.out_dir);
    let rate_limit = rate_limit.unwrap_or(config.scrape.rate_limit_seconds);
    let max_pages = max_pages.unwrap_or(config.scrape.max_pages);
    let download_assets = download_assets.unwrap_or(config.scrape.download_assets);

    let mut total = ReportTotals::default();
    let mut failed_urls = Vec::new();

    for site in select_sites(config, sites_arg) {
        tracing::info!("Scraping site={} base={}", site.code, site.base_url);
        let stats = scrape_site(
            &site.code,
            &site.base_url,
            &out_dir,
            rate_limit,
            download_assets,
            max_pages,
            &config.scrape.user_agent,
            force,
            None,
        )
        .await?;
        tracing::info!(
            "{}: downloaded={}, skipped={}, errors={}, assets={}",
            site.code,
            stats.downloaded,
            stats.skipped,
            stats.errors,
            stats.assets
        );
        total.downloaded += stats.downloaded;
        total.skipped += stats.skipped;
        total.errors += stats.errors;
        total.assets += stats.assets;
        failed_urls.extend(stats.failed_urls);
    }

    tracing::info!(
        "Total: downloaded={}, skipped={}, errors={}, assets={}",
        total.downloaded,
        total.skipped,
        total.errors,
        total.assets
    );

    let report = ScrapeReport {
        total,
        failed_urls,
        retries_with_auth_state: AuthRetryStats::default(),
    };
    let report_path = write_scrape_report(&report, &out_dir)?;
    tracing::info!("Report written to {}", report_path.display());
    Ok(())
}

/// Handles the chunk subcommand: preprocess each site's parsed articles
#[allow(clippy::too_many_arguments)]
fn handle_chunk(
    config: &Config,
    sites_arg: Option<&str>,
    force: bool,
    also_md: bool,
    size_chars: Option<usize>,
    overlap_chars: Option<usize>,
    min_chars: Option<usize>,
) -> anyhow::Result<()> {
    let parsed_root = Path::new(&config.scrape.out_dir).join("parsed");
    let out_root = PathBuf::from(&config.chunking.out_dir);
    let params = ChunkParams {
        size_chars: size_chars.unwrap_or(config.chunking.size_chars),
        overlap_chars: overlap_chars.unwrap_or(config.chunking.overlap_chars),
        min_chars: min_chars.unwrap_or(config.chunking.min_chars),
        normalize_bullets: config.chunking.normalize_bullets,
    };

    write_params(&out_root, &params)?;

    for site in select_sites(config, sites_arg) {
        let summary = preprocess_site(
            &site.code,
            &parsed_root,
            &out_root,
            &params,
            also_md,
            force,
        )?;
        tracing::info!(
            "{}: articles={}, chunks={}, errors={}, avg_len={:.1}",
            site.code,
            summary.total_articles,
            summary.total_chunks,
            summary.errors,
            summary.avg_chunk_len
        );
    }
    Ok(())
}
