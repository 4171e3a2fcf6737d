//! Preprocessing: parsed articles to the retrieval-ready chunk store
//!
//! Reads the `parsed/<site>/*.json` artifacts produced by the crawl,
//! chunks each article, and appends line-delimited chunk records to
//! `<site>/chunks.jsonl`. A per-site `index.json` maps slug to content
//! hash so unchanged articles are skipped on re-runs, and a root
//! `_params.json` records the chunking parameters used.

use crate::article::ParsedArticle;
use crate::chunk::{chunk_article, ChunkMetadata};
use crate::text::normalize_text_with;
use crate::url::slug_from_url;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Chunking parameters for one preprocessing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkParams {
    pub size_chars: usize,
    pub overlap_chars: usize,
    pub min_chars: usize,
    pub normalize_bullets: bool,
}

/// One line of the chunk store
#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub site_code: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Per-site preprocessing summary, persisted as `index.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteSummary {
    pub total_articles: u64,
    pub total_chunks: u64,
    pub avg_chunk_len: f64,
    pub per_category_counts: BTreeMap<String, u64>,
    pub errors: u64,
    /// Slug to content hash, merged over the previous index
    pub article_hashes: BTreeMap<String, String>,
}

/// Writes `_params.json` under the chunk-store root
pub fn write_params(out_root: &Path, params: &ChunkParams) -> Result<()> {
    fs::create_dir_all(out_root)?;
    let payload = serde_json::json!({
        "chunk_size_chars": params.size_chars,
        "chunk_overlap_chars": params.overlap_chars,
        "chunk_min_chars": params.min_chars,
        "normalize_bullets": params.normalize_bullets,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    fs::write(
        out_root.join("_params.json"),
        serde_json::to_string_pretty(&payload)?,
    )?;
    Ok(())
}

/// Loads a parsed-article artifact from disk
pub fn load_article(path: &Path) -> Result<ParsedArticle> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Loads the slug-to-hash map from a previous index, tolerating absence
fn load_index(path: &Path) -> BTreeMap<String, String> {
    let Ok(content) = fs::read_to_string(path) else {
        return BTreeMap::new();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&content) else {
        return BTreeMap::new();
    };
    value
        .get("article_hashes")
        .and_then(|hashes| hashes.as_object())
        .map(|hashes| {
            hashes
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Preprocesses one site's parsed articles into the chunk store
///
/// Articles whose content hash matches the previous index are skipped
/// unless `force` is set. Chunk records are appended to `chunks.jsonl`;
/// chunks are therefore superseded, not merged, on re-runs. Per-article
/// failures are counted and skipped, never fatal.
pub fn preprocess_site(
    site_code: &str,
    parsed_root: &Path,
    out_root: &Path,
    params: &ChunkParams,
    write_md: bool,
    force: bool,
) -> Result<SiteSummary> {
    let parsed_dir = parsed_root.join(site_code);
    if !parsed_dir.exists() {
        return Ok(SiteSummary::default());
    }

    let site_out = out_root.join(site_code);
    fs::create_dir_all(&site_out)?;
    let chunks_path = site_out.join("chunks.jsonl");
    let index_path = site_out.join("index.json");
    let previous_hashes = load_index(&index_path);

    let mut article_files: Vec<_> = fs::read_dir(&parsed_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    article_files.sort();

    let mut summary = SiteSummary::default();
    let mut chunk_lens: Vec<usize> = Vec::new();
    let mut lines: Vec<String> = Vec::new();

    for article_file in &article_files {
        match preprocess_article(
            article_file,
            site_code,
            &site_out,
            params,
            write_md,
            force,
            &previous_hashes,
            &mut summary,
            &mut chunk_lens,
            &mut lines,
        ) {
            Ok(()) => {}
            Err(e) => {
                tracing::warn!("Failed to preprocess {}: {}", article_file.display(), e);
                summary.errors += 1;
            }
        }
    }

    if !lines.is_empty() {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&chunks_path)?;
        for line in &lines {
            writeln!(file, "{line}")?;
        }
    }

    summary.avg_chunk_len = if chunk_lens.is_empty() {
        0.0
    } else {
        chunk_lens.iter().sum::<usize>() as f64 / chunk_lens.len() as f64
    };
    let mut merged_hashes = previous_hashes;
    merged_hashes.append(&mut summary.article_hashes);
    summary.article_hashes = merged_hashes;

    fs::write(&index_path, serde_json::to_string_pretty(&summary)?)?;
    Ok(summary)
}

#[allow(clippy::too_many_arguments)]
fn preprocess_article(
    article_file: &Path,
    site_code: &str,
    site_out: &Path,
    params: &ChunkParams,
    write_md: bool,
    force: bool,
    previous_hashes: &BTreeMap<String, String>,
    summary: &mut SiteSummary,
    chunk_lens: &mut Vec<usize>,
    lines: &mut Vec<String>,
) -> Result<()> {
    let article = load_article(article_file)?;
    let slug = slug_from_url(&article.url);
    let source_hash = article.source_hash();
    if !force && previous_hashes.get(&slug) == Some(&source_hash) {
        return Ok(());
    }

    let chunks = chunk_article(
        &article,
        params.size_chars,
        params.overlap_chars,
        params.min_chars,
    );
    if chunks.is_empty() {
        return Ok(());
    }
    summary.total_articles += 1;
    summary.total_chunks += chunks.len() as u64;
    summary.article_hashes.insert(slug.clone(), source_hash);

    let mut md_parts: Vec<String> = Vec::new();
    for chunk in chunks {
        if write_md {
            md_parts.push(chunk.text.clone());
        }
        chunk_lens.push(chunk.metadata.char_len);
        *summary
            .per_category_counts
            .entry(chunk.metadata.category.clone())
            .or_insert(0) += 1;
        let record = ChunkRecord {
            id: chunk.id,
            site_code: chunk.metadata.site_code.clone(),
            text: normalize_text_with(&chunk.text, params.normalize_bullets),
            metadata: chunk.metadata,
        };
        lines.push(serde_json::to_string(&record)?);
    }

    if write_md {
        fs::write(site_out.join(format!("{slug}.md")), md_parts.join("\n\n"))?;
    }
    Ok(())
}
