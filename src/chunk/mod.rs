//! Chunking engine
//!
//! Turns one [`ParsedArticle`] into an ordered list of bounded,
//! overlap-aware text chunks. Pure: each call depends only on its input
//! article and the three size parameters, so chunking parallelizes across
//! articles with no shared state.

mod split;

pub use split::DEFAULT_SEPARATORS;

use crate::article::ParsedArticle;
use crate::text::normalize_text;
use crate::url::slug_from_url;
use serde::{Deserialize, Serialize};

/// Placeholder heading for articles that only have flattened plain text
const NO_HEADING: &str = "(no_heading)";

/// Provenance metadata attached to every chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_url: String,
    pub locale: String,
    pub site_code: String,
    pub category: String,
    pub doc_title: String,
    pub section_heading: String,
    pub chunk_index: usize,
    pub char_len: usize,
    /// The article's content hash, propagated verbatim to every chunk
    pub source_hash: String,
}

/// A bounded span of normalized article text plus provenance metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// `{locale}|{slug}|{sectionIdx}|{chunkIdx}`
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Splits an article into size-bounded, overlap-aware chunks
///
/// Sections are processed in order, each normalized and run through the
/// recursive split / overlap / merge-small pipeline. An article without
/// usable sections falls back to one synthetic section over its plain
/// text. Malformed input (neither sections nor plain text) yields zero
/// chunks, never an error.
///
/// The chunk counter runs per article, not per section, so chunk IDs are
/// unique within an article and ordered by emission.
pub fn chunk_article(
    article: &ParsedArticle,
    chunk_size_chars: usize,
    chunk_overlap_chars: usize,
    chunk_min_chars: usize,
) -> Vec<Chunk> {
    let slug = slug_from_url(&article.url);
    let source_hash = article.source_hash();

    let mut chunks = Vec::new();
    let mut chunk_counter = 0;
    for (section_index, heading, raw_text) in section_entries(article) {
        let normalized = normalize_text(&raw_text);
        if normalized.is_empty() {
            continue;
        }
        for text in split::section_chunks(
            &normalized,
            chunk_size_chars,
            chunk_overlap_chars,
            chunk_min_chars,
        ) {
            let char_len = text.chars().count();
            chunks.push(Chunk {
                id: format!(
                    "{}|{}|{}|{}",
                    article.locale, slug, section_index, chunk_counter
                ),
                metadata: ChunkMetadata {
                    source_url: article.url.clone(),
                    locale: article.locale.clone(),
                    site_code: article.site_code.clone(),
                    category: article.category.clone(),
                    doc_title: article.title.clone(),
                    section_heading: heading.clone(),
                    chunk_index: chunk_counter,
                    char_len,
                    source_hash: source_hash.clone(),
                },
                text,
            });
            chunk_counter += 1;
        }
    }
    chunks
}

/// Sections to chunk, or one synthetic plain-text section as fallback
fn section_entries(article: &ParsedArticle) -> Vec<(usize, String, String)> {
    if !article.sections.is_empty() {
        let entries: Vec<_> = article
            .sections
            .iter()
            .enumerate()
            .filter(|(_, section)| !section.text.trim().is_empty())
            .map(|(index, section)| {
                (
                    index,
                    section.heading.clone().unwrap_or_default(),
                    section.text.clone(),
                )
            })
            .collect();
        if !entries.is_empty() {
            return entries;
        }
    }
    vec![(0, NO_HEADING.to_string(), article.plain_text.clone())]
}
