//! Text normalization helpers
//!
//! Raw extracted text carries HTML entities, zero-width characters, mixed
//! bullet glyphs, and uneven whitespace. Everything that reaches the
//! chunking engine goes through [`normalize_text`] first so chunk sizes and
//! overlaps are computed against a canonical form.

use html_escape::decode_html_entities;
use regex::Regex;
use std::sync::LazyLock;

static ZERO_WIDTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\u{200b}\u{200c}\u{200d}\u{2060}]").expect("valid pattern"));

static MULTISPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid pattern"));

static MULTI_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("valid pattern"));

static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.!?;:])").expect("valid pattern"));

static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[-\u{2022}\u{2023}\u{2043}\u{2219}\u{25E6}\u{204C}\u{204D}\u{2212}\u{2013}\u{2014}*]\s*",
    )
    .expect("valid pattern")
});

/// Cleans and normalizes text for chunking, folding bullet glyphs to `- `
pub fn normalize_text(text: &str) -> String {
    normalize_text_with(text, true)
}

/// Cleans and normalizes text for chunking
///
/// Applied in order: HTML entity unescape, zero-width character removal,
/// non-breaking-space replacement, horizontal whitespace collapse, newline
/// canonicalization, blank-line run collapse, optional bullet folding,
/// space-before-punctuation fix, final trim.
pub fn normalize_text_with(text: &str, fold_bullets: bool) -> String {
    let cleaned = decode_html_entities(text);
    let cleaned = ZERO_WIDTH.replace_all(&cleaned, "");
    let cleaned = cleaned.replace('\u{a0}', " ");
    let cleaned = MULTISPACE.replace_all(&cleaned, " ");
    let cleaned = cleaned.replace("\r\n", "\n").replace('\r', "\n");
    let cleaned = MULTI_NEWLINE.replace_all(&cleaned, "\n\n");
    let cleaned = if fold_bullets {
        BULLET.replace_all(&cleaned, "- ").into_owned()
    } else {
        cleaned.into_owned()
    };
    let cleaned = SPACE_BEFORE_PUNCT.replace_all(&cleaned, "$1");
    cleaned.trim().to_string()
}
