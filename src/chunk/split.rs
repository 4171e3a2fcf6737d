//! Recursive separator splitting, overlap, and small-chunk merging
//!
//! All lengths here are measured in characters, not bytes, so multi-byte
//! text never splits mid-character. The separator priority order is
//! behaviorally significant and must not change: paragraph breaks first,
//! then lines, then sentences, then words, then a hard character window.

/// Separator priority for recursive splitting
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits text into pieces no longer than `max_len` characters
///
/// Splits on the first separator, greedily re-joining adjacent pieces with
/// that separator as long as the joined length stays within `max_len`.
/// Pieces still too long recurse onto the next separator; once separators
/// are exhausted, oversized pieces are hard-windowed into fixed-size
/// character slices.
pub(crate) fn split_by_separators(text: &str, max_len: usize, separators: &[&str]) -> Vec<String> {
    if char_len(text) <= max_len || separators.is_empty() {
        return vec![text.to_string()];
    }
    let separator = separators[0];
    let separator_len = char_len(separator);

    let mut chunks: Vec<String> = Vec::new();
    let mut buffer = String::new();
    for part in text.split(separator) {
        let candidate_len = if buffer.is_empty() {
            char_len(part)
        } else {
            char_len(&buffer) + separator_len + char_len(part)
        };
        if candidate_len <= max_len {
            if buffer.is_empty() {
                buffer = part.to_string();
            } else {
                buffer.push_str(separator);
                buffer.push_str(part);
            }
        } else {
            if !buffer.is_empty() {
                chunks.push(std::mem::take(&mut buffer));
            }
            if char_len(part) > max_len && separators.len() > 1 {
                chunks.extend(split_by_separators(part, max_len, &separators[1..]));
            } else {
                buffer = part.to_string();
            }
        }
    }
    if !buffer.is_empty() {
        chunks.push(buffer);
    }

    let mut bounded = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if char_len(&chunk) <= max_len {
            bounded.push(chunk);
        } else {
            bounded.extend(hard_window(&chunk, max_len));
        }
    }
    bounded
}

/// Slices text into fixed-size character windows with no semantic awareness
fn hard_window(text: &str, window: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(window.max(1))
        .map(|slice| slice.iter().collect())
        .collect()
}

/// Prepends the tail of each previous output chunk to its successor
///
/// The overlap window is taken from the immediately preceding *output*
/// chunk, so overlaps compound iteratively rather than being computed
/// against the pre-overlap originals.
pub(crate) fn apply_overlap(chunks: Vec<String>, overlap: usize) -> Vec<String> {
    if overlap == 0 || chunks.len() <= 1 {
        return chunks;
    }
    let mut windowed: Vec<String> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        match windowed.last() {
            None => windowed.push(chunk),
            Some(previous) => {
                let mut combined = tail_chars(previous, overlap);
                combined.push_str(&chunk);
                windowed.push(combined);
            }
        }
    }
    windowed
}

/// The last `n` characters of `text`, or all of it if shorter
fn tail_chars(text: &str, n: usize) -> String {
    let len = char_len(text);
    if len > n {
        text.chars().skip(len - n).collect()
    } else {
        text.to_string()
    }
}

/// Merges undersized chunks into their successors, scanning left to right
///
/// A chunk shorter than `min_len` is joined with its immediate successor
/// by a newline when the combined length stays within `max_len`; otherwise
/// it is kept short. The final chunk is always kept as-is, whatever its
/// length.
pub(crate) fn merge_small(chunks: Vec<String>, min_len: usize, max_len: usize) -> Vec<String> {
    let mut merged = Vec::with_capacity(chunks.len());
    let mut index = 0;
    while index < chunks.len() {
        let current = &chunks[index];
        if char_len(current) >= min_len || index == chunks.len() - 1 {
            merged.push(current.clone());
            index += 1;
            continue;
        }
        let next = &chunks[index + 1];
        if char_len(current) + char_len(next) <= max_len {
            merged.push(format!("{current}\n{next}"));
            index += 2;
        } else {
            merged.push(current.clone());
            index += 1;
        }
    }
    merged
}

/// Full per-section pipeline: split, overlap, merge, trim, drop empties
pub(crate) fn section_chunks(
    section_text: &str,
    chunk_size: usize,
    overlap: usize,
    min_len: usize,
) -> Vec<String> {
    let chunks = split_by_separators(section_text, chunk_size, &DEFAULT_SEPARATORS);
    let chunks = apply_overlap(chunks, overlap);
    let chunks = merge_small(chunks, min_len, chunk_size);
    chunks
        .into_iter()
        .map(|chunk| chunk.trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect()
}
