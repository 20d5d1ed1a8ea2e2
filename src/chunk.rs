//! Windowed text chunker.
//!
//! Splits document text into fixed-size character windows with a configured
//! overlap between consecutive windows. Pure and deterministic: no I/O, no
//! randomness, identical input always yields identical chunks.
//!
//! Window boundaries are counted in characters, not bytes, so multi-byte
//! text never gets split mid-character.

use crate::models::Chunk;

/// Split `text` into overlapping windows of at most `chunk_size` characters.
///
/// The input is trimmed first; an empty result yields an empty sequence, not
/// an error. Each emitted window is itself trimmed, and windows that trim to
/// nothing are skipped. The final window may be shorter than `chunk_size`.
///
/// The next window starts `overlap` characters before the previous one ended,
/// clamped so the start strictly increases every iteration. Forward progress
/// therefore holds even when `overlap >= chunk_size` (config validation
/// rejects that pairing, but the function does not rely on it).
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let window = window.trim();
        if !window.is_empty() {
            chunks.push(window.to_string());
        }

        if end == chars.len() {
            break;
        }

        start = std::cmp::max(end.saturating_sub(overlap), start + 1);
    }

    chunks
}

/// Chunk a document's text and attach document id and ordinal indices.
pub fn chunk_document(
    document_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<Chunk> {
    chunk_text(text, chunk_size, overlap)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            source_document_id: document_id.to_string(),
            index,
            text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Filler text with no whitespace, so per-window trimming is a no-op and
    /// overlap arithmetic can be checked exactly.
    fn filler(len: usize) -> String {
        "abcdefghij".chars().cycle().take(len).collect()
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk_text("", 800, 120).is_empty());
        assert!(chunk_text("   \n\t  ", 800, 120).is_empty());
    }

    #[test]
    fn test_short_input_single_chunk() {
        let chunks = chunk_text("hello world", 800, 120);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_input_is_trimmed() {
        let chunks = chunk_text("  hello  ", 800, 120);
        assert_eq!(chunks, vec!["hello".to_string()]);
    }

    #[test]
    fn test_deterministic() {
        let text = filler(3000);
        assert_eq!(chunk_text(&text, 800, 120), chunk_text(&text, 800, 120));
    }

    #[test]
    fn test_window_arithmetic() {
        // stride = chunk_size - overlap = 680; windows at 0, 680, 1360,
        // the last one ending exactly at 2000.
        let text = filler(2000);
        let chunks = chunk_text(&text, 800, 120);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 800);
        assert_eq!(chunks[1].len(), 800);
        assert_eq!(chunks[2].len(), 640);
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = filler(2000);
        let chunks = chunk_text(&text, 800, 120);
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().skip(pair[0].chars().count() - 120).collect();
            assert!(pair[1].starts_with(&tail));
        }
    }

    #[test]
    fn test_overlap_removal_reconstructs_input() {
        let text = filler(2000);
        let chunks = chunk_text(&text, 800, 120);
        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.chars().skip(120));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_forward_progress_when_overlap_not_smaller() {
        // overlap >= chunk_size would stall a naive `end - overlap` advance;
        // the clamp must still terminate and cover the whole text. Distinct
        // characters make every window's position in the input unambiguous.
        let text: String = (0u8..90).map(|i| (b'!' + i) as char).collect();
        for (size, overlap) in [(10, 10), (10, 25), (1, 1)] {
            let chunks = chunk_text(&text, size, overlap);
            assert!(!chunks.is_empty(), "size={size} overlap={overlap}");

            let mut prev_start = 0usize;
            let mut prev_end = 0usize;
            for (i, chunk) in chunks.iter().enumerate() {
                let start = text
                    .find(chunk.as_str())
                    .unwrap_or_else(|| panic!("size={size} overlap={overlap}: window not in input"));
                if i > 0 {
                    assert!(start > prev_start, "size={size} overlap={overlap}: stalled");
                }
                assert!(start <= prev_end, "size={size} overlap={overlap}: gap");
                prev_start = start;
                prev_end = start + chunk.len();
            }
            assert_eq!(prev_end, text.len(), "size={size} overlap={overlap}");
        }
    }

    #[test]
    fn test_chunk_document_indices_are_ordinal() {
        let chunks = chunk_document("doc-1", &filler(2000), 800, 120);
        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.source_document_id, "doc-1");
            assert!(!chunk.text.is_empty());
        }
    }
}
