//! Sliding-window document chunking.
//!
//! Windows are measured in characters, not bytes, so multi-byte text is
//! never split inside a code point.

use super::EvidenceError;

/// Character span `[start, end)` of one window over the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub start: usize,
    pub end: usize,
}

/// Validate chunking parameters.
///
/// # Errors
///
/// Returns `EvidenceError::InvalidArgument` if `chunk_size` is zero or
/// `chunk_overlap` is not smaller than `chunk_size`.
pub fn validate_params(chunk_size: usize, chunk_overlap: usize) -> Result<(), EvidenceError> {
    if chunk_size == 0 {
        return Err(EvidenceError::InvalidArgument(
            "chunk_size must be > 0".to_string(),
        ));
    }
    if chunk_overlap >= chunk_size {
        return Err(EvidenceError::InvalidArgument(format!(
            "chunk_overlap must be >= 0 and < chunk_size (got overlap={chunk_overlap}, size={chunk_size})"
        )));
    }
    Ok(())
}

/// Compute the window spans for a text of `len` characters.
///
/// Each window starts `chunk_size - chunk_overlap` characters after the
/// previous one; the last window always ends at `len`.
///
/// # Errors
///
/// Returns `EvidenceError::InvalidArgument` for invalid parameters.
pub fn window_spans(
    len: usize,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<ChunkSpan>, EvidenceError> {
    validate_params(chunk_size, chunk_overlap)?;

    let mut spans = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + chunk_size).min(len);
        spans.push(ChunkSpan { start, end });
        if end == len {
            break;
        }
        start = end - chunk_overlap;
    }
    Ok(spans)
}

/// Split `text` into overlapping windows.
///
/// Each window is trimmed of surrounding whitespace; windows that are empty
/// after trimming are dropped.
///
/// # Errors
///
/// Returns `EvidenceError::InvalidArgument` for invalid parameters.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<String>, EvidenceError> {
    // Byte offset of every char boundary, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = boundaries.len() - 1;

    let chunks = window_spans(len, chunk_size, chunk_overlap)?
        .into_iter()
        .filter_map(|span| {
            let window = text[boundaries[span.start]..boundaries[span.end]].trim();
            (!window.is_empty()).then(|| window.to_string())
        })
        .collect();
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered(len: usize, spans: &[ChunkSpan]) -> bool {
        (0..len).all(|pos| spans.iter().any(|s| s.start <= pos && pos < s.end))
    }

    #[test]
    fn test_rejects_zero_size() {
        let result = chunk_text("abc", 0, 0);
        assert!(matches!(result, Err(EvidenceError::InvalidArgument(_))));
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(chunk_text("abc", 5, 5).is_err());
        assert!(chunk_text("abc", 5, 9).is_err());
        assert!(chunk_text("abc", 5, 4).is_ok());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = chunk_text("  hello world  ", 900, 150).unwrap();
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert!(chunk_text("", 10, 2).unwrap().is_empty());
        assert!(chunk_text("     \n\t  ", 3, 1).unwrap().is_empty());
    }

    #[test]
    fn test_windows_overlap_and_advance() {
        let chunks = chunk_text("abcdefghij", 4, 1).unwrap();
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_whitespace_only_windows_are_dropped() {
        let aligned = format!("abc{}xyz", " ".repeat(9));
        assert_eq!(chunk_text(&aligned, 3, 0).unwrap(), vec!["abc", "xyz"]);

        // Windows: "abc", three blank ones, " xy", "z".
        let shifted = format!("abc{}xyz", " ".repeat(10));
        assert_eq!(chunk_text(&shifted, 3, 0).unwrap(), vec!["abc", "xy", "z"]);
    }

    #[test]
    fn test_multibyte_text_is_split_on_chars() {
        let text = "監査証跡の確認と価格の検証";
        let chunks = chunk_text(text, 5, 2).unwrap();
        assert_eq!(chunks[0], "監査証跡の");
        assert_eq!(chunks[1], "跡の確認と");
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
    }

    #[test]
    fn test_spans_cover_every_position() {
        for len in [0usize, 1, 7, 50, 101, 999] {
            for (size, overlap) in [(1, 0), (4, 1), (10, 9), (33, 5), (900, 150)] {
                let spans = window_spans(len, size, overlap).unwrap();
                assert!(covered(len, &spans), "len={len} size={size} overlap={overlap}");
            }
        }
    }

    #[test]
    fn test_consecutive_spans_overlap_by_at_most_overlap() {
        let spans = window_spans(1000, 90, 15).unwrap();
        for pair in spans.windows(2) {
            let shared = pair[0].end.saturating_sub(pair[1].start);
            assert!(shared <= 15);
            assert!(pair[1].start > pair[0].start);
        }
    }

    #[test]
    fn test_span_count_matches_formula() {
        // ceil((len - overlap) / (size - overlap)) for len > size
        let (len, size, overlap) = (1000usize, 90usize, 15usize);
        let spans = window_spans(len, size, overlap).unwrap();
        let expected = (len - overlap).div_ceil(size - overlap);
        assert_eq!(spans.len(), expected);

        assert_eq!(window_spans(90, 90, 15).unwrap().len(), 1);
        assert_eq!(window_spans(10, 90, 15).unwrap().len(), 1);
    }
}
