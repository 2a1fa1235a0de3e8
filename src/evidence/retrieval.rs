//! Retrieval over the document registry.
//!
//! Typed methods return `Result`s; the `render_*` methods turn every
//! outcome, including failures, into the text handed back to the
//! reasoning loop.

use std::path::Path;
use std::sync::Arc;

use super::index::META_CHUNK;
use super::{DocumentRegistry, EvidenceError, FileSummary, IndexError, IndexHit};

/// Default preview budget in characters.
pub const DEFAULT_PREVIEW_CHARS: usize = 80;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub file_id: String,
    /// Chunk index, when the index returned it in the hit metadata.
    pub chunk_index: Option<usize>,
    pub score: Option<f32>,
    pub preview: String,
}

/// Search results for one file inside a cross-file search.
#[derive(Debug)]
pub struct FileSearchBlock {
    pub file_id: String,
    pub result: Result<Vec<SearchHit>, EvidenceError>,
}

/// Collapse whitespace and cut `text` to at most `max_chars` characters,
/// ending with `...` when anything was removed and the budget allows it.
#[must_use]
pub fn preview(text: &str, max_chars: usize) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if max_chars == 0 {
        return String::new();
    }
    if normalized.chars().count() <= max_chars {
        return normalized;
    }
    // No room for the marker.
    if max_chars <= 3 {
        return normalized.chars().take(max_chars).collect();
    }
    let kept: String = normalized.chars().take(max_chars - 3).collect();
    format!("{kept}...")
}

/// Search and fetch over a frozen document registry.
#[derive(Debug, Clone)]
pub struct RetrievalService {
    registry: Arc<DocumentRegistry>,
    preview_chars: usize,
}

impl RetrievalService {
    /// Create a service with the default preview budget.
    #[must_use]
    pub fn new(registry: Arc<DocumentRegistry>) -> Self {
        Self {
            registry,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Override the preview budget.
    #[must_use]
    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    #[must_use]
    pub fn list_files(&self) -> Vec<FileSummary> {
        self.registry.list()
    }

    /// Rank chunks of one file against `query`.
    ///
    /// Falls back to unscored results when the index has no scores.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceError::UnknownFile` for an unregistered file and
    /// `EvidenceError::Index` if the backend fails.
    pub fn search(
        &self,
        file_id: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, EvidenceError> {
        let doc = self.registry.document(file_id)?;
        let index = doc.index();

        let hits = match index.search_with_scores(query, k) {
            Ok(hits) => hits,
            Err(IndexError::ScoresUnavailable) => {
                tracing::debug!(file_id, "Index has no scores, using unscored search");
                index
                    .search(query, k)?
                    .into_iter()
                    .map(|hit| IndexHit { score: None, ..hit })
                    .collect()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(hits
            .into_iter()
            .map(|hit| SearchHit {
                file_id: file_id.to_string(),
                chunk_index: hit.metadata.get(META_CHUNK).and_then(|c| c.parse().ok()),
                score: hit.score,
                preview: preview(&hit.text, self.preview_chars),
            })
            .collect())
    }

    /// Search every registered file in lexicographic `file_id` order.
    #[must_use]
    pub fn search_all(&self, query: &str, k_per_file: usize) -> Vec<FileSearchBlock> {
        self.registry
            .file_ids()
            .into_iter()
            .map(|file_id| {
                let result = self.search(&file_id, query, k_per_file);
                FileSearchBlock { file_id, result }
            })
            .collect()
    }

    /// Exact, untruncated text of one chunk.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceError::UnknownFile` or `EvidenceError::ChunkOutOfRange`.
    pub fn fetch_full(&self, file_id: &str, chunk_index: i64) -> Result<&str, EvidenceError> {
        self.registry.fetch_chunk(file_id, chunk_index)
    }

    /// Text listing of registered files.
    #[must_use]
    pub fn render_file_list(&self) -> String {
        let files = self.list_files();
        if files.is_empty() {
            return "No files are registered.".to_string();
        }

        let mut lines = vec!["Registered files:".to_string()];
        lines.extend(
            files
                .into_iter()
                .map(|f| format!("- file_id={} path={}", f.file_id, f.source_path)),
        );
        lines.join("\n")
    }

    /// Text rendering of [`search`](Self::search).
    #[must_use]
    pub fn render_search(&self, file_id: &str, query: &str, k: usize) -> String {
        match self.search(file_id, query, k) {
            Ok(hits) => render_hits(file_id, query, k, &hits),
            Err(e) => e.to_string(),
        }
    }

    /// Text rendering of [`search_all`](Self::search_all).
    #[must_use]
    pub fn render_search_all(&self, query: &str, k_per_file: usize) -> String {
        if self.registry.is_empty() {
            return "No files are registered.".to_string();
        }

        let mut blocks = vec![format!(
            "Cross-file search query={query} (k_per_file={k_per_file})"
        )];
        blocks.extend(self.search_all(query, k_per_file).into_iter().map(|block| {
            match block.result {
                Ok(hits) => render_hits(&block.file_id, query, k_per_file, &hits),
                Err(e) => e.to_string(),
            }
        }));
        blocks.join("\n\n---\n\n")
    }

    /// Text rendering of [`fetch_full`](Self::fetch_full) with a header line.
    #[must_use]
    pub fn render_chunk(&self, file_id: &str, chunk_index: i64) -> String {
        match self.fetch_full(file_id, chunk_index) {
            Ok(text) => {
                let name = self
                    .registry
                    .get(file_id)
                    .and_then(|doc| Path::new(doc.source_path()).file_name())
                    .map_or_else(|| file_id.to_string(), |n| n.to_string_lossy().into_owned());
                format!("[{name} file_id={file_id} chunk={chunk_index}]\n\n{text}")
            }
            Err(e) => e.to_string(),
        }
    }
}

fn render_hits(file_id: &str, query: &str, k: usize, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No matches in file_id={file_id} for query={query}");
    }

    let mut lines = vec![format!(
        "Search results file_id={file_id} query={query} (top {k})"
    )];
    for hit in hits {
        let chunk = hit
            .chunk_index
            .map_or_else(|| "?".to_string(), |c| c.to_string());
        let score = hit
            .score
            .map(|s| format!(" score={s:.4}"))
            .unwrap_or_default();
        lines.push(format!(
            "- file_id={} chunk={chunk}{score} head={}",
            hit.file_id, hit.preview
        ));
    }
    lines.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{IndexedText, NearestNeighborIndex};

    /// Index that can only rank, never score.
    struct UnscoredIndex(Vec<IndexedText>);

    impl NearestNeighborIndex for UnscoredIndex {
        fn add(&mut self, items: Vec<IndexedText>) -> Result<(), IndexError> {
            self.0.extend(items);
            Ok(())
        }

        fn search(&self, _query: &str, k: usize) -> Result<Vec<IndexHit>, IndexError> {
            Ok(self
                .0
                .iter()
                .take(k)
                .map(|item| IndexHit {
                    text: item.text.clone(),
                    metadata: item.metadata.clone(),
                    score: Some(0.5),
                })
                .collect())
        }

        fn len(&self) -> usize {
            self.0.len()
        }
    }

    fn service() -> RetrievalService {
        let mut registry = DocumentRegistry::new();
        registry
            .register(
                "contract.txt",
                "input/contract.txt",
                vec![
                    "Unit price: $120 per license.\n\nTerm: 12 months.".to_string(),
                    "Payment terms Net 30.".to_string(),
                ],
            )
            .unwrap();
        registry
            .register(
                "invoice.txt",
                "input/invoice.txt",
                vec!["Invoice INV-2024-001 unit price $150 per license".to_string()],
            )
            .unwrap();
        RetrievalService::new(Arc::new(registry))
    }

    #[test]
    fn test_preview_collapses_and_truncates() {
        assert_eq!(preview("  a\n\tb   c ", 80), "a b c");
        let long = "x".repeat(100);
        let p = preview(&long, 80);
        assert_eq!(p.chars().count(), 80);
        assert!(p.ends_with("..."));
        assert_eq!(preview("abc", 0), "");
    }

    #[test]
    fn test_preview_never_exceeds_tiny_budgets() {
        for max in 1..=4 {
            let p = preview("abcdefgh", max);
            assert_eq!(p.chars().count(), max, "budget {max}");
        }
        assert_eq!(preview("abcdefgh", 2), "ab");
        assert_eq!(preview("abcdefgh", 4), "a...");
        assert_eq!(preview("ab", 2), "ab");
    }

    #[test]
    fn test_preview_is_char_safe() {
        let text = "監".repeat(100);
        let p = preview(&text, 10);
        assert_eq!(p, format!("{}...", "監".repeat(7)));
    }

    #[test]
    fn test_search_returns_ranked_hits() {
        let hits = service().search("contract.txt", "unit price", 4).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_index, Some(0));
        assert!(hits[0].score.is_some());
        assert_eq!(
            hits[0].preview,
            "Unit price: $120 per license. Term: 12 months."
        );
    }

    #[test]
    fn test_search_unknown_file_names_available_ids() {
        let rendered = service().render_search("missing.txt", "price", 4);
        assert!(rendered.contains("Unknown file_id: missing.txt"));
        assert!(rendered.contains("contract.txt, invoice.txt"));
    }

    #[test]
    fn test_unscored_index_falls_back() {
        let mut registry = DocumentRegistry::new();
        registry
            .register_with_index(
                "memo.txt",
                "memo.txt",
                vec!["alpha".to_string(), "beta".to_string()],
                Box::new(UnscoredIndex(Vec::new())),
            )
            .unwrap();
        let service = RetrievalService::new(Arc::new(registry));

        let hits = service.search("memo.txt", "anything", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.score.is_none()));

        let rendered = service.render_search("memo.txt", "anything", 2);
        assert!(!rendered.contains("score="));
        assert!(rendered.contains("chunk=1"));
    }

    #[test]
    fn test_search_all_is_lexicographic() {
        let blocks = service().search_all("price", 2);
        let ids: Vec<_> = blocks.iter().map(|b| b.file_id.as_str()).collect();
        assert_eq!(ids, vec!["contract.txt", "invoice.txt"]);

        let rendered = service().render_search_all("price", 2);
        let contract = rendered.find("file_id=contract.txt").unwrap();
        let invoice = rendered.find("file_id=invoice.txt").unwrap();
        assert!(contract < invoice);
        assert!(rendered.starts_with("Cross-file search query=price"));
    }

    #[test]
    fn test_fetch_full_is_untruncated() {
        let service = service();
        let text = service.fetch_full("contract.txt", 0).unwrap();
        assert!(text.contains("\n\nTerm: 12 months."));

        let rendered = service.render_chunk("contract.txt", 1);
        assert!(rendered.starts_with("[contract.txt file_id=contract.txt chunk=1]"));
        assert!(rendered.ends_with("Payment terms Net 30."));
    }

    #[test]
    fn test_render_chunk_out_of_range() {
        let rendered = service().render_chunk("invoice.txt", 3);
        assert_eq!(rendered, "Chunk id out of range: chunk=3. Available: 0..0");
    }

    #[test]
    fn test_file_list() {
        let rendered = service().render_file_list();
        assert_eq!(
            rendered,
            "Registered files:\n- file_id=contract.txt path=input/contract.txt\n- file_id=invoice.txt path=input/invoice.txt"
        );

        let empty = RetrievalService::new(Arc::new(DocumentRegistry::new()));
        assert_eq!(empty.render_file_list(), "No files are registered.");
        assert_eq!(empty.render_search_all("x", 1), "No files are registered.");
    }
}
