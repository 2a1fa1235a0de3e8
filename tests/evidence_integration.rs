//! Integration tests for chunking, registration and retrieval.

use std::sync::Arc;

use audit_investigator::config::ChunkingConfig;
use audit_investigator::evidence::{
    chunk_text, ingest_paths, window_spans, DocumentRegistry, EvidenceError, IndexError,
    IndexHit, IndexedText, NearestNeighborIndex, RetrievalService,
};

#[test]
fn test_chunks_cover_text_with_bounded_overlap() {
    let text: String = (0..500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    for (size, overlap) in [(100, 0), (100, 20), (64, 63), (7, 3), (600, 10)] {
        let spans = window_spans(text.len(), size, overlap).unwrap();
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans.last().unwrap().end, text.len());
        for pair in spans.windows(2) {
            assert!(pair[1].start <= pair[0].end, "gap between windows");
            assert!(pair[0].end - pair[1].start <= overlap);
        }
        let chunks = chunk_text(&text, size, overlap).unwrap();
        assert!(chunks.iter().all(|c| !c.trim().is_empty()));
        if text.len() <= size {
            assert_eq!(chunks.len(), 1);
        }
    }
}

#[test]
fn test_chunk_count_formula() {
    let text = "x".repeat(1000);
    let chunks = chunk_text(&text, 300, 100).unwrap();
    // ceil((1000 - 100) / (300 - 100)) = 5
    assert_eq!(chunks.len(), 5);
}

#[test]
fn test_invalid_chunk_parameters() {
    assert!(matches!(
        chunk_text("abc", 0, 0),
        Err(EvidenceError::InvalidArgument(_))
    ));
    assert!(matches!(
        chunk_text("abc", 10, 10),
        Err(EvidenceError::InvalidArgument(_))
    ));
}

#[test]
fn test_duplicate_names_get_suffixes() {
    let mut registry = DocumentRegistry::new();
    let ids: Vec<String> = (0..3)
        .map(|_| {
            registry
                .register("a.txt", "docs/a.txt", vec!["chunk".to_string()])
                .unwrap()
        })
        .collect();
    assert_eq!(ids, vec!["a.txt", "a.txt#2", "a.txt#3"]);
}

#[test]
fn test_search_and_fetch_full() {
    let mut registry = DocumentRegistry::new();
    registry
        .register(
            "invoice.txt",
            "docs/invoice.txt",
            vec![
                "Invoice INV-2024-001 issued to Acme Trading Inc.".to_string(),
                "Unit price $150 for 100 units, total $15,000.".to_string(),
            ],
        )
        .unwrap();
    let service = RetrievalService::new(Arc::new(registry));

    let hits = service.search("invoice.txt", "unit price", 1).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk_index, Some(1));

    let full = service.fetch_full("invoice.txt", 1).unwrap();
    assert_eq!(full, "Unit price $150 for 100 units, total $15,000.");

    assert!(matches!(
        service.fetch_full("invoice.txt", 2),
        Err(EvidenceError::ChunkOutOfRange { .. })
    ));
    assert!(matches!(
        service.fetch_full("invoice.txt", -1),
        Err(EvidenceError::ChunkOutOfRange { .. })
    ));
}

#[test]
fn test_unknown_file_is_described_not_raised() {
    let mut registry = DocumentRegistry::new();
    registry
        .register("b.txt", "b.txt", vec!["beta".to_string()])
        .unwrap();
    registry
        .register("a.txt", "a.txt", vec!["alpha".to_string()])
        .unwrap();
    let service = RetrievalService::new(Arc::new(registry));

    let out = service.render_search("missing.txt", "alpha", 3);
    assert!(out.contains("missing.txt"));
    assert!(out.contains("a.txt"));
    assert!(out.contains("b.txt"));
}

#[test]
fn test_search_all_is_lexicographic() {
    let mut registry = DocumentRegistry::new();
    for name in ["zeta.txt", "alpha.txt", "mid.txt"] {
        registry
            .register(name, name, vec![format!("{name} price list")])
            .unwrap();
    }
    let service = RetrievalService::new(Arc::new(registry));
    let order: Vec<String> = service
        .search_all("price", 2)
        .into_iter()
        .map(|b| b.file_id)
        .collect();
    assert_eq!(order, vec!["alpha.txt", "mid.txt", "zeta.txt"]);
}

/// An index that can rank but never scores.
#[derive(Default)]
struct UnscoredIndex {
    texts: Vec<IndexedText>,
}

impl NearestNeighborIndex for UnscoredIndex {
    fn add(&mut self, texts: Vec<IndexedText>) -> Result<(), IndexError> {
        self.texts.extend(texts);
        Ok(())
    }

    fn search(&self, _query: &str, k: usize) -> Result<Vec<IndexHit>, IndexError> {
        Ok(self
            .texts
            .iter()
            .take(k)
            .map(|t| IndexHit {
                text: t.text.clone(),
                metadata: t.metadata.clone(),
                score: None,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.texts.len()
    }
}

#[test]
fn test_unscored_index_still_returns_results() {
    let mut registry = DocumentRegistry::new();
    registry
        .register_with_index(
            "c.txt",
            "c.txt",
            vec!["first chunk".to_string(), "second chunk".to_string()],
            Box::new(UnscoredIndex::default()),
        )
        .unwrap();
    let service = RetrievalService::new(Arc::new(registry));

    let hits = service.search("c.txt", "chunk", 2).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.score.is_none()));
}

#[tokio::test]
async fn test_ingest_skips_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("po.txt");
    std::fs::write(&good, "Purchase order PO-1001, unit price $150.").unwrap();
    let missing = dir.path().join("missing.txt");

    let mut registry = DocumentRegistry::new();
    let report = ingest_paths(&mut registry, &[good, missing.clone()], &ChunkingConfig::default())
        .await
        .unwrap();

    assert_eq!(report.registered, vec![("po.txt".to_string(), 1)]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, missing);
    assert_eq!(registry.len(), 1);
}
