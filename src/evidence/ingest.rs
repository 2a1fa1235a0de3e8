//! Evidence ingestion from text and files.

use std::path::{Path, PathBuf};

use super::{chunk_text, DocumentRegistry, EvidenceError};
use crate::config::ChunkingConfig;

/// Outcome of ingesting a batch of files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    /// `(file_id, chunk_count)` in ingestion order.
    pub registered: Vec<(String, usize)>,
    /// `(path, reason)` for each file that could not be ingested.
    pub skipped: Vec<(PathBuf, String)>,
}

impl IngestionReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
}

/// Chunk `raw_text` and register it under `file_name`.
///
/// Returns the assigned `file_id` and the number of chunks.
///
/// # Errors
///
/// Returns `EvidenceError::InvalidArgument` for invalid chunking parameters
/// and `EvidenceError::Index` if the index rejects the chunks.
pub fn ingest_text(
    registry: &mut DocumentRegistry,
    file_name: &str,
    source_path: impl Into<String>,
    raw_text: &str,
    chunking: &ChunkingConfig,
) -> Result<(String, usize), EvidenceError> {
    let chunks = chunk_text(raw_text, chunking.chunk_size, chunking.chunk_overlap)?;
    let count = chunks.len();
    let file_id = registry.register_text(file_name, source_path, raw_text, chunks)?;
    Ok((file_id, count))
}

/// Read, chunk and register every path in order.
///
/// Unreadable files are skipped with a warning. Chunking misconfiguration
/// aborts the batch since it would fail for every file.
///
/// # Errors
///
/// Returns `EvidenceError::InvalidArgument` for invalid chunking parameters.
pub async fn ingest_paths<P: AsRef<Path>>(
    registry: &mut DocumentRegistry,
    paths: &[P],
    chunking: &ChunkingConfig,
) -> Result<IngestionReport, EvidenceError> {
    super::validate_params(chunking.chunk_size, chunking.chunk_overlap)?;

    let mut report = IngestionReport::default();
    for path in paths {
        let path = path.as_ref();
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(source) => {
                let err = EvidenceError::Io {
                    path: path.to_path_buf(),
                    source,
                };
                tracing::warn!(error = %err, "Skipping unreadable file");
                report.skipped.push((path.to_path_buf(), err.to_string()));
                continue;
            }
        };

        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        match ingest_text(
            registry,
            &file_name,
            path.display().to_string(),
            &text,
            chunking,
        ) {
            Ok(entry) => report.registered.push(entry),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping file");
                report.skipped.push((path.to_path_buf(), e.to_string()));
            }
        }
    }

    tracing::info!(
        registered = report.registered.len(),
        skipped = report.skipped.len(),
        "Ingestion complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn small_chunks() -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: 20,
            chunk_overlap: 5,
        }
    }

    #[test]
    fn test_ingest_text_registers_chunks() {
        let mut registry = DocumentRegistry::new();
        let (id, count) = ingest_text(
            &mut registry,
            "memo.txt",
            "memo.txt",
            "short memo",
            &ChunkingConfig::default(),
        )
        .unwrap();
        assert_eq!(id, "memo.txt");
        assert_eq!(count, 1);
        assert_eq!(registry.fetch_chunk("memo.txt", 0).unwrap(), "short memo");
    }

    #[tokio::test]
    async fn test_ingest_paths_skips_missing_files() {
        let dir = TempDir::new().unwrap();
        let po = dir.path().join("po.txt");
        std::fs::write(&po, "Purchase order PO-1 unit price $100 for 10 units").unwrap();
        let missing = dir.path().join("missing.txt");

        let mut registry = DocumentRegistry::new();
        let report = ingest_paths(&mut registry, &[po, missing.clone()], &small_chunks())
            .await
            .unwrap();

        assert_eq!(report.registered.len(), 1);
        assert_eq!(report.registered[0].0, "po.txt");
        assert!(report.registered[0].1 > 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, missing);
        assert!(report.skipped[0].1.contains("Failed to read"));
    }

    #[tokio::test]
    async fn test_same_name_in_two_dirs_gets_suffix() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        std::fs::write(a.join("invoice.txt"), "first").unwrap();
        std::fs::write(b.join("invoice.txt"), "second").unwrap();

        let mut registry = DocumentRegistry::new();
        let report = ingest_paths(
            &mut registry,
            &[a.join("invoice.txt"), b.join("invoice.txt")],
            &ChunkingConfig::default(),
        )
        .await
        .unwrap();

        let ids: Vec<_> = report.registered.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["invoice.txt", "invoice.txt#2"]);
        assert_eq!(registry.fetch_chunk("invoice.txt#2", 0).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_invalid_chunking_aborts() {
        let mut registry = DocumentRegistry::new();
        let bad = ChunkingConfig {
            chunk_size: 10,
            chunk_overlap: 10,
        };
        let paths: [PathBuf; 0] = [];
        let result = ingest_paths(&mut registry, &paths, &bad).await;
        assert!(matches!(result, Err(EvidenceError::InvalidArgument(_))));
    }
}
