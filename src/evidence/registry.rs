//! Document registry: file identifiers, chunk lists and per-file indexes.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::index::{IndexedText, META_CHUNK, META_FILE_ID, META_PATH};
use super::{EvidenceError, IndexFactory, KeywordIndexFactory, NearestNeighborIndex};

/// A bounded slice of a document's text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub file_id: String,
    pub index: usize,
    pub text: String,
}

/// One ingested document.
pub struct DocumentRecord {
    file_id: String,
    source_path: String,
    chunks: Vec<Chunk>,
    source_text: Option<String>,
    index: Box<dyn NearestNeighborIndex>,
}

impl DocumentRecord {
    #[must_use]
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    #[must_use]
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Full document text, each position exactly once.
    ///
    /// Documents registered from raw text return it unchanged. Otherwise the
    /// chunks are stitched back together, dropping the longest overlap
    /// between neighbours.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        match &self.source_text {
            Some(text) => Cow::Borrowed(text),
            None => Cow::Owned(stitch_chunks(&self.chunks)),
        }
    }

    /// The retrieval index built over this document's chunks.
    #[must_use]
    pub fn index(&self) -> &dyn NearestNeighborIndex {
        self.index.as_ref()
    }
}

impl std::fmt::Debug for DocumentRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRecord")
            .field("file_id", &self.file_id)
            .field("source_path", &self.source_path)
            .field("chunks", &self.chunks.len())
            .finish_non_exhaustive()
    }
}

/// `file_id` and source path of a registered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub file_id: String,
    pub source_path: String,
}

/// Registry of ingested documents.
///
/// Populated during setup and then shared read-only (typically behind an
/// `Arc`). It provides no locking of its own.
pub struct DocumentRegistry {
    documents: BTreeMap<String, DocumentRecord>,
    factory: Arc<dyn IndexFactory>,
}

impl DocumentRegistry {
    /// Create an empty registry backed by keyword indexes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_factory(Arc::new(KeywordIndexFactory))
    }

    /// Create an empty registry whose per-file indexes come from `factory`.
    #[must_use]
    pub fn with_factory(factory: Arc<dyn IndexFactory>) -> Self {
        Self {
            documents: BTreeMap::new(),
            factory,
        }
    }

    /// Next unused identifier for `base`: `base`, then `base#2`, `base#3`, ...
    #[must_use]
    pub fn next_file_id(&self, base: &str) -> String {
        if !self.documents.contains_key(base) {
            return base.to_string();
        }
        (2..)
            .map(|i| format!("{base}#{i}"))
            .find(|candidate| !self.documents.contains_key(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Register a document and build its retrieval index.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceError::Index` if the index rejects the chunks.
    pub fn register(
        &mut self,
        file_name: &str,
        source_path: impl Into<String>,
        chunks: Vec<String>,
    ) -> Result<String, EvidenceError> {
        let index = self.factory.create();
        self.insert(file_name, source_path.into(), chunks, None, index)
    }

    /// Register `chunks` cut from `raw_text`, keeping the text for full scans.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceError::Index` if the index rejects the chunks.
    pub fn register_text(
        &mut self,
        file_name: &str,
        source_path: impl Into<String>,
        raw_text: impl Into<String>,
        chunks: Vec<String>,
    ) -> Result<String, EvidenceError> {
        let index = self.factory.create();
        self.insert(
            file_name,
            source_path.into(),
            chunks,
            Some(raw_text.into()),
            index,
        )
    }

    /// Register a document with a caller-supplied index.
    ///
    /// The chunks are added to `index` with `file_id`, `path` and `chunk`
    /// metadata.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceError::Index` if the index rejects the chunks.
    pub fn register_with_index(
        &mut self,
        file_name: &str,
        source_path: impl Into<String>,
        chunks: Vec<String>,
        index: Box<dyn NearestNeighborIndex>,
    ) -> Result<String, EvidenceError> {
        self.insert(file_name, source_path.into(), chunks, None, index)
    }

    fn insert(
        &mut self,
        file_name: &str,
        source_path: String,
        chunks: Vec<String>,
        source_text: Option<String>,
        mut index: Box<dyn NearestNeighborIndex>,
    ) -> Result<String, EvidenceError> {
        let file_id = self.next_file_id(file_name);

        let entries = chunks
            .iter()
            .enumerate()
            .map(|(i, text)| {
                IndexedText::new(text.clone())
                    .with_meta(META_FILE_ID, file_id.clone())
                    .with_meta(META_PATH, source_path.clone())
                    .with_meta(META_CHUNK, i.to_string())
            })
            .collect();
        index.add(entries)?;

        let chunks: Vec<Chunk> = chunks
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                file_id: file_id.clone(),
                index,
                text,
            })
            .collect();

        tracing::info!(
            file_id = %file_id,
            path = %source_path,
            chunks = chunks.len(),
            "Registered document"
        );

        self.documents.insert(
            file_id.clone(),
            DocumentRecord {
                file_id: file_id.clone(),
                source_path,
                chunks,
                source_text,
                index,
            },
        );
        Ok(file_id)
    }

    /// Registered documents in lexicographic `file_id` order.
    #[must_use]
    pub fn list(&self) -> Vec<FileSummary> {
        self.documents
            .values()
            .map(|doc| FileSummary {
                file_id: doc.file_id.clone(),
                source_path: doc.source_path.clone(),
            })
            .collect()
    }

    /// Registered identifiers in lexicographic order.
    #[must_use]
    pub fn file_ids(&self) -> Vec<String> {
        self.documents.keys().cloned().collect()
    }

    /// Get a document by identifier.
    #[must_use]
    pub fn get(&self, file_id: &str) -> Option<&DocumentRecord> {
        self.documents.get(file_id)
    }

    /// Get a document or an error naming the known identifiers.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceError::UnknownFile` if `file_id` is not registered.
    pub fn document(&self, file_id: &str) -> Result<&DocumentRecord, EvidenceError> {
        self.documents
            .get(file_id)
            .ok_or_else(|| EvidenceError::UnknownFile {
                file_id: file_id.to_string(),
                available: self.file_ids(),
            })
    }

    /// Get all chunks of a document.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceError::UnknownFile` if `file_id` is not registered.
    pub fn get_chunks(&self, file_id: &str) -> Result<&[Chunk], EvidenceError> {
        self.document(file_id).map(DocumentRecord::chunks)
    }

    /// Get the full text of one chunk.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceError::UnknownFile` for an unregistered file and
    /// `EvidenceError::ChunkOutOfRange` when `index` is outside `[0, len)`.
    pub fn fetch_chunk(&self, file_id: &str, index: i64) -> Result<&str, EvidenceError> {
        let chunks = self.get_chunks(file_id)?;
        usize::try_from(index)
            .ok()
            .and_then(|i| chunks.get(i))
            .map(|chunk| chunk.text.as_str())
            .ok_or_else(|| EvidenceError::ChunkOutOfRange {
                file_id: file_id.to_string(),
                chunk: index,
                len: chunks.len(),
            })
    }

    /// Remove every registered document.
    pub fn clear(&mut self) {
        self.documents.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Default for DocumentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DocumentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRegistry")
            .field("documents", &self.documents)
            .finish_non_exhaustive()
    }
}

/// Join chunks, skipping the text each one shares with the previous one.
fn stitch_chunks(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    for chunk in chunks {
        let shared = shared_edge(&text, &chunk.text);
        if shared == 0 && !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&chunk.text[shared..]);
    }
    text
}

/// Byte length of the longest suffix of `left` that is a prefix of `right`.
fn shared_edge(left: &str, right: &str) -> usize {
    right
        .char_indices()
        .map(|(i, _)| i)
        .skip(1)
        .chain(std::iter::once(right.len()))
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .find(|&k| left.ends_with(&right[..k]))
        .unwrap_or(0)
}
