//! Nearest-neighbor index boundary.
//!
//! Real deployments back this with an embedding store; the crate ships a
//! deterministic keyword index so the pipeline runs without one.

use std::collections::BTreeMap;

use super::IndexError;

/// Metadata key holding the owning file identifier.
pub const META_FILE_ID: &str = "file_id";
/// Metadata key holding the source path.
pub const META_PATH: &str = "path";
/// Metadata key holding the 0-based chunk index.
pub const META_CHUNK: &str = "chunk";

/// A text added to an index together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedText {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

impl IndexedText {
    /// Create an entry with no metadata.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata value.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
    /// Similarity score, when the backend produces one.
    pub score: Option<f32>,
}

/// An external nearest-neighbor capability over one named collection.
pub trait NearestNeighborIndex: Send + Sync {
    /// Add texts with metadata to the collection.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Backend` if the backend rejects the batch.
    fn add(&mut self, items: Vec<IndexedText>) -> Result<(), IndexError>;

    /// Return up to `k` entries ranked by similarity to `query`.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Backend` if the backend fails.
    fn search(&self, query: &str, k: usize) -> Result<Vec<IndexHit>, IndexError>;

    /// Like [`search`](Self::search) but every hit carries a score.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::ScoresUnavailable` when the backend has no scores.
    fn search_with_scores(&self, _query: &str, _k: usize) -> Result<Vec<IndexHit>, IndexError> {
        Err(IndexError::ScoresUnavailable)
    }

    /// Number of entries in the collection.
    fn len(&self) -> usize;

    /// Check if the collection is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Creates one empty index per document or knowledge category.
pub trait IndexFactory: Send + Sync {
    fn create(&self) -> Box<dyn NearestNeighborIndex>;
}

/// Term-overlap index.
///
/// The score of an entry is the fraction of distinct query terms it
/// contains (case-insensitive substring match). Entries scoring zero are
/// not returned; ties keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    items: Vec<IndexedText>,
    lowered: Vec<String>,
}

impl KeywordIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn terms(query: &str) -> Vec<String> {
        let mut terms: Vec<String> = query
            .split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '-'))
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();
        terms.sort();
        terms.dedup();
        terms
    }

    #[allow(clippy::cast_precision_loss)]
    fn ranked(&self, query: &str, k: usize) -> Vec<IndexHit> {
        let terms = Self::terms(query);
        if terms.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(f32, usize)> = self
            .lowered
            .iter()
            .enumerate()
            .filter_map(|(i, text)| {
                let matched = terms.iter().filter(|t| text.contains(t.as_str())).count();
                (matched > 0).then(|| (matched as f32 / terms.len() as f32, i))
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        scored
            .into_iter()
            .take(k)
            .map(|(score, i)| IndexHit {
                text: self.items[i].text.clone(),
                metadata: self.items[i].metadata.clone(),
                score: Some(score),
            })
            .collect()
    }
}

impl NearestNeighborIndex for KeywordIndex {
    fn add(&mut self, items: Vec<IndexedText>) -> Result<(), IndexError> {
        for item in items {
            self.lowered.push(item.text.to_lowercase());
            self.items.push(item);
        }
        Ok(())
    }

    fn search(&self, query: &str, k: usize) -> Result<Vec<IndexHit>, IndexError> {
        Ok(self.ranked(query, k))
    }

    fn search_with_scores(&self, query: &str, k: usize) -> Result<Vec<IndexHit>, IndexError> {
        Ok(self.ranked(query, k))
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Factory producing empty [`KeywordIndex`] instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIndexFactory;

impl IndexFactory for KeywordIndexFactory {
    fn create(&self) -> Box<dyn NearestNeighborIndex> {
        Box::new(KeywordIndex::new())
    }
}
