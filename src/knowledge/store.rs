//! Per-category knowledge store over the nearest-neighbor boundary.

use std::collections::BTreeMap;

use super::{KnowledgeCategory, KnowledgeEntry, KnowledgeError, KnowledgeHit};
use crate::evidence::{
    IndexError, IndexFactory, IndexHit, IndexedText, KeywordIndexFactory, NearestNeighborIndex,
};

/// Characters of each entry shown by [`DomainKnowledgeStore::format_lookup`].
pub const LOOKUP_CONTENT_CHARS: usize = 200;

const META_ENTRY_ID: &str = "id";
const META_CATEGORY: &str = "category";

struct CategoryStore {
    entries: Vec<KnowledgeEntry>,
    index: Box<dyn NearestNeighborIndex>,
}

/// Domain knowledge split into one searchable collection per category.
pub struct DomainKnowledgeStore {
    categories: BTreeMap<KnowledgeCategory, CategoryStore>,
}

impl DomainKnowledgeStore {
    /// Create an empty store backed by keyword indexes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_factory(&KeywordIndexFactory)
    }

    /// Create an empty store with one index per category from `factory`.
    #[must_use]
    pub fn with_factory(factory: &dyn IndexFactory) -> Self {
        let categories = KnowledgeCategory::ALL
            .into_iter()
            .map(|category| {
                (
                    category,
                    CategoryStore {
                        entries: Vec::new(),
                        index: factory.create(),
                    },
                )
            })
            .collect();
        Self { categories }
    }

    /// Add one entry to its category.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::Index` if the category index rejects it.
    pub fn add_entry(&mut self, entry: KnowledgeEntry) -> Result<(), KnowledgeError> {
        let Some(store) = self.categories.get_mut(&entry.category) else {
            return Err(KnowledgeError::UnknownCategory {
                category: entry.category.to_string(),
                available: KnowledgeCategory::available(),
            });
        };

        let mut indexed = IndexedText::new(entry.content.clone())
            .with_meta(META_ENTRY_ID, entry.id.clone())
            .with_meta(META_CATEGORY, entry.category.as_str());
        for (key, value) in &entry.metadata {
            indexed = indexed.with_meta(key, value.clone());
        }
        store
            .index
            .add(vec![indexed])
            .map_err(|e| KnowledgeError::Index(e.to_string()))?;

        tracing::debug!(id = %entry.id, category = %entry.category, "Added knowledge entry");
        store.entries.push(entry);
        Ok(())
    }

    /// Add several entries, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`add_entry`](Self::add_entry).
    pub fn add_entries(
        &mut self,
        entries: impl IntoIterator<Item = KnowledgeEntry>,
    ) -> Result<(), KnowledgeError> {
        entries.into_iter().try_for_each(|entry| self.add_entry(entry))
    }

    /// Up to `k` entries of `category` ranked against `query`.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::Index` if the index fails.
    pub fn lookup(
        &self,
        category: KnowledgeCategory,
        query: &str,
        k: usize,
    ) -> Result<Vec<KnowledgeHit>, KnowledgeError> {
        let Some(store) = self.categories.get(&category) else {
            return Ok(Vec::new());
        };

        let hits = match store.index.search_with_scores(query, k) {
            Ok(hits) => hits,
            Err(IndexError::ScoresUnavailable) => store
                .index
                .search(query, k)
                .map_err(|e| KnowledgeError::Index(e.to_string()))?
                .into_iter()
                .map(|hit| IndexHit { score: None, ..hit })
                .collect(),
            Err(e) => return Err(KnowledgeError::Index(e.to_string())),
        };

        Ok(hits
            .into_iter()
            .map(|hit| {
                let id = hit.metadata.get(META_ENTRY_ID).cloned().unwrap_or_default();
                let metadata = store
                    .entries
                    .iter()
                    .find(|e| e.id == id)
                    .map(|e| e.metadata.clone())
                    .unwrap_or_default();
                KnowledgeHit {
                    id,
                    category,
                    content: hit.text,
                    score: hit.score,
                    metadata,
                }
            })
            .collect())
    }

    /// Look up a category given by name.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::UnknownCategory` for an unknown name.
    pub fn lookup_by_name(
        &self,
        category: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<KnowledgeHit>, KnowledgeError> {
        self.lookup(category.parse()?, query, k)
    }

    /// Search every category.
    #[must_use]
    pub fn lookup_all_categories(
        &self,
        query: &str,
        k_per_category: usize,
    ) -> BTreeMap<KnowledgeCategory, Vec<KnowledgeHit>> {
        KnowledgeCategory::ALL
            .into_iter()
            .map(|category| {
                let hits = self.lookup(category, query, k_per_category).unwrap_or_else(|e| {
                    tracing::warn!(%category, error = %e, "Knowledge lookup failed");
                    Vec::new()
                });
                (category, hits)
            })
            .collect()
    }

    /// Number of entries per category.
    #[must_use]
    pub fn category_stats(&self) -> BTreeMap<KnowledgeCategory, usize> {
        self.categories
            .iter()
            .map(|(category, store)| (*category, store.entries.len()))
            .collect()
    }

    /// Rendered lookup for the reasoning loop. Never fails.
    #[must_use]
    pub fn format_lookup(&self, category: &str, query: &str, k: usize) -> String {
        let hits = match self.lookup_by_name(category, query, k) {
            Ok(hits) => hits,
            Err(e) => return format!("Error: {e}"),
        };

        let mut lines = vec![format!(
            "Knowledge results (category={category}, query={query}):"
        )];
        if hits.is_empty() {
            lines.push("  No matching knowledge found.".to_string());
        }
        for (i, hit) in hits.iter().enumerate() {
            let score = hit
                .score
                .map(|s| format!(" (score={s:.4})"))
                .unwrap_or_default();
            lines.push(format!(
                "  [{}]{score}: {}",
                i + 1,
                truncate_chars(&hit.content, LOOKUP_CONTENT_CHARS)
            ));
        }
        lines.join("\n")
    }
}

impl Default for DomainKnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DomainKnowledgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainKnowledgeStore")
            .field("category_stats", &self.category_stats())
            .finish()
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}...", &text[..byte]),
        None => text.to_string(),
    }
}
