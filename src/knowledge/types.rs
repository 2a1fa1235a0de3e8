//! Knowledge categories, entries and errors.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed set of knowledge categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeCategory {
    MarketPricing,
    VendorProfiles,
    AuditRules,
    Compliance,
}

impl KnowledgeCategory {
    /// Every category, in lookup order.
    pub const ALL: [Self; 4] = [
        Self::MarketPricing,
        Self::VendorProfiles,
        Self::AuditRules,
        Self::Compliance,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketPricing => "market_pricing",
            Self::VendorProfiles => "vendor_profiles",
            Self::AuditRules => "audit_rules",
            Self::Compliance => "compliance",
        }
    }

    /// Comma-separated list of every category name.
    #[must_use]
    pub fn available() -> String {
        Self::ALL
            .iter()
            .map(KnowledgeCategory::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for KnowledgeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnowledgeCategory {
    type Err = KnowledgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| KnowledgeError::UnknownCategory {
                category: wanted.to_string(),
                available: Self::available(),
            })
    }
}

/// A single knowledge base entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub content: String,
    pub category: KnowledgeCategory,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl KnowledgeEntry {
    #[must_use]
    pub fn new(id: impl Into<String>, category: KnowledgeCategory, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            category,
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

/// A ranked lookup result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeHit {
    pub id: String,
    pub category: KnowledgeCategory,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub metadata: BTreeMap<String, String>,
}

/// Errors from knowledge lookups.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeError {
    #[error("Unknown category: {category}. Available: {available}")]
    UnknownCategory { category: String, available: String },

    #[error("Knowledge index failed: {0}")]
    Index(String),
}
