//! Pattern-based evidence extraction.
//!
//! Locates amounts, dates, parties and transaction identifiers in free
//! text. The patterns are heuristics: callers treat the output as untrusted
//! input, never as verified fact.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// What to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionKind {
    /// Purchase order, invoice, contract and transaction identifiers.
    TransactionDetails,
    /// Monetary amounts.
    Amounts,
    /// Date-like tokens.
    Dates,
    /// Counterparty names.
    Parties,
    /// Everything above.
    All,
}

impl ExtractionKind {
    /// Concrete kinds, excluding `All`.
    pub const CONCRETE: [Self; 4] = [
        Self::TransactionDetails,
        Self::Amounts,
        Self::Dates,
        Self::Parties,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransactionDetails => "transaction_details",
            Self::Amounts => "amounts",
            Self::Dates => "dates",
            Self::Parties => "parties",
            Self::All => "all",
        }
    }
}

impl fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "transaction_details" => Ok(Self::TransactionDetails),
            "amounts" => Ok(Self::Amounts),
            "dates" => Ok(Self::Dates),
            "parties" => Ok(Self::Parties),
            "all" => Ok(Self::All),
            other => Err(format!(
                "Unknown extraction_type: {other}. Available: transaction_details, amounts, dates, parties, all"
            )),
        }
    }
}

/// One extracted token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedItem {
    /// Text as it appears in the source.
    pub raw: String,
    /// Byte offset of the match in the scanned text.
    pub position: usize,
    /// Numeric value for amounts, ISO date for dates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
}

/// Extraction output grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedData {
    pub items: BTreeMap<ExtractionKind, Vec<ExtractedItem>>,
}

impl ExtractedData {
    /// Items of one kind, empty when none were found.
    #[must_use]
    pub fn get(&self, kind: ExtractionKind) -> &[ExtractedItem] {
        self.items.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Parsed monetary values in source order.
    #[must_use]
    pub fn amounts(&self) -> Vec<f64> {
        self.get(ExtractionKind::Amounts)
            .iter()
            .filter_map(|item| item.normalized.as_deref()?.parse().ok())
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.values().all(Vec::is_empty)
    }

    /// Human-readable listing.
    #[must_use]
    pub fn render(&self) -> String {
        if self.is_empty() {
            return "No matching data found.".to_string();
        }
        let mut lines = Vec::new();
        for (kind, items) in &self.items {
            lines.push(format!("{kind} ({}):", items.len()));
            for item in items {
                match &item.normalized {
                    Some(n) if *n != item.raw => lines.push(format!("  - {} ({n})", item.raw)),
                    _ => lines.push(format!("  - {}", item.raw)),
                }
            }
        }
        lines.join("\n")
    }
}

/// Error type for extraction rules.
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    /// Invalid regex pattern.
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Replaceable extraction interface.
pub trait EvidenceExtractor: Send + Sync {
    fn extract(&self, text: &str, kind: ExtractionKind) -> ExtractedData;
}

/// How a raw match is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Normalizer {
    None,
    Amount,
    Date,
}

/// A single extraction rule.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    kind: ExtractionKind,
    pattern: Regex,
    normalizer: Normalizer,
}

impl ExtractionRule {
    /// Create a new rule.
    ///
    /// # Errors
    ///
    /// Returns `ExtractError::InvalidPattern` if the regex is invalid.
    pub fn new(kind: ExtractionKind, pattern: &str) -> Result<Self, ExtractError> {
        let normalizer = match kind {
            ExtractionKind::Amounts => Normalizer::Amount,
            ExtractionKind::Dates => Normalizer::Date,
            _ => Normalizer::None,
        };
        Ok(Self {
            kind,
            pattern: Regex::new(pattern)?,
            normalizer,
        })
    }

    fn find_all(&self, text: &str) -> Vec<ExtractedItem> {
        self.pattern
            .find_iter(text)
            .map(|m| {
                let raw = m.as_str().trim().to_string();
                let normalized = match self.normalizer {
                    Normalizer::None => None,
                    Normalizer::Amount => normalize_amount(&raw),
                    Normalizer::Date => normalize_date(&raw),
                };
                ExtractedItem {
                    raw,
                    position: m.start(),
                    normalized,
                }
            })
            .collect()
    }
}

/// Regex-backed extractor.
#[derive(Debug, Clone, Default)]
pub struct PatternExtractor {
    rules: Vec<ExtractionRule>,
}

impl PatternExtractor {
    /// Create an extractor with the built-in rules.
    #[must_use]
    pub fn with_default_rules() -> Self {
        let rules = Self::default_rules()
            .into_iter()
            .filter_map(|result| match result {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to compile default extraction rule");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    /// Date-like tokens in source order.
    #[must_use]
    pub fn dates(&self, text: &str) -> Vec<ExtractedItem> {
        self.extract(text, ExtractionKind::Dates)
            .items
            .remove(&ExtractionKind::Dates)
            .unwrap_or_default()
    }

    /// Monetary values in source order.
    #[must_use]
    pub fn amounts(&self, text: &str) -> Vec<f64> {
        self.extract(text, ExtractionKind::Amounts).amounts()
    }

    fn default_rules() -> Vec<Result<ExtractionRule, ExtractError>> {
        use ExtractionKind::{Amounts, Dates, Parties, TransactionDetails};
        vec![
            // Document and transaction codes
            ExtractionRule::new(
                TransactionDetails,
                r"\b(?:PO|INV|TX|TXN|CT|DN|GR|QT)-[A-Z0-9]+(?:-[A-Z0-9]+)*\b",
            ),
            // Amounts, currency before or after the number
            ExtractionRule::new(Amounts, r"(?:[$¥€£]|USD\s?|JPY\s?|EUR\s?)\d[\d,]*(?:\.\d+)?"),
            ExtractionRule::new(Amounts, r"\d[\d,]*(?:\.\d+)?\s?(?:円|ドル|USD|JPY|EUR)"),
            // Dates: ISO-like, Japanese, US, month name
            ExtractionRule::new(Dates, r"\b\d{4}[-/]\d{1,2}[-/]\d{1,2}\b"),
            ExtractionRule::new(Dates, r"\d{4}年\d{1,2}月\d{1,2}日"),
            ExtractionRule::new(Dates, r"\b\d{1,2}/\d{1,2}/\d{4}\b"),
            ExtractionRule::new(
                Dates,
                r"\b(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sep(?:tember)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\.? \d{1,2}, \d{4}\b",
            ),
            // Company names with a legal suffix
            ExtractionRule::new(
                Parties,
                r"\b(?:[A-Z][A-Za-z0-9&]*\s){1,4}(?:Inc\.?|Ltd\.?|LLC|Corp\.?|Co\.|Corporation|Company|Agency|Technologies)",
            ),
            ExtractionRule::new(
                Parties,
                r"(?:株式会社|有限会社)[^\s、。,]+|[^\s、。,]+(?:株式会社|有限会社)",
            ),
        ]
    }
}

impl EvidenceExtractor for PatternExtractor {
    fn extract(&self, text: &str, kind: ExtractionKind) -> ExtractedData {
        let mut data = ExtractedData::default();
        for rule in &self.rules {
            if kind != ExtractionKind::All && rule.kind != kind {
                continue;
            }
            let found = rule.find_all(text);
            if found.is_empty() {
                continue;
            }
            data.items.entry(rule.kind).or_default().extend(found);
        }
        for items in data.items.values_mut() {
            items.sort_by_key(|item| item.position);
            // Overlapping rules may report the same token twice.
            items.dedup_by(|a, b| a.position == b.position);
        }
        data
    }
}

/// Strip currency markers and separators, returning the decimal value.
fn normalize_amount(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = digits.parse().ok()?;
    Some(value.to_string())
}

/// Convert a date token to `YYYY-MM-DD` when it names a real calendar day.
fn normalize_date(raw: &str) -> Option<String> {
    use chrono::NaiveDate;

    const FORMATS: [&str; 8] = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%Y年%m月%d日",
        "%m/%d/%Y",
        "%B %d, %Y",
        "%b %d, %Y",
        "%b. %d, %Y",
        "%B. %d, %Y",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
}
