//! Tool catalogue exposed to the investigation driver.

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Every tool the supervisor can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ListIndexedFiles,
    SearchFile,
    SearchAllFiles,
    ReadFile,
    ExtractData,
    AnalyzeData,
    LookupKnowledge,
    GenerateHypotheses,
    VerifyHypotheses,
}

impl ToolName {
    pub const ALL: [Self; 9] = [
        Self::ListIndexedFiles,
        Self::SearchFile,
        Self::SearchAllFiles,
        Self::ReadFile,
        Self::ExtractData,
        Self::AnalyzeData,
        Self::LookupKnowledge,
        Self::GenerateHypotheses,
        Self::VerifyHypotheses,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListIndexedFiles => "list_indexed_files",
            Self::SearchFile => "search_file",
            Self::SearchAllFiles => "search_all_files",
            Self::ReadFile => "read_file",
            Self::ExtractData => "extract_data",
            Self::AnalyzeData => "analyze_data",
            Self::LookupKnowledge => "lookup_knowledge",
            Self::GenerateHypotheses => "generate_hypotheses",
            Self::VerifyHypotheses => "verify_hypotheses",
        }
    }

    /// Argument names; a trailing `?` marks an optional one.
    #[must_use]
    pub fn signature(self) -> &'static str {
        match self {
            Self::ListIndexedFiles => "",
            Self::SearchFile => "file_id, query, k?",
            Self::SearchAllFiles => "query, k_per_file?",
            Self::ReadFile => "file_id, chunk",
            Self::ExtractData => "source, extraction_type",
            Self::AnalyzeData => "data, analysis_type, parameters?",
            Self::LookupKnowledge => "category, query",
            Self::GenerateHypotheses => "task, documents?, transaction_data?",
            Self::VerifyHypotheses => "task, hypotheses?, evidence?, domain_knowledge?",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::ListIndexedFiles => "List registered files and their file_ids.",
            Self::SearchFile => "Search one file; returns ranked chunk previews.",
            Self::SearchAllFiles => "Search every file; returns previews grouped by file.",
            Self::ReadFile => "Read the full text of one chunk.",
            Self::ExtractData => {
                "Extract transaction_details, amounts, dates, parties or all from a file_id or raw text."
            }
            Self::AnalyzeData => {
                "Run compare_values, validate_sequence, detect_anomalies or calculate_variance. parameters is JSON (threshold, baseline, direction)."
            }
            Self::LookupKnowledge => {
                "Look up market_pricing, vendor_profiles, audit_rules or compliance knowledge."
            }
            Self::GenerateHypotheses => {
                "Generate hypotheses about discrepancies. Defaults to gathered documents and data."
            }
            Self::VerifyHypotheses => {
                "Verify hypotheses against evidence. Defaults to the last generated hypotheses."
            }
        }
    }

    #[must_use]
    pub fn available() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown tool: {s}. Available: {}", Self::available()))
    }
}

/// Catalogue text shown to the model driver.
#[must_use]
pub fn tool_catalogue() -> String {
    ToolName::ALL
        .iter()
        .map(|t| format!("- {}({}): {}", t.as_str(), t.signature(), t.description()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode tool arguments, or explain what was expected.
///
/// # Errors
///
/// Returns a message naming the tool and its expected arguments.
pub fn parse_args<T: DeserializeOwned>(tool: ToolName, args: &Value) -> Result<T, String> {
    let args = if args.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        args.clone()
    };
    serde_json::from_value(args).map_err(|e| {
        format!(
            "Invalid arguments for {tool}: {e}. Expected: {}",
            tool.signature()
        )
    })
}

/// Accept a string, or any other JSON value rendered as text.
fn loose_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Accept an integer given as a number or a numeric string.
fn loose_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom(format!("expected an integer, got {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("expected an integer, got {s:?}"))),
        other => Err(serde::de::Error::custom(format!(
            "expected an integer, got {other}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchFileArgs {
    pub file_id: String,
    pub query: String,
    pub k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchAllFilesArgs {
    pub query: String,
    pub k_per_file: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ReadFileArgs {
    pub file_id: String,
    #[serde(deserialize_with = "loose_int")]
    pub chunk: i64,
}

#[derive(Debug, Deserialize)]
pub struct ExtractDataArgs {
    #[serde(deserialize_with = "loose_text")]
    pub source: String,
    pub extraction_type: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeDataArgs {
    #[serde(deserialize_with = "loose_text")]
    pub data: String,
    pub analysis_type: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub parameters: String,
}

#[derive(Debug, Deserialize)]
pub struct LookupKnowledgeArgs {
    pub category: String,
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateHypothesesArgs {
    pub task: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub documents: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub transaction_data: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyHypothesesArgs {
    pub task: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub hypotheses: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub evidence: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub domain_knowledge: String,
}
