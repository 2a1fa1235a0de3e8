//! Text-in, text-out adapter over the toolkit for the `analyze_data` tool.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::json;

use super::{
    calculate_variance, compare_values, detect_anomalies, validate_sequence_with, AnalysisError,
    AnomalyDirection,
};
use crate::config::AnalysisConfig;
use crate::evidence::PatternExtractor;

/// The four supported analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisType {
    CompareValues,
    DetectAnomalies,
    CalculateVariance,
    ValidateSequence,
}

impl AnalysisType {
    pub const ALL: [Self; 4] = [
        Self::CompareValues,
        Self::ValidateSequence,
        Self::DetectAnomalies,
        Self::CalculateVariance,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompareValues => "compare_values",
            Self::DetectAnomalies => "detect_anomalies",
            Self::CalculateVariance => "calculate_variance",
            Self::ValidateSequence => "validate_sequence",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| {
                let valid: Vec<_> = Self::ALL.iter().map(AnalysisType::as_str).collect();
                format!(
                    "Unknown analysis_type: {s}. Available: {}",
                    valid.join(", ")
                )
            })
    }
}

/// Optional knobs passed as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnalysisParameters {
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub baseline: Option<f64>,
    #[serde(default)]
    pub direction: AnomalyDirection,
}

impl AnalysisParameters {
    /// Parse a JSON object. Blank input yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameters` for anything that is not a
    /// matching JSON object.
    pub fn parse(raw: &str) -> Result<Self, AnalysisError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(|e| AnalysisError::InvalidParameters(e.to_string()))
    }
}

/// Runs toolkit functions on loosely formatted input.
#[derive(Debug, Clone)]
pub struct AnalysisTool {
    extractor: PatternExtractor,
    config: AnalysisConfig,
}

impl AnalysisTool {
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            extractor: PatternExtractor::with_default_rules(),
            config,
        }
    }

    /// Numbers in `data`.
    ///
    /// Accepts a JSON array of numbers. Otherwise currency amounts are
    /// extracted, and failing that every bare number token is used.
    #[must_use]
    pub fn parse_values(&self, data: &str) -> Vec<f64> {
        if let Ok(values) = serde_json::from_str::<Vec<f64>>(data.trim()) {
            return values;
        }
        let amounts = self.extractor.amounts(data);
        if !amounts.is_empty() {
            return amounts;
        }
        data.split(|c: char| c.is_whitespace() || c == ';')
            .map(|token| token.trim_matches(|c: char| !c.is_ascii_digit() && c != '-' && c != '.'))
            .map(|token| token.trim_end_matches('.').replace(',', ""))
            .filter_map(|token| token.parse::<f64>().ok())
            .collect()
    }

    /// Run one analysis and render the outcome as text.
    ///
    /// Failures become explanatory sentences; this never returns an error.
    #[must_use]
    pub fn run(&self, data: &str, analysis_type: &str, parameters: &str) -> String {
        let kind = match analysis_type.parse::<AnalysisType>() {
            Ok(kind) => kind,
            Err(message) => return message,
        };
        match self.analyze(data, kind, parameters) {
            Ok(value) => serde_json::to_string_pretty(&value)
                .unwrap_or_else(|e| format!("Failed to render analysis result: {e}")),
            Err(Finding::Empty(message)) => message,
            Err(Finding::Error(e)) => format!("Analysis error ({kind}): {e}"),
        }
    }

    fn analyze(
        &self,
        data: &str,
        kind: AnalysisType,
        parameters: &str,
    ) -> Result<serde_json::Value, Finding> {
        let params = AnalysisParameters::parse(parameters)?;

        let (values, result) = match kind {
            AnalysisType::ValidateSequence => {
                let report = validate_sequence_with(&self.extractor, data);
                if report.count == 0 {
                    return Err(Finding::Empty("No dates found in input.".to_string()));
                }
                return Ok(json!({ "analysis_type": kind.as_str(), "result": report }));
            }
            AnalysisType::CompareValues => {
                let values = self.numbers(data)?;
                let threshold = params.threshold.unwrap_or(self.config.significance_threshold);
                let comparison = compare_values(&values, threshold).ok_or_else(|| {
                    Finding::Empty(
                        "No finding: compare_values needs at least 2 values with a positive minimum."
                            .to_string(),
                    )
                })?;
                (values, json!(comparison))
            }
            AnalysisType::DetectAnomalies => {
                let values = self.numbers(data)?;
                let threshold = params.threshold.unwrap_or(self.config.anomaly_threshold);
                let report = detect_anomalies(&values, threshold, params.direction).ok_or_else(
                    || {
                        Finding::Empty(
                            "No finding: detect_anomalies needs at least 3 values with a non-zero average."
                                .to_string(),
                        )
                    },
                )?;
                (values, json!(report))
            }
            AnalysisType::CalculateVariance => {
                let values = self.numbers(data)?;
                let threshold = params.threshold.unwrap_or(self.config.variance_threshold);
                let entries = calculate_variance(&values, params.baseline, threshold)?;
                let result =
                    json!({ "baseline": params.baseline, "threshold": threshold, "entries": entries });
                (values, result)
            }
        };

        Ok(json!({
            "analysis_type": kind.as_str(),
            "values": values,
            "result": result,
        }))
    }

    fn numbers(&self, data: &str) -> Result<Vec<f64>, Finding> {
        let values = self.parse_values(data);
        if values.is_empty() {
            return Err(AnalysisError::NoNumericData.into());
        }
        Ok(values)
    }
}

impl Default for AnalysisTool {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

/// A rendered non-result: either nothing to report or a toolkit error.
enum Finding {
    Empty(String),
    Error(AnalysisError),
}

impl From<AnalysisError> for Finding {
    fn from(e: AnalysisError) -> Self {
        Self::Error(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_values_json_and_text() {
        let tool = AnalysisTool::default();
        assert_eq!(tool.parse_values("[100, 150.5]"), vec![100.0, 150.5]);
        assert_eq!(
            tool.parse_values("Contract $1,000 vs invoice $1,200"),
            vec![1000.0, 1200.0]
        );
        assert_eq!(tool.parse_values("10 10 10 100"), vec![10.0, 10.0, 10.0, 100.0]);
        assert_eq!(tool.parse_values("100, 150."), vec![100.0, 150.0]);
        assert!(tool.parse_values("no numbers").is_empty());
    }

    #[test]
    fn test_compare_values_renders_json() {
        let out = AnalysisTool::default().run("[100, 150]", "compare_values", "");
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["analysis_type"], "compare_values");
        assert_eq!(value["result"]["variance_ratio"], 0.5);
        assert_eq!(value["result"]["significant"], true);
    }

    #[test]
    fn test_compare_values_zero_is_no_finding() {
        let out = AnalysisTool::default().run("[0, 100]", "compare_values", "{}");
        assert!(out.starts_with("No finding"));
    }

    #[test]
    fn test_detect_anomalies_with_threshold_param() {
        let out = AnalysisTool::default().run(
            "[10, 10, 10, 100]",
            "detect_anomalies",
            r#"{"threshold": 0.2}"#,
        );
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        let anomalies = value["result"]["anomalies"].as_array().unwrap();
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0]["index"], 3);
    }

    #[test]
    fn test_variance_requires_baseline() {
        let tool = AnalysisTool::default();
        let out = tool.run("[120]", "calculate_variance", "");
        assert!(out.contains("Baseline is required"));

        let out = tool.run("[120]", "calculate_variance", r#"{"baseline": 100}"#);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["result"]["entries"][0]["exceeds_threshold"], true);
    }

    #[test]
    fn test_validate_sequence_lists_dates() {
        let out = AnalysisTool::default().run(
            "Ordered 2024-01-10, delivered 2024-01-05",
            "validate_sequence",
            "",
        );
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["result"]["count"], 2);
    }

    #[test]
    fn test_unknown_type_and_bad_parameters() {
        let tool = AnalysisTool::default();
        let out = tool.run("[1, 2]", "regression", "");
        assert!(out.contains("compare_values"));
        assert!(out.contains("calculate_variance"));

        let out = tool.run("[1, 2]", "compare_values", "not json");
        assert!(out.contains("Invalid parameters"));
    }

    #[test]
    fn test_no_numeric_data() {
        let out = AnalysisTool::default().run("nothing", "detect_anomalies", "");
        assert!(out.contains("No numeric data"));
    }
}
