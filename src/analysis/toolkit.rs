//! Deterministic statistics used to test audit hypotheses.
//!
//! Every function here is pure. "Not enough data" is a `None`, not an
//! error, so callers can report "no finding" without special casing.

use serde::{Deserialize, Serialize};

use super::AnalysisError;
use crate::evidence::{ExtractedItem, PatternExtractor};

/// Spread between the smallest and largest value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    pub min: f64,
    pub max: f64,
    /// `(max - min) / min`.
    pub variance_ratio: f64,
    pub significant: bool,
}

/// Compare a set of values.
///
/// Returns `None` for fewer than two values or a non-positive minimum.
#[must_use]
pub fn compare_values(values: &[f64], threshold: f64) -> Option<Comparison> {
    if values.len() < 2 {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min <= 0.0 {
        return None;
    }
    let variance_ratio = (max - min) / min;
    Some(Comparison {
        min,
        max,
        variance_ratio,
        significant: variance_ratio > threshold,
    })
}

/// Which side of the average counts as anomalous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyDirection {
    /// Values above the average (overcharges, inflated quantities).
    #[default]
    Above,
    Below,
    Both,
}

impl AnomalyDirection {
    fn includes(self, value: f64, average: f64) -> bool {
        match self {
            Self::Above => value > average,
            Self::Below => value < average,
            Self::Both => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Anomaly {
    pub index: usize,
    pub value: f64,
    /// `|value - average| / average`.
    pub deviation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    pub average: f64,
    pub threshold: f64,
    pub anomalies: Vec<Anomaly>,
}

/// Flag values whose relative deviation from the average exceeds
/// `threshold`.
///
/// The average is taken over all values, anomalies included. With the
/// default [`AnomalyDirection::Above`] only values above the average are
/// flagged. Returns `None` for fewer than three values or a zero average.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn detect_anomalies(
    values: &[f64],
    threshold: f64,
    direction: AnomalyDirection,
) -> Option<AnomalyReport> {
    if values.len() < 3 {
        return None;
    }
    let average = values.iter().sum::<f64>() / values.len() as f64;
    if average.abs() < f64::EPSILON {
        return None;
    }

    let anomalies = values
        .iter()
        .enumerate()
        .filter(|(_, v)| direction.includes(**v, average))
        .filter_map(|(index, &value)| {
            let deviation = (value - average).abs() / average.abs();
            (deviation > threshold).then_some(Anomaly {
                index,
                value,
                deviation,
            })
        })
        .collect();

    Some(AnomalyReport {
        average,
        threshold,
        anomalies,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VarianceEntry {
    pub value: f64,
    /// `(value - baseline) / baseline`.
    pub variance: f64,
    pub exceeds_threshold: bool,
}

/// Relative variance of each value against `baseline`.
///
/// A value exceeds the threshold when `|variance| > threshold`.
///
/// # Errors
///
/// Returns `AnalysisError::MissingBaseline` when no baseline is given and
/// `AnalysisError::InvalidBaseline` when it is not positive.
pub fn calculate_variance(
    values: &[f64],
    baseline: Option<f64>,
    threshold: f64,
) -> Result<Vec<VarianceEntry>, AnalysisError> {
    let baseline = baseline.ok_or(AnalysisError::MissingBaseline)?;
    if baseline <= 0.0 || baseline.is_nan() {
        return Err(AnalysisError::InvalidBaseline(baseline));
    }

    Ok(values
        .iter()
        .map(|&value| {
            let variance = (value - baseline) / baseline;
            VarianceEntry {
                value,
                variance,
                exceeds_threshold: variance.abs() > threshold,
            }
        })
        .collect())
}

/// Date tokens found in a text, in source order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceReport {
    pub count: usize,
    pub dates: Vec<ExtractedItem>,
}

/// Extract date-like tokens for a later ordering check.
///
/// This does not decide whether the sequence is valid; the caller compares
/// the dates against the expected process order.
#[must_use]
pub fn validate_sequence(text: &str) -> SequenceReport {
    validate_sequence_with(&PatternExtractor::with_default_rules(), text)
}

/// [`validate_sequence`] with a caller-supplied extractor.
#[must_use]
pub fn validate_sequence_with(extractor: &PatternExtractor, text: &str) -> SequenceReport {
    let dates = extractor.dates(text);
    SequenceReport {
        count: dates.len(),
        dates,
    }
}
