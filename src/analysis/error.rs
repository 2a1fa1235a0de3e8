//! Analysis error types.

/// Errors reported by the analysis toolkit.
///
/// These are findings for the caller, never panics: the tool adapter turns
/// each one into a sentence for the reasoning loop.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// `calculate_variance` was called without a baseline.
    #[error("Baseline is required for variance calculation (pass parameters {{\"baseline\": <number>}})")]
    MissingBaseline,

    /// The baseline is zero or negative.
    #[error("Baseline must be greater than 0 (got {0})")]
    InvalidBaseline(f64),

    /// The `parameters` argument could not be parsed.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The input contained no numbers.
    #[error("No numeric data found in input")]
    NoNumericData,
}
