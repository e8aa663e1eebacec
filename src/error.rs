//! Error types for the chroma matching engine

use std::fmt;

/// Errors that can occur while building models or scoring candidates
#[derive(Debug, Clone, PartialEq)]
pub enum MatchError {
    /// A candidate's chroma sequence or model could not be resolved
    MissingArtifact(String),

    /// Query and candidate feature dimensionality disagree
    DimensionMismatch {
        /// Feature count the model or reference sequence was built with
        expected: usize,
        /// Feature count of the offending sequence
        found: usize,
    },

    /// Model training failed (too few frames, numerical breakdown)
    ModelTraining(String),

    /// Invalid input parameters or malformed sequences
    InvalidInput(String),

    /// Numerical error (overflow, underflow, non-finite scores)
    NumericalError(String),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::MissingArtifact(msg) => write!(f, "Missing artifact: {}", msg),
            MatchError::DimensionMismatch { expected, found } => write!(
                f,
                "Dimension mismatch: expected {} features, found {}",
                expected, found
            ),
            MatchError::ModelTraining(msg) => write!(f, "Model training error: {}", msg),
            MatchError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            MatchError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
        }
    }
}

impl std::error::Error for MatchError {}
