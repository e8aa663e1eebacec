//! Similarity scorers
//!
//! Two interchangeable strategies behind one contract:
//! - Likelihood scoring against a per-candidate Gaussian HMM
//! - Dynamic Time Warping distance between raw chroma sequences

pub mod dtw;
pub mod hmm;
pub mod likelihood;

pub use dtw::{dtw_align, dtw_distance, Alignment, AlignmentScorer};
pub use hmm::{BuildReport, GaussianHmm, ModelBank};
pub use likelihood::LikelihoodScorer;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::chroma::ChromaSequence;
use crate::error::MatchError;
use crate::store::ArtifactKind;

/// Sort convention of a scorer's output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreOrder {
    /// Higher scores are better (log-likelihoods); ranked descending
    HigherIsBetter,
    /// Lower scores are better (distances); ranked ascending
    LowerIsBetter,
}

impl ScoreOrder {
    /// Compare two scores so that the better one sorts first
    ///
    /// Uses IEEE total ordering, so NaN never panics a sort.
    pub fn compare(&self, a: f64, b: f64) -> Ordering {
        match self {
            ScoreOrder::HigherIsBetter => b.total_cmp(&a),
            ScoreOrder::LowerIsBetter => a.total_cmp(&b),
        }
    }

    /// Worst possible score under this ordering
    pub fn worst(&self) -> f64 {
        match self {
            ScoreOrder::HigherIsBetter => f64::NEG_INFINITY,
            ScoreOrder::LowerIsBetter => f64::INFINITY,
        }
    }
}

/// Which scoring strategy a ranking should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScorerKind {
    /// Statistical-model scorer (HMM log-likelihood)
    Likelihood,
    /// Alignment-distance scorer (L1 DTW)
    Alignment,
}

impl ScorerKind {
    /// Sort convention of this scorer
    pub fn order(&self) -> ScoreOrder {
        match self {
            ScorerKind::Likelihood => ScoreOrder::HigherIsBetter,
            ScorerKind::Alignment => ScoreOrder::LowerIsBetter,
        }
    }

    /// Artifact a candidate must be bound to for this scorer
    pub fn artifact_kind(&self) -> ArtifactKind {
        match self {
            ScorerKind::Likelihood => ArtifactKind::Model,
            ScorerKind::Alignment => ArtifactKind::Sequence,
        }
    }
}

/// Shared scorer contract
///
/// A scorer compares a query sequence with one candidate's precomputed
/// artifact. Implementations must be pure: the ranking engine may call
/// `score` for different candidates concurrently.
pub trait Scorer: Sync {
    /// Per-candidate artifact the scorer consumes
    type Artifact: Sync;

    /// Sort convention of the returned scores
    fn order(&self) -> ScoreOrder;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Score `query` against one candidate's artifact
    fn score(&self, artifact: &Self::Artifact, query: &ChromaSequence) -> Result<f64, MatchError>;
}
