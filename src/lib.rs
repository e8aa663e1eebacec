//! # Chroma Match
//!
//! Identifies which audio recording a MIDI transcription corresponds to by
//! comparing chroma sequences (12-dimensional pitch-class energy over time).
//!
//! ## Features
//!
//! - **Likelihood scoring**: one 5-state full-covariance Gaussian HMM per
//!   candidate recording, query scored by log-likelihood (higher is better)
//! - **Alignment scoring**: L1 Dynamic Time Warping distance between query and
//!   candidate sequences (lower is better)
//! - **Ranking**: deterministic best-first ordering, lenient handling of
//!   missing artifacts, optional parallel fan-out over candidates
//!
//! Chroma extraction, audio decoding and MIDI synthesis happen upstream; this
//! crate starts from in-memory chroma matrices.
//!
//! ## Quick Start
//!
//! ```no_run
//! use chroma_match::{ChromaSequence, MatchConfig, Matcher, ScorerKind};
//!
//! // 12 x T matrices from a chroma extractor
//! let midi_chroma: Vec<Vec<f32>> = vec![vec![0.0; 200]; 12];
//! let audio_chroma: Vec<Vec<f32>> = vec![vec![0.0; 240]; 12];
//!
//! let mut matcher = Matcher::new(MatchConfig::default());
//! matcher.insert_query("Queen", ChromaSequence::from_pitch_major(&midi_chroma)?)?;
//! matcher.insert_candidate("Queen - Live", ChromaSequence::from_pitch_major(&audio_chroma)?)?;
//! matcher.build_models(false);
//!
//! let ranking = matcher.rank_against_all("Queen", ScorerKind::Likelihood)?;
//! for (i, entry) in ranking.iter().enumerate() {
//!     println!("{}: {} (score: {:.2})", i + 1, entry.id, entry.score);
//! }
//! # Ok::<(), chroma_match::MatchError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Chroma sequences → Scorer (HMM likelihood | DTW) → Ranking engine → Ranked candidates
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chroma;
pub mod config;
pub mod error;
pub mod matcher;
pub mod ranking;
pub mod scoring;
pub mod store;

// Re-export main types
pub use chroma::ChromaSequence;
pub use config::{HmmConfig, MatchConfig, MissingArtifactPolicy};
pub use error::MatchError;
pub use matcher::Matcher;
pub use ranking::{
    LogObserver, RankedCandidate, Ranking, RankingEngine, RankingObserver, RankingWarning,
    ScoreStatus, WarningKind,
};
pub use scoring::{
    dtw_align, dtw_distance, Alignment, AlignmentScorer, BuildReport, GaussianHmm,
    LikelihoodScorer, ModelBank, ScoreOrder, Scorer, ScorerKind,
};
pub use store::{ArtifactKind, ArtifactStore};
