//! Candidate ranking
//!
//! Applies a scorer across a candidate set and returns the candidates
//! best-first:
//! - Ranking engine (sequential or rayon fan-out)
//! - Result types with per-candidate warnings
//! - Observer hooks for logging and instrumentation

pub mod engine;
pub mod observer;
pub mod result;

pub use engine::{RankingEngine, SENTINEL_SCORE};
pub use observer::{LogObserver, RankingObserver};
pub use result::{RankedCandidate, Ranking, RankingWarning, ScoreStatus, WarningKind};
