//! Ranking observers
//!
//! The engine reports progress through an injected [`RankingObserver`]
//! rather than printing. [`LogObserver`] forwards to the `log` facade.

use std::time::Duration;

use super::result::{Ranking, RankingWarning};
use crate::error::MatchError;

/// Receives model-building and ranking progress events
///
/// Scoring and ranking events may arrive from rayon worker threads when
/// parallel scoring is enabled. Build events arrive on the caller's thread
/// once training has joined.
pub trait RankingObserver: Send + Sync {
    /// A candidate already had a model and was not retrained
    fn on_build_skipped(&self, _candidate_id: &str) {}

    /// A candidate's model was trained
    fn on_built(&self, _candidate_id: &str, _elapsed: Duration) {}

    /// Training a candidate's model failed; the bank keeps its other models
    fn on_build_failed(&self, _candidate_id: &str, _error: &MatchError) {}

    /// A candidate could not be scored because an artifact was missing
    fn on_missing(&self, _query_id: &str, _warning: &RankingWarning) {}

    /// A candidate was scored
    fn on_scored(&self, _query_id: &str, _candidate_id: &str, _score: f64, _elapsed: Duration) {}

    /// A ranking is complete
    fn on_ranked(&self, _ranking: &Ranking) {}
}

/// Observer that writes to the `log` facade
///
/// Missing artifacts are always logged as warnings; per-candidate timings and
/// the final table only when `debug` is set.
#[derive(Debug, Clone, Copy)]
pub struct LogObserver {
    debug: bool,
}

impl LogObserver {
    /// Create a log observer
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }
}

impl RankingObserver for LogObserver {
    fn on_build_skipped(&self, candidate_id: &str) {
        if self.debug {
            log::debug!("Model for {} is already built", candidate_id);
        }
    }

    fn on_built(&self, candidate_id: &str, elapsed: Duration) {
        if self.debug {
            log::debug!(
                "Model for {} is built ({:.2} ms)",
                candidate_id,
                elapsed.as_secs_f64() * 1000.0
            );
        }
    }

    fn on_build_failed(&self, candidate_id: &str, error: &MatchError) {
        log::warn!("Model training failed for {}: {}", candidate_id, error);
    }

    fn on_missing(&self, query_id: &str, warning: &RankingWarning) {
        log::warn!(
            "Cannot compare {} with {}: {}",
            query_id,
            warning.candidate_id,
            warning.message
        );
    }

    fn on_scored(&self, query_id: &str, candidate_id: &str, score: f64, elapsed: Duration) {
        if self.debug {
            log::debug!(
                "Scored {} against {}: {:.4} ({:.2} ms)",
                query_id,
                candidate_id,
                score,
                elapsed.as_secs_f64() * 1000.0
            );
        }
    }

    fn on_ranked(&self, ranking: &Ranking) {
        if !self.debug {
            return;
        }
        log::info!(
            "Ranked {} candidates for {} ({} warnings)",
            ranking.len(),
            ranking.query_id,
            ranking.warnings.len()
        );
        for (index, entry) in ranking.iter().enumerate() {
            log::debug!("{}: {} (score: {:.4})", index + 1, entry.id, entry.score);
        }
    }
}
