//! Ranking engine
//!
//! Applies one scorer across a candidate set and orders the results.
//!
//! # Algorithm
//!
//! 1. Deduplicate candidate ids (iterated in id order)
//! 2. Resolve each id to its artifact through the store
//! 3. Score resolved candidates, sequentially or on the rayon pool
//! 4. Apply the missing-artifact policy to unresolved ones
//! 5. Stable sort by (score, id), best first

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use super::observer::{LogObserver, RankingObserver};
use super::result::{
    sort_entries, RankedCandidate, Ranking, RankingWarning, ScoreStatus, WarningKind,
};
use crate::chroma::ChromaSequence;
use crate::config::{MatchConfig, MissingArtifactPolicy};
use crate::error::MatchError;
use crate::scoring::Scorer;
use crate::store::ArtifactStore;

/// Sentinel score for unavailable artifacts under `MissingArtifactPolicy::Sentinel`
pub const SENTINEL_SCORE: f64 = 0.0;

enum Outcome {
    Scored(f64),
    Missing(RankingWarning),
}

/// Scores candidates and produces best-first rankings
#[derive(Clone)]
pub struct RankingEngine {
    config: MatchConfig,
    observer: Arc<dyn RankingObserver>,
}

impl std::fmt::Debug for RankingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankingEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RankingEngine {
    /// Create an engine that logs through [`LogObserver`]
    pub fn new(config: MatchConfig) -> Self {
        let observer = Arc::new(LogObserver::new(config.debug));
        Self { config, observer }
    }

    /// Replace the observer
    pub fn with_observer(mut self, observer: Arc<dyn RankingObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Engine configuration
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Observer receiving progress events
    pub fn observer(&self) -> &dyn RankingObserver {
        self.observer.as_ref()
    }

    /// Rank `candidate_ids` by similarity to `query`
    ///
    /// # Arguments
    ///
    /// * `scorer` - Scoring strategy
    /// * `query_id` - Query identifier (for warnings and logs)
    /// * `query` - Query sequence, or `None` if it could not be resolved
    /// * `candidate_ids` - Candidates to rank; duplicates are collapsed
    /// * `store` - Lookup from candidate id to the scorer's artifact
    ///
    /// # Returns
    ///
    /// One entry per distinct candidate id (unless the policy is `Exclude`),
    /// best first; equal scores are ordered by candidate id.
    ///
    /// # Errors
    ///
    /// Scorer errors other than missing artifacts propagate, e.g.
    /// `MatchError::DimensionMismatch`.
    pub fn rank<S, St, I, Id>(
        &self,
        scorer: &S,
        query_id: &str,
        query: Option<&ChromaSequence>,
        candidate_ids: I,
        store: &St,
    ) -> Result<Ranking, MatchError>
    where
        S: Scorer,
        St: ArtifactStore<S::Artifact> + Sync,
        I: IntoIterator<Item = Id>,
        Id: AsRef<str>,
    {
        let ids: BTreeSet<String> = candidate_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();
        let ids: Vec<String> = ids.into_iter().collect();

        log::debug!(
            "Ranking {} candidates for {} with {} (parallel={})",
            ids.len(),
            query_id,
            scorer.name(),
            self.config.parallel
        );

        let evaluate = |id: &String| -> Result<(String, Outcome), MatchError> {
            let outcome = self.evaluate(scorer, query_id, query, id, store)?;
            Ok((id.clone(), outcome))
        };

        let outcomes: Vec<(String, Outcome)> = if self.config.parallel {
            ids.par_iter().map(evaluate).collect::<Result<_, _>>()?
        } else {
            ids.iter().map(evaluate).collect::<Result<_, _>>()?
        };

        let order = scorer.order();
        let mut entries = Vec::with_capacity(outcomes.len());
        let mut warnings = Vec::new();

        for (id, outcome) in outcomes {
            match outcome {
                Outcome::Scored(score) => entries.push(RankedCandidate {
                    id,
                    score,
                    status: ScoreStatus::Scored,
                }),
                Outcome::Missing(warning) => {
                    self.observer.on_missing(query_id, &warning);
                    warnings.push(warning);
                    let placeholder = match self.config.missing_policy {
                        MissingArtifactPolicy::Sentinel => Some(SENTINEL_SCORE),
                        MissingArtifactPolicy::Unavailable => Some(order.worst()),
                        MissingArtifactPolicy::Exclude => None,
                    };
                    if let Some(score) = placeholder {
                        entries.push(RankedCandidate {
                            id,
                            score,
                            status: ScoreStatus::Missing,
                        });
                    }
                }
            }
        }

        sort_entries(&mut entries, order);

        let ranking = Ranking {
            query_id: query_id.to_string(),
            order,
            entries,
            warnings,
        };
        self.observer.on_ranked(&ranking);
        Ok(ranking)
    }

    /// Best candidate for `query`, or `None` if nothing was ranked
    pub fn best<S, St, I, Id>(
        &self,
        scorer: &S,
        query_id: &str,
        query: Option<&ChromaSequence>,
        candidate_ids: I,
        store: &St,
    ) -> Result<Option<RankedCandidate>, MatchError>
    where
        S: Scorer,
        St: ArtifactStore<S::Artifact> + Sync,
        I: IntoIterator<Item = Id>,
        Id: AsRef<str>,
    {
        let ranking = self.rank(scorer, query_id, query, candidate_ids, store)?;
        Ok(ranking.entries.into_iter().next())
    }

    fn evaluate<S, St>(
        &self,
        scorer: &S,
        query_id: &str,
        query: Option<&ChromaSequence>,
        candidate_id: &str,
        store: &St,
    ) -> Result<Outcome, MatchError>
    where
        S: Scorer,
        St: ArtifactStore<S::Artifact> + Sync,
    {
        let query = match query {
            Some(query) => query,
            None => {
                return Ok(Outcome::Missing(RankingWarning {
                    candidate_id: candidate_id.to_string(),
                    kind: WarningKind::MissingQuery,
                    message: format!("query {} is unavailable", query_id),
                }))
            }
        };

        let artifact = match store.get(candidate_id) {
            Some(artifact) => artifact,
            None => {
                return Ok(Outcome::Missing(RankingWarning {
                    candidate_id: candidate_id.to_string(),
                    kind: WarningKind::MissingCandidate,
                    message: format!("no {} artifact for {}", scorer.name(), candidate_id),
                }))
            }
        };

        let start = Instant::now();
        let score = scorer.score(artifact, query)?;
        self.observer
            .on_scored(query_id, candidate_id, score, start.elapsed());
        Ok(Outcome::Scored(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoreOrder;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scorer whose artifact is the score itself
    struct FixedScorer(ScoreOrder);

    impl Scorer for FixedScorer {
        type Artifact = f64;

        fn order(&self) -> ScoreOrder {
            self.0
        }

        fn name(&self) -> &'static str {
            "fixed"
        }

        fn score(&self, artifact: &f64, _query: &ChromaSequence) -> Result<f64, MatchError> {
            Ok(*artifact)
        }
    }

    #[derive(Default)]
    struct Recorder {
        missing: Mutex<Vec<String>>,
        scored: Mutex<Vec<String>>,
    }

    impl RankingObserver for Recorder {
        fn on_missing(&self, _query_id: &str, warning: &RankingWarning) {
            self.missing.lock().unwrap().push(warning.candidate_id.clone());
        }

        fn on_scored(
            &self,
            _query_id: &str,
            candidate_id: &str,
            _score: f64,
            _elapsed: std::time::Duration,
        ) {
            self.scored.lock().unwrap().push(candidate_id.to_string());
        }
    }

    fn store() -> HashMap<String, f64> {
        [("A", 5.0), ("B", 9.0), ("C", 2.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn query() -> ChromaSequence {
        ChromaSequence::from_frames(vec![vec![0.0; 12]]).unwrap()
    }

    #[test]
    fn test_descending_and_ascending() {
        let engine = RankingEngine::new(MatchConfig::default());
        let q = query();

        let ranking = engine
            .rank(
                &FixedScorer(ScoreOrder::HigherIsBetter),
                "q",
                Some(&q),
                ["A", "B", "C"],
                &store(),
            )
            .unwrap();
        assert_eq!(ranking.ids(), vec!["B", "A", "C"]);

        let ranking = engine
            .rank(
                &FixedScorer(ScoreOrder::LowerIsBetter),
                "q",
                Some(&q),
                ["A", "B", "C"],
                &store(),
            )
            .unwrap();
        assert_eq!(ranking.ids(), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let engine = RankingEngine::new(MatchConfig::default());
        let q = query();
        let ranking = engine
            .rank(
                &FixedScorer(ScoreOrder::HigherIsBetter),
                "q",
                Some(&q),
                vec!["A", "A", "C", "C"],
                &store(),
            )
            .unwrap();
        assert_eq!(ranking.ids(), vec!["A", "C"]);
    }

    #[test]
    fn test_missing_candidate_policies() {
        let q = query();
        let scorer = FixedScorer(ScoreOrder::LowerIsBetter);
        let ids = ["A", "B", "Z"];

        let recorder = Arc::new(Recorder::default());
        let engine = RankingEngine::new(MatchConfig::default()).with_observer(recorder.clone());
        let ranking = engine.rank(&scorer, "q", Some(&q), ids, &store()).unwrap();
        assert_eq!(ranking.len(), 3);
        let z = &ranking.entries[ranking.position("Z").unwrap()];
        assert_eq!(z.score, 0.0);
        assert_eq!(z.status, ScoreStatus::Missing);
        assert_eq!(ranking.warnings.len(), 1);
        assert_eq!(ranking.warnings[0].kind, WarningKind::MissingCandidate);
        assert_eq!(*recorder.missing.lock().unwrap(), vec!["Z".to_string()]);
        assert_eq!(recorder.scored.lock().unwrap().len(), 2);

        let config = MatchConfig {
            missing_policy: MissingArtifactPolicy::Unavailable,
            ..MatchConfig::default()
        };
        let ranking = RankingEngine::new(config)
            .rank(&scorer, "q", Some(&q), ids, &store())
            .unwrap();
        assert_eq!(ranking.ids(), vec!["A", "B", "Z"]);
        assert_eq!(ranking.entries[2].score, f64::INFINITY);

        let config = MatchConfig {
            missing_policy: MissingArtifactPolicy::Exclude,
            ..MatchConfig::default()
        };
        let ranking = RankingEngine::new(config)
            .rank(&scorer, "q", Some(&q), ids, &store())
            .unwrap();
        assert_eq!(ranking.ids(), vec!["A", "B"]);
        assert_eq!(ranking.warnings.len(), 1);
    }

    #[test]
    fn test_missing_query_marks_every_candidate() {
        let engine = RankingEngine::new(MatchConfig::default());
        let ranking = engine
            .rank(
                &FixedScorer(ScoreOrder::HigherIsBetter),
                "gone",
                None,
                ["A", "B"],
                &store(),
            )
            .unwrap();
        assert_eq!(ranking.len(), 2);
        assert!(ranking.iter().all(|e| e.status == ScoreStatus::Missing));
        assert!(ranking
            .warnings
            .iter()
            .all(|w| w.kind == WarningKind::MissingQuery));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let q = query();
        let scorer = FixedScorer(ScoreOrder::HigherIsBetter);
        let store: HashMap<String, f64> = (0..50)
            .map(|i| (format!("c{:02}", i), (i % 7) as f64))
            .collect();
        let ids: Vec<String> = store.keys().cloned().collect();

        let sequential = RankingEngine::new(MatchConfig::default())
            .rank(&scorer, "q", Some(&q), &ids, &store)
            .unwrap();
        let parallel = RankingEngine::new(MatchConfig {
            parallel: true,
            ..MatchConfig::default()
        })
        .rank(&scorer, "q", Some(&q), &ids, &store)
        .unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(sequential.len(), 50);
    }

    #[test]
    fn test_best_and_empty() {
        let engine = RankingEngine::new(MatchConfig::default());
        let q = query();
        let scorer = FixedScorer(ScoreOrder::HigherIsBetter);

        let best = engine
            .best(&scorer, "q", Some(&q), ["A", "B", "C"], &store())
            .unwrap();
        assert_eq!(best.map(|b| b.id), Some("B".to_string()));

        let none = engine
            .best(&scorer, "q", Some(&q), Vec::<String>::new(), &store())
            .unwrap();
        assert!(none.is_none());
    }
}
