//! Matcher
//!
//! Owns the query and candidate sequences plus the model bank, and resolves
//! ids to artifacts for whichever scorer a ranking asks for.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::chroma::ChromaSequence;
use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::ranking::{RankedCandidate, Ranking, RankingEngine, RankingObserver};
use crate::scoring::{
    AlignmentScorer, BuildReport, GaussianHmm, LikelihoodScorer, ModelBank, ScorerKind,
};
use crate::store::ArtifactStore;

/// Query/candidate matcher over in-memory artifacts
///
/// # Example
///
/// ```
/// use chroma_match::{ChromaSequence, MatchConfig, Matcher, ScorerKind};
///
/// let frames = |root: usize| -> Vec<Vec<f32>> {
///     (0..20)
///         .map(|t| {
///             let mut frame = vec![0.0f32; 12];
///             frame[(root + t / 5) % 12] = 1.0;
///             frame
///         })
///         .collect()
/// };
///
/// let mut matcher = Matcher::new(MatchConfig::default());
/// matcher.insert_query("song.mid", ChromaSequence::from_frames(frames(0))?)?;
/// matcher.insert_candidate("song.wav", ChromaSequence::from_frames(frames(0))?)?;
/// matcher.insert_candidate("other.wav", ChromaSequence::from_frames(frames(6))?)?;
///
/// let best = matcher.best("song.mid", ["song.wav", "other.wav"], ScorerKind::Alignment)?;
/// assert_eq!(best.map(|b| b.id), Some("song.wav".to_string()));
/// # Ok::<(), chroma_match::MatchError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Matcher {
    engine: RankingEngine,
    likelihood: LikelihoodScorer,
    alignment: AlignmentScorer,
    queries: BTreeMap<String, ChromaSequence>,
    candidates: BTreeMap<String, ChromaSequence>,
    models: ModelBank,
}

impl Matcher {
    /// Create an empty matcher
    pub fn new(config: MatchConfig) -> Self {
        let likelihood = LikelihoodScorer::new(config.hmm.clone());
        Self {
            engine: RankingEngine::new(config),
            likelihood,
            alignment: AlignmentScorer::new(),
            queries: BTreeMap::new(),
            candidates: BTreeMap::new(),
            models: ModelBank::new(),
        }
    }

    /// Replace the ranking observer
    pub fn with_observer(mut self, observer: Arc<dyn RankingObserver>) -> Self {
        self.engine = self.engine.with_observer(observer);
        self
    }

    /// Matcher configuration
    pub fn config(&self) -> &MatchConfig {
        self.engine.config()
    }

    /// Register a query sequence
    ///
    /// # Errors
    ///
    /// `MatchError::InvalidInput` if the sequence carries a hop length other
    /// than the configured one.
    pub fn insert_query(
        &mut self,
        id: impl Into<String>,
        sequence: ChromaSequence,
    ) -> Result<Option<ChromaSequence>, MatchError> {
        self.check_hop_length(&sequence)?;
        Ok(self.queries.insert(id.into(), sequence))
    }

    /// Register a candidate sequence
    ///
    /// Replacing an existing sequence discards the candidate's model, which
    /// no longer describes it.
    pub fn insert_candidate(
        &mut self,
        id: impl Into<String>,
        sequence: ChromaSequence,
    ) -> Result<Option<ChromaSequence>, MatchError> {
        self.check_hop_length(&sequence)?;
        let id = id.into();
        let previous = self.candidates.insert(id.clone(), sequence);
        if previous.is_some() && self.models.remove(&id).is_some() {
            log::debug!("Discarded stale model for {}", id);
        }
        Ok(previous)
    }

    /// Bind a pre-trained model to a candidate
    pub fn insert_model(
        &mut self,
        id: impl Into<String>,
        model: GaussianHmm,
    ) -> Option<GaussianHmm> {
        self.models.insert(id, model)
    }

    /// Trained models
    pub fn models(&self) -> &ModelBank {
        &self.models
    }

    /// Train models for candidates without one (all candidates when `force`)
    ///
    /// Progress goes to the matcher's observer.
    pub fn build_models(&mut self, force: bool) -> BuildReport {
        let parallel = self.engine.config().parallel;
        self.models.build(
            &self.candidates,
            &self.likelihood,
            force,
            parallel,
            self.engine.observer(),
        )
    }

    /// Rank `candidate_ids` against the query `query_id`
    pub fn rank<I, Id>(
        &self,
        query_id: &str,
        candidate_ids: I,
        kind: ScorerKind,
    ) -> Result<Ranking, MatchError>
    where
        I: IntoIterator<Item = Id>,
        Id: AsRef<str>,
    {
        let query = self.queries.get(query_id);
        match kind {
            ScorerKind::Likelihood => self.engine.rank(
                &self.likelihood,
                query_id,
                query,
                candidate_ids,
                &self.models,
            ),
            ScorerKind::Alignment => self.engine.rank(
                &self.alignment,
                query_id,
                query,
                candidate_ids,
                &self.candidates,
            ),
        }
    }

    /// Best candidate among `candidate_ids` for the query `query_id`
    pub fn best<I, Id>(
        &self,
        query_id: &str,
        candidate_ids: I,
        kind: ScorerKind,
    ) -> Result<Option<RankedCandidate>, MatchError>
    where
        I: IntoIterator<Item = Id>,
        Id: AsRef<str>,
    {
        let ranking = self.rank(query_id, candidate_ids, kind)?;
        Ok(ranking.entries.into_iter().next())
    }

    /// Rank every candidate that has an artifact for `kind`
    pub fn rank_against_all(
        &self,
        query_id: &str,
        kind: ScorerKind,
    ) -> Result<Ranking, MatchError> {
        let ids = match kind {
            ScorerKind::Likelihood => self.models.ids(),
            ScorerKind::Alignment => ArtifactStore::ids(&self.candidates),
        };
        self.rank(query_id, ids, kind)
    }

    /// Rank every candidate against every query, in query id order
    pub fn rank_all_queries(&self, kind: ScorerKind) -> Result<Vec<Ranking>, MatchError> {
        log::info!(
            "Running {} queries through {:?} scoring",
            self.queries.len(),
            kind
        );
        self.queries
            .keys()
            .map(|query_id| self.rank_against_all(query_id, kind))
            .collect()
    }

    fn check_hop_length(&self, sequence: &ChromaSequence) -> Result<(), MatchError> {
        let expected = self.engine.config().hop_length;
        match sequence.hop_length() {
            Some(hop) if hop != expected => Err(MatchError::InvalidInput(format!(
                "Sequence hop length {} does not match configured {}",
                hop, expected
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HmmConfig;

    fn rotating(root: usize, n: usize) -> ChromaSequence {
        let frames = (0..n)
            .map(|t| {
                let mut frame = vec![0.02f32; 12];
                frame[(root + (t / 4) * 3) % 12] = 1.0 + (t % 3) as f32 * 0.02;
                frame
            })
            .collect();
        ChromaSequence::from_frames(frames).unwrap()
    }

    fn matcher() -> Matcher {
        let config = MatchConfig {
            debug: false,
            hmm: HmmConfig {
                n_states: 4,
                n_iter: 40,
                ..HmmConfig::default()
            },
            ..MatchConfig::default()
        };
        let mut matcher = Matcher::new(config);
        matcher.insert_query("q", rotating(0, 32)).unwrap();
        matcher.insert_candidate("same", rotating(0, 40)).unwrap();
        matcher.insert_candidate("shifted", rotating(1, 40)).unwrap();
        matcher
    }

    #[test]
    fn test_alignment_prefers_same_progression() {
        let matcher = matcher();
        let ranking = matcher
            .rank_against_all("q", ScorerKind::Alignment)
            .unwrap();
        assert_eq!(ranking.ids(), vec!["same", "shifted"]);
    }

    #[test]
    fn test_likelihood_needs_models() {
        let mut matcher = matcher();
        assert!(matcher
            .rank_against_all("q", ScorerKind::Likelihood)
            .unwrap()
            .is_empty());

        let report = matcher.build_models(false);
        assert_eq!(report.built.len(), 2);

        let best = matcher
            .best("q", ["same", "shifted"], ScorerKind::Likelihood)
            .unwrap()
            .unwrap();
        assert_eq!(best.id, "same");
    }

    #[test]
    fn test_replacing_candidate_drops_model() {
        let mut matcher = matcher();
        matcher.build_models(false);
        assert!(matcher.models().contains("same"));

        matcher.insert_candidate("same", rotating(2, 40)).unwrap();
        assert!(!matcher.models().contains("same"));
        assert!(matcher.models().contains("shifted"));
    }

    #[test]
    fn test_hop_length_mismatch_rejected() {
        let mut matcher = matcher();
        let result = matcher.insert_candidate("bad", rotating(0, 8).with_hop_length(512));
        assert!(matches!(result, Err(MatchError::InvalidInput(_))));
        assert!(matcher
            .insert_candidate("good", rotating(0, 8).with_hop_length(2048))
            .is_ok());
    }

    #[test]
    fn test_rank_all_queries() {
        let mut matcher = matcher();
        matcher.insert_query("a", rotating(1, 20)).unwrap();
        let rankings = matcher.rank_all_queries(ScorerKind::Alignment).unwrap();

        let query_ids: Vec<&str> = rankings.iter().map(|r| r.query_id.as_str()).collect();
        assert_eq!(query_ids, vec!["a", "q"]);
        assert_eq!(rankings[0].best().map(|b| b.id.as_str()), Some("shifted"));
    }
}
