//! Statistical-model scorer
//!
//! Trains one Gaussian HMM per candidate sequence and scores a query by its
//! log-likelihood under the candidate's model. Higher is better.

use super::hmm::{training, GaussianHmm};
use super::{ScoreOrder, Scorer};
use crate::chroma::ChromaSequence;
use crate::config::HmmConfig;
use crate::error::MatchError;

/// HMM log-likelihood scorer
#[derive(Debug, Clone, Default)]
pub struct LikelihoodScorer {
    config: HmmConfig,
}

impl LikelihoodScorer {
    /// Create a scorer that trains models with `config`
    pub fn new(config: HmmConfig) -> Self {
        Self { config }
    }

    /// Training configuration
    pub fn config(&self) -> &HmmConfig {
        &self.config
    }

    /// Train a model on one candidate's chroma sequence
    ///
    /// # Errors
    ///
    /// `MatchError::ModelTraining` if the sequence has fewer frames than the
    /// configured number of states, or training breaks down numerically.
    ///
    /// # Example
    ///
    /// ```
    /// use chroma_match::{ChromaSequence, HmmConfig, LikelihoodScorer};
    ///
    /// let frames: Vec<Vec<f32>> = (0..30)
    ///     .map(|t| {
    ///         let mut frame = vec![0.05f32; 12];
    ///         frame[(t / 6) % 12] = 1.0;
    ///         frame
    ///     })
    ///     .collect();
    /// let sequence = ChromaSequence::from_frames(frames)?;
    ///
    /// let scorer = LikelihoodScorer::new(HmmConfig { n_iter: 20, ..HmmConfig::default() });
    /// let model = scorer.build(&sequence)?;
    /// assert_eq!(model.n_states(), 5);
    /// # Ok::<(), chroma_match::MatchError>(())
    /// ```
    pub fn build(&self, sequence: &ChromaSequence) -> Result<GaussianHmm, MatchError> {
        training::fit(sequence, &self.config)
    }
}

impl Scorer for LikelihoodScorer {
    type Artifact = GaussianHmm;

    fn order(&self) -> ScoreOrder {
        ScoreOrder::HigherIsBetter
    }

    fn name(&self) -> &'static str {
        "hmm-likelihood"
    }

    fn score(&self, model: &GaussianHmm, query: &ChromaSequence) -> Result<f64, MatchError> {
        model.score(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Five recurring chord shapes with a little jitter
    fn progression(n_frames: usize, rng: &mut StdRng) -> ChromaSequence {
        let chords: [[usize; 3]; 5] = [[0, 4, 7], [5, 9, 0], [7, 11, 2], [9, 0, 4], [2, 5, 9]];
        let frames = (0..n_frames)
            .map(|t| {
                let mut frame: Vec<f32> = (0..12).map(|_| rng.gen_range(0.0..0.05)).collect();
                for &pc in &chords[(t / 6) % chords.len()] {
                    frame[pc] = 0.8 + rng.gen_range(0.0..0.1);
                }
                frame
            })
            .collect();
        ChromaSequence::from_frames(frames).unwrap()
    }

    fn noise(n_frames: usize, n_features: usize, rng: &mut StdRng) -> ChromaSequence {
        let frames = (0..n_frames)
            .map(|_| (0..n_features).map(|_| rng.gen_range(0.0..1.0)).collect())
            .collect();
        ChromaSequence::from_frames(frames).unwrap()
    }

    fn scorer() -> LikelihoodScorer {
        LikelihoodScorer::new(HmmConfig {
            n_iter: 100,
            ..HmmConfig::default()
        })
    }

    #[test]
    fn test_own_data_beats_noise() {
        let mut rng = StdRng::seed_from_u64(42);
        let training = progression(120, &mut rng);
        let random = noise(120, 12, &mut rng);

        let scorer = scorer();
        let model = scorer.build(&training).unwrap();
        let own = scorer.score(&model, &training).unwrap();
        let other = scorer.score(&model, &random).unwrap();

        assert!(own.is_finite());
        assert!(own > other, "own={} noise={}", own, other);
    }

    #[test]
    fn test_too_few_frames() {
        let mut rng = StdRng::seed_from_u64(3);
        let short = noise(4, 12, &mut rng);
        assert!(matches!(
            scorer().build(&short),
            Err(MatchError::ModelTraining(_))
        ));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let mut rng = StdRng::seed_from_u64(9);
        let ten_features = noise(40, 10, &mut rng);
        let query = noise(20, 12, &mut rng);

        let scorer = scorer();
        let model = scorer.build(&ten_features).unwrap();
        assert_eq!(model.n_features(), 10);
        assert_eq!(
            scorer.score(&model, &query),
            Err(MatchError::DimensionMismatch {
                expected: 10,
                found: 12
            })
        );
    }
}
