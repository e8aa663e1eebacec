//! Gaussian HMM with full covariance
//!
//! Holds the trained parameters and evaluates sequences with the forward
//! algorithm (log-likelihood) and the Viterbi algorithm (state path). All
//! recursions run in log space.

use std::f64::consts::PI;

use super::linalg::Cholesky;
use crate::chroma::ChromaSequence;
use crate::error::MatchError;

/// Tolerance on probability vectors summing to one
const PROB_SUM_TOLERANCE: f64 = 1e-6;

/// `ln(Σ exp(x))` without overflow; `-inf` for an all `-inf` input
pub(crate) fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

pub(crate) fn to_f64_frames(sequence: &ChromaSequence) -> Vec<Vec<f64>> {
    sequence
        .frames()
        .iter()
        .map(|frame| frame.iter().map(|&v| v as f64).collect())
        .collect()
}

/// Trained Gaussian Hidden Markov Model
///
/// Immutable once built; produced by
/// [`LikelihoodScorer::build`](crate::scoring::LikelihoodScorer::build) or
/// assembled directly with [`GaussianHmm::from_parameters`].
#[derive(Debug, Clone)]
pub struct GaussianHmm {
    start_prob: Vec<f64>,
    transitions: Vec<Vec<f64>>,
    means: Vec<Vec<f64>>,
    covariances: Vec<Vec<f64>>,
    factors: Vec<Cholesky>,
    n_features: usize,
    pub(crate) log_likelihood: f64,
    pub(crate) iterations: usize,
    pub(crate) converged: bool,
}

impl GaussianHmm {
    /// Assemble a model from explicit parameters
    ///
    /// # Arguments
    ///
    /// * `start_prob` - Initial state distribution (length `n_states`)
    /// * `transitions` - Row-stochastic `n_states x n_states` matrix
    /// * `means` - One mean vector per state
    /// * `covariances` - One row-major `n_features x n_features` matrix per state
    ///
    /// # Errors
    ///
    /// `MatchError::InvalidInput` for inconsistent shapes or non-stochastic
    /// probabilities, `MatchError::ModelTraining` for a covariance that is not
    /// positive definite.
    pub fn from_parameters(
        start_prob: Vec<f64>,
        transitions: Vec<Vec<f64>>,
        means: Vec<Vec<f64>>,
        covariances: Vec<Vec<f64>>,
    ) -> Result<Self, MatchError> {
        let n_states = start_prob.len();
        if n_states == 0 {
            return Err(MatchError::InvalidInput(
                "Model needs at least one state".to_string(),
            ));
        }
        if transitions.len() != n_states || means.len() != n_states || covariances.len() != n_states
        {
            return Err(MatchError::InvalidInput(format!(
                "Inconsistent state counts: start={}, transitions={}, means={}, covariances={}",
                n_states,
                transitions.len(),
                means.len(),
                covariances.len()
            )));
        }

        check_distribution(&start_prob, "start probabilities")?;
        for (i, row) in transitions.iter().enumerate() {
            if row.len() != n_states {
                return Err(MatchError::InvalidInput(format!(
                    "Transition row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n_states
                )));
            }
            check_distribution(row, "transition row")?;
        }

        let n_features = means[0].len();
        if n_features == 0 {
            return Err(MatchError::InvalidInput(
                "Model means must have at least one feature".to_string(),
            ));
        }
        for mean in &means {
            if mean.len() != n_features {
                return Err(MatchError::DimensionMismatch {
                    expected: n_features,
                    found: mean.len(),
                });
            }
        }

        let factors = factorize(&covariances, n_features)?;

        Ok(Self {
            start_prob,
            transitions,
            means,
            covariances,
            factors,
            n_features,
            log_likelihood: f64::NAN,
            iterations: 0,
            converged: false,
        })
    }

    /// Number of hidden states
    pub fn n_states(&self) -> usize {
        self.start_prob.len()
    }

    /// Feature dimensionality the model was built for
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Initial state distribution
    pub fn start_prob(&self) -> &[f64] {
        &self.start_prob
    }

    /// State transition matrix (rows sum to one)
    pub fn transitions(&self) -> &[Vec<f64>] {
        &self.transitions
    }

    /// Per-state mean vectors
    pub fn means(&self) -> &[Vec<f64>] {
        &self.means
    }

    /// Per-state covariance matrices, row-major
    pub fn covariances(&self) -> &[Vec<f64>] {
        &self.covariances
    }

    /// Log-likelihood of the training sequence at the last EM iteration
    /// (NaN for models assembled from parameters)
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Number of EM iterations run
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether training stopped on the tolerance rather than the iteration cap
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Log-likelihood of `query` under the model (higher = better fit)
    ///
    /// # Errors
    ///
    /// - `MatchError::DimensionMismatch` if the query's feature count differs
    ///   from the model's
    /// - `MatchError::NumericalError` if the likelihood is not finite
    pub fn score(&self, query: &ChromaSequence) -> Result<f64, MatchError> {
        self.check_dimensions(query)?;

        let data = to_f64_frames(query);
        let log_em = self.log_emissions(&data);
        let (_, log_prob) = self.forward(&log_em);

        if log_prob.is_nan() || log_prob == f64::INFINITY {
            return Err(MatchError::NumericalError(format!(
                "Log-likelihood is {} for {} frames",
                log_prob,
                query.n_frames()
            )));
        }
        Ok(log_prob)
    }

    /// Most likely hidden state path for `query` and its log-probability
    pub fn decode(&self, query: &ChromaSequence) -> Result<(Vec<usize>, f64), MatchError> {
        self.check_dimensions(query)?;

        let data = to_f64_frames(query);
        let log_em = self.log_emissions(&data);
        let log_trans = self.log_transitions();
        let k = self.n_states();
        let n = data.len();

        let mut delta: Vec<f64> = (0..k)
            .map(|s| self.start_prob[s].ln() + log_em[0][s])
            .collect();
        let mut backpointers = vec![vec![0usize; k]; n];

        for t in 1..n {
            let mut next = vec![f64::NEG_INFINITY; k];
            for j in 0..k {
                let (best_i, best_val) = (0..k)
                    .map(|i| (i, delta[i] + log_trans[i][j]))
                    .fold((0, f64::NEG_INFINITY), |acc, cur| {
                        if cur.1 > acc.1 {
                            cur
                        } else {
                            acc
                        }
                    });
                next[j] = best_val + log_em[t][j];
                backpointers[t][j] = best_i;
            }
            delta = next;
        }

        let (mut state, log_prob) = delta
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |acc, (i, &v)| {
                if v > acc.1 {
                    (i, v)
                } else {
                    acc
                }
            });

        let mut path = vec![0usize; n];
        for t in (0..n).rev() {
            path[t] = state;
            if t > 0 {
                state = backpointers[t][state];
            }
        }

        Ok((path, log_prob))
    }

    fn check_dimensions(&self, query: &ChromaSequence) -> Result<(), MatchError> {
        if query.n_features() != self.n_features {
            return Err(MatchError::DimensionMismatch {
                expected: self.n_features,
                found: query.n_features(),
            });
        }
        Ok(())
    }

    pub(crate) fn set_parameters(
        &mut self,
        start_prob: Vec<f64>,
        transitions: Vec<Vec<f64>>,
        means: Vec<Vec<f64>>,
        covariances: Vec<Vec<f64>>,
    ) -> Result<(), MatchError> {
        self.factors = factorize(&covariances, self.n_features)?;
        self.start_prob = start_prob;
        self.transitions = transitions;
        self.means = means;
        self.covariances = covariances;
        Ok(())
    }

    pub(crate) fn log_transitions(&self) -> Vec<Vec<f64>> {
        self.transitions
            .iter()
            .map(|row| row.iter().map(|p| p.ln()).collect())
            .collect()
    }

    /// `ln N(x_t | μ_s, Σ_s)` for every frame and state
    pub(crate) fn log_emissions(&self, data: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let constant = self.n_features as f64 * (2.0 * PI).ln();
        let mut diff = vec![0.0f64; self.n_features];

        data.iter()
            .map(|x| {
                self.means
                    .iter()
                    .zip(&self.factors)
                    .map(|(mean, factor)| {
                        for (d, (xi, mi)) in diff.iter_mut().zip(x.iter().zip(mean)) {
                            *d = xi - mi;
                        }
                        -0.5 * (constant + factor.log_det() + factor.mahalanobis(&diff))
                    })
                    .collect()
            })
            .collect()
    }

    /// Forward pass: `ln α_t(s)` for all frames and the sequence log-likelihood
    pub(crate) fn forward(&self, log_em: &[Vec<f64>]) -> (Vec<Vec<f64>>, f64) {
        let k = self.n_states();
        let log_trans = self.log_transitions();
        let mut log_alpha = vec![vec![f64::NEG_INFINITY; k]; log_em.len()];
        let mut scratch = vec![0.0f64; k];

        for s in 0..k {
            log_alpha[0][s] = self.start_prob[s].ln() + log_em[0][s];
        }
        for t in 1..log_em.len() {
            for j in 0..k {
                for i in 0..k {
                    scratch[i] = log_alpha[t - 1][i] + log_trans[i][j];
                }
                log_alpha[t][j] = log_sum_exp(&scratch) + log_em[t][j];
            }
        }

        let log_prob = log_alpha
            .last()
            .map(|row| log_sum_exp(row))
            .unwrap_or(f64::NEG_INFINITY);
        (log_alpha, log_prob)
    }

    /// Backward pass: `ln β_t(s)` for all frames
    pub(crate) fn backward(&self, log_em: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let k = self.n_states();
        let n = log_em.len();
        let log_trans = self.log_transitions();
        let mut log_beta = vec![vec![0.0f64; k]; n];
        let mut scratch = vec![0.0f64; k];

        for t in (0..n.saturating_sub(1)).rev() {
            for i in 0..k {
                for j in 0..k {
                    scratch[j] = log_trans[i][j] + log_em[t + 1][j] + log_beta[t + 1][j];
                }
                log_beta[t][i] = log_sum_exp(&scratch);
            }
        }
        log_beta
    }
}

fn check_distribution(probs: &[f64], what: &str) -> Result<(), MatchError> {
    if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(MatchError::InvalidInput(format!(
            "{} must be non-negative and finite",
            what
        )));
    }
    let sum: f64 = probs.iter().sum();
    if (sum - 1.0).abs() > PROB_SUM_TOLERANCE {
        return Err(MatchError::InvalidInput(format!(
            "{} must sum to 1, got {}",
            what, sum
        )));
    }
    Ok(())
}

fn factorize(covariances: &[Vec<f64>], n_features: usize) -> Result<Vec<Cholesky>, MatchError> {
    covariances
        .iter()
        .enumerate()
        .map(|(s, cov)| {
            if cov.len() != n_features * n_features {
                return Err(MatchError::InvalidInput(format!(
                    "Covariance {} has {} entries, expected {}",
                    s,
                    cov.len(),
                    n_features * n_features
                )));
            }
            Cholesky::new(cov, n_features).ok_or_else(|| {
                MatchError::ModelTraining(format!(
                    "Covariance of state {} is not positive definite",
                    s
                ))
            })
        })
        .collect()
}
