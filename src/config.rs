//! Configuration parameters for model training and candidate ranking

use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// What to do with a candidate whose artifact (or the query itself) cannot be resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingArtifactPolicy {
    /// Keep the candidate with a literal score of 0.0 and record a warning
    ///
    /// Note that 0.0 is the best possible alignment distance, so under the
    /// alignment scorer a missing candidate can outrank real matches.
    #[default]
    Sentinel,

    /// Keep the candidate with the worst possible score for the scorer's ordering
    /// (negative infinity for likelihoods, positive infinity for distances)
    Unavailable,

    /// Drop the candidate from the ranked entries (the warning is still recorded)
    Exclude,
}

/// Hidden Markov Model training parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmmConfig {
    /// Number of hidden states (default: 5)
    pub n_states: usize,

    /// Maximum number of Baum-Welch iterations (default: 500)
    pub n_iter: usize,

    /// Convergence threshold on log-likelihood gain (default: 0.01)
    pub tol: f64,

    /// Dirichlet concentration for each transition row (default: 1.1)
    /// Values above 1.0 pull transitions towards uniform
    pub transmat_prior: f64,

    /// Dirichlet concentration for the start distribution (default: 1.0 = no prior)
    pub startprob_prior: f64,

    /// Diagonal prior added to each covariance numerator (default: 1e-2)
    pub covars_prior: f64,

    /// Floor added to covariance diagonals (default: 1e-3)
    pub min_covar: f64,

    /// Maximum Lloyd iterations for k-means initialisation (default: 100)
    pub kmeans_iter: usize,

    /// Seed for k-means++ initialisation
    pub seed: u64,
}

impl Default for HmmConfig {
    fn default() -> Self {
        Self {
            n_states: 5,
            n_iter: 500,
            tol: 1e-2,
            transmat_prior: 1.1,
            startprob_prior: 1.0,
            covars_prior: 1e-2,
            min_covar: 1e-3,
            kmeans_iter: 100,
            seed: 0x5eed_c0de,
        }
    }
}

impl HmmConfig {
    /// Check that the parameters describe a trainable model
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.n_states == 0 {
            return Err(MatchError::InvalidInput(
                "n_states must be at least 1".to_string(),
            ));
        }
        if self.n_iter == 0 {
            return Err(MatchError::InvalidInput(
                "n_iter must be at least 1".to_string(),
            ));
        }
        if !(self.min_covar > 0.0) {
            return Err(MatchError::InvalidInput(format!(
                "min_covar must be positive, got {}",
                self.min_covar
            )));
        }
        if self.covars_prior < 0.0 {
            return Err(MatchError::InvalidInput(format!(
                "covars_prior must be non-negative, got {}",
                self.covars_prior
            )));
        }
        if self.transmat_prior < 1.0 || self.startprob_prior < 1.0 {
            return Err(MatchError::InvalidInput(format!(
                "Dirichlet priors must be >= 1.0 (transmat_prior={}, startprob_prior={})",
                self.transmat_prior, self.startprob_prior
            )));
        }
        if !(self.tol >= 0.0) {
            return Err(MatchError::InvalidInput(format!(
                "tol must be non-negative, got {}",
                self.tol
            )));
        }
        Ok(())
    }
}

/// Matching configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Emit per-candidate progress and timing through the observer (default: true)
    pub debug: bool,

    /// Score candidates on the rayon thread pool (default: false)
    pub parallel: bool,

    /// Handling of unresolvable queries and candidates (default: Sentinel)
    pub missing_policy: MissingArtifactPolicy,

    /// Hop length the chroma sequences are expected to share (default: 2048)
    pub hop_length: usize,

    /// Model training parameters
    pub hmm: HmmConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            debug: true,
            parallel: false,
            missing_policy: MissingArtifactPolicy::default(),
            hop_length: 2048,
            hmm: HmmConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hmm_matches_reference_topology() {
        let config = HmmConfig::default();
        assert_eq!(config.n_states, 5);
        assert_eq!(config.n_iter, 500);
        assert!((config.transmat_prior - 1.1).abs() < 1e-12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_states() {
        let config = HmmConfig {
            n_states: 0,
            ..HmmConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MatchError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_rejects_weak_prior() {
        let config = HmmConfig {
            transmat_prior: 0.5,
            ..HmmConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_policy_is_sentinel() {
        assert_eq!(
            MatchConfig::default().missing_policy,
            MissingArtifactPolicy::Sentinel
        );
    }
}
