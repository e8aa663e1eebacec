//! Baum-Welch training
//!
//! # Algorithm
//!
//! 1. Means from k-means, every state starts with the pooled data covariance
//!    (plus `min_covar` on the diagonal), uniform start and transition
//!    probabilities
//! 2. E-step: forward/backward in log space, state posteriors and expected
//!    transition counts
//! 3. M-step: MAP update under Dirichlet priors for start and transition
//!    probabilities, covariance numerator regularised by `covars_prior`
//! 4. Stop once the log-likelihood gain drops below `tol`, or after `n_iter`
//!    iterations

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::kmeans::kmeans;
use super::model::{log_sum_exp, to_f64_frames, GaussianHmm};
use crate::chroma::ChromaSequence;
use crate::config::HmmConfig;
use crate::error::MatchError;

/// States whose total posterior mass falls below this keep their parameters
const MIN_POSTERIOR_MASS: f64 = 1e-10;

/// Floor on the covariance denominator
const MIN_COVAR_DENOMINATOR: f64 = 1e-5;

/// Sufficient statistics collected by one E-step
struct Statistics {
    log_prob: f64,
    start: Vec<f64>,
    transitions: Vec<Vec<f64>>,
    posteriors: Vec<Vec<f64>>,
    mass: Vec<f64>,
}

/// Fit a Gaussian HMM to one frames-major sequence
///
/// # Errors
///
/// `MatchError::ModelTraining` if the sequence has fewer frames than states,
/// the log-likelihood becomes non-finite, or a covariance update loses
/// positive definiteness. `MatchError::InvalidInput` for an invalid config.
pub(crate) fn fit(
    sequence: &ChromaSequence,
    config: &HmmConfig,
) -> Result<GaussianHmm, MatchError> {
    config.validate()?;

    let k = config.n_states;
    let n = sequence.n_frames();
    let dim = sequence.n_features();

    if n < k {
        return Err(MatchError::ModelTraining(format!(
            "Need at least {} frames to train {} states, got {}",
            k, k, n
        )));
    }

    log::debug!(
        "Training {}-state HMM on {} frames x {} features (max {} iterations)",
        k,
        n,
        dim,
        config.n_iter
    );

    let data = to_f64_frames(sequence);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let means = kmeans(&data, k, config.kmeans_iter, &mut rng);

    let pooled = covariance(&data, config.min_covar);

    let mut model = GaussianHmm::from_parameters(
        vec![1.0 / k as f64; k],
        vec![vec![1.0 / k as f64; k]; k],
        means,
        vec![pooled; k],
    )?;

    let mut previous = f64::NEG_INFINITY;
    let mut converged = false;
    let mut iterations = 0;

    for iteration in 1..=config.n_iter {
        let stats = expectation(&model, &data)?;
        iterations = iteration;

        maximization(&mut model, &data, &stats, config)?;

        let gain = stats.log_prob - previous;
        previous = stats.log_prob;
        model.log_likelihood = stats.log_prob;

        if iteration > 1 && gain < config.tol {
            converged = true;
            break;
        }
    }

    model.iterations = iterations;
    model.converged = converged;

    if converged {
        log::debug!(
            "HMM converged after {} iterations (log-likelihood {:.4})",
            iterations,
            model.log_likelihood
        );
    } else {
        log::warn!(
            "HMM did not converge within {} iterations (log-likelihood {:.4})",
            config.n_iter,
            model.log_likelihood
        );
    }

    Ok(model)
}

fn expectation(model: &GaussianHmm, data: &[Vec<f64>]) -> Result<Statistics, MatchError> {
    let k = model.n_states();
    let n = data.len();

    let log_em = model.log_emissions(data);
    let (log_alpha, log_prob) = model.forward(&log_em);
    if !log_prob.is_finite() {
        return Err(MatchError::ModelTraining(format!(
            "Log-likelihood became {} during training",
            log_prob
        )));
    }
    let log_beta = model.backward(&log_em);
    let log_trans = model.log_transitions();

    let posteriors: Vec<Vec<f64>> = (0..n)
        .map(|t| {
            (0..k)
                .map(|s| (log_alpha[t][s] + log_beta[t][s] - log_prob).exp())
                .collect()
        })
        .collect();

    let mut transitions = vec![vec![0.0f64; k]; k];
    if n > 1 {
        let mut scratch = vec![0.0f64; n - 1];
        for i in 0..k {
            for j in 0..k {
                for t in 0..n - 1 {
                    scratch[t] = log_alpha[t][i]
                        + log_trans[i][j]
                        + log_em[t + 1][j]
                        + log_beta[t + 1][j]
                        - log_prob;
                }
                transitions[i][j] = log_sum_exp(&scratch).exp();
            }
        }
    }

    let mass: Vec<f64> = (0..k)
        .map(|s| posteriors.iter().map(|row| row[s]).sum())
        .collect();

    Ok(Statistics {
        log_prob,
        start: posteriors[0].clone(),
        transitions,
        posteriors,
        mass,
    })
}

fn maximization(
    model: &mut GaussianHmm,
    data: &[Vec<f64>],
    stats: &Statistics,
    config: &HmmConfig,
) -> Result<(), MatchError> {
    let k = model.n_states();
    let dim = model.n_features();

    let start_prob = normalize_with_prior(&stats.start, config.startprob_prior)
        .unwrap_or_else(|| model.start_prob().to_vec());

    let transitions: Vec<Vec<f64>> = stats
        .transitions
        .iter()
        .zip(model.transitions())
        .map(|(counts, old)| {
            normalize_with_prior(counts, config.transmat_prior).unwrap_or_else(|| old.clone())
        })
        .collect();

    let mut means = model.means().to_vec();
    let mut covariances = model.covariances().to_vec();

    for s in 0..k {
        let mass = stats.mass[s];
        if mass < MIN_POSTERIOR_MASS {
            log::debug!("State {} has no posterior mass, keeping parameters", s);
            continue;
        }

        let mut mean = vec![0.0f64; dim];
        for (x, gamma) in data.iter().zip(&stats.posteriors) {
            for (m, v) in mean.iter_mut().zip(x) {
                *m += gamma[s] * v;
            }
        }
        for m in mean.iter_mut() {
            *m /= mass;
        }

        let mut cov = vec![0.0f64; dim * dim];
        let mut diff = vec![0.0f64; dim];
        for (x, gamma) in data.iter().zip(&stats.posteriors) {
            let weight = gamma[s];
            if weight == 0.0 {
                continue;
            }
            for (d, (v, m)) in diff.iter_mut().zip(x.iter().zip(&mean)) {
                *d = v - m;
            }
            for a in 0..dim {
                for b in a..dim {
                    cov[a * dim + b] += weight * diff[a] * diff[b];
                }
            }
        }

        let denominator = mass.max(MIN_COVAR_DENOMINATOR);
        for a in 0..dim {
            cov[a * dim + a] += config.covars_prior;
            for b in a..dim {
                let value = cov[a * dim + b] / denominator;
                cov[a * dim + b] = value;
                cov[b * dim + a] = value;
            }
            cov[a * dim + a] += config.min_covar;
        }

        means[s] = mean;
        covariances[s] = cov;
    }

    model.set_parameters(start_prob, transitions, means, covariances)
}

/// MAP estimate of a categorical distribution under a symmetric Dirichlet prior
///
/// `None` when every adjusted count is zero.
fn normalize_with_prior(counts: &[f64], prior: f64) -> Option<Vec<f64>> {
    let adjusted: Vec<f64> = counts.iter().map(|c| (c + prior - 1.0).max(0.0)).collect();
    let total: f64 = adjusted.iter().sum();
    if !(total > 0.0) || !total.is_finite() {
        return None;
    }
    Some(adjusted.iter().map(|c| c / total).collect())
}

/// Sample covariance (n - 1 denominator, n for a single frame) plus `floor` on the diagonal
fn covariance(data: &[Vec<f64>], floor: f64) -> Vec<f64> {
    let n = data.len();
    let dim = data[0].len();
    let mut mean = vec![0.0f64; dim];
    for x in data {
        for (m, v) in mean.iter_mut().zip(x) {
            *m += v;
        }
    }
    for m in mean.iter_mut() {
        *m /= n as f64;
    }

    let mut cov = vec![0.0f64; dim * dim];
    for x in data {
        for a in 0..dim {
            for b in 0..dim {
                cov[a * dim + b] += (x[a] - mean[a]) * (x[b] - mean[b]);
            }
        }
    }
    let denominator = (n.max(2) - 1) as f64;
    for (i, c) in cov.iter_mut().enumerate() {
        *c /= denominator;
        if i % (dim + 1) == 0 {
            *c += floor;
        }
    }
    cov
}
