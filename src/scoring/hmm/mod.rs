//! Gaussian Hidden Markov Models
//!
//! Per-candidate statistical models for likelihood scoring:
//! - Full-covariance Gaussian HMM (forward scoring, Viterbi decoding)
//! - Baum-Welch training with k-means initialisation
//! - Model bank keyed by candidate id

pub mod bank;
pub mod model;

mod kmeans;
mod linalg;
pub(crate) mod training;

pub use bank::{BuildReport, ModelBank};
pub use model::GaussianHmm;
