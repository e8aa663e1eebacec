//! Model bank
//!
//! Trained models keyed by candidate id. Building walks a sequence store and
//! trains a model for every candidate that does not have one yet (or for all
//! of them when forced). A failed build is reported and skipped; models
//! already in the bank are never rolled back.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use super::GaussianHmm;
use crate::chroma::ChromaSequence;
use crate::error::MatchError;
use crate::ranking::RankingObserver;
use crate::scoring::LikelihoodScorer;
use crate::store::ArtifactStore;

/// Outcome of a bank build pass
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Candidates whose model was (re)trained
    pub built: Vec<String>,

    /// Candidates that already had a model and were left untouched
    pub skipped: Vec<String>,

    /// Candidates whose training failed, with the reason
    pub failed: Vec<(String, MatchError)>,
}

impl BuildReport {
    /// True when no candidate failed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Trained models keyed by candidate id
#[derive(Debug, Clone, Default)]
pub struct ModelBank {
    models: BTreeMap<String, GaussianHmm>,
}

impl ModelBank {
    /// Create an empty bank
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a model to `id`, replacing (and returning) any previous one
    pub fn insert(&mut self, id: impl Into<String>, model: GaussianHmm) -> Option<GaussianHmm> {
        self.models.insert(id.into(), model)
    }

    /// Remove the model bound to `id`
    pub fn remove(&mut self, id: &str) -> Option<GaussianHmm> {
        self.models.remove(id)
    }

    /// Whether `id` has a model
    pub fn contains(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    /// Number of models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// True when the bank holds no models
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Train models for the candidates in `sequences`
    ///
    /// # Arguments
    ///
    /// * `sequences` - Candidate chroma sequences
    /// * `scorer` - Likelihood scorer carrying the training configuration
    /// * `force` - Retrain candidates that already have a model
    /// * `parallel` - Train on the rayon thread pool
    /// * `observer` - Receives one skipped, built or failed event per candidate
    pub fn build<S>(
        &mut self,
        sequences: &S,
        scorer: &LikelihoodScorer,
        force: bool,
        parallel: bool,
        observer: &dyn RankingObserver,
    ) -> BuildReport
    where
        S: ArtifactStore<ChromaSequence> + Sync,
    {
        let mut report = BuildReport::default();
        let mut pending = Vec::new();

        for id in sequences.ids() {
            if self.contains(&id) && !force {
                observer.on_build_skipped(&id);
                report.skipped.push(id);
            } else {
                pending.push(id);
            }
        }

        log::info!(
            "Building {} models ({} already built, force={})",
            pending.len(),
            report.skipped.len(),
            force
        );

        type Trained = (String, Duration, Result<GaussianHmm, MatchError>);

        let train = |id: &String| -> Trained {
            let start = Instant::now();
            let result = match sequences.get(id) {
                Some(sequence) => scorer.build(sequence),
                None => Err(MatchError::MissingArtifact(format!(
                    "No chroma sequence for {}",
                    id
                ))),
            };
            (id.clone(), start.elapsed(), result)
        };

        let outcomes: Vec<Trained> = if parallel {
            pending.par_iter().map(train).collect()
        } else {
            pending.iter().map(train).collect()
        };

        for (id, elapsed, outcome) in outcomes {
            match outcome {
                Ok(model) => {
                    observer.on_built(&id, elapsed);
                    self.models.insert(id.clone(), model);
                    report.built.push(id);
                }
                Err(e) => {
                    observer.on_build_failed(&id, &e);
                    report.failed.push((id, e));
                }
            }
        }

        report
    }
}

impl ArtifactStore<GaussianHmm> for ModelBank {
    fn get(&self, id: &str) -> Option<&GaussianHmm> {
        self.models.get(id)
    }

    fn ids(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }
}
