//! Alignment-distance scorer
//!
//! Classic Dynamic Time Warping between two chroma sequences with an L1
//! frame distance and no constraint band. The recursion
//!
//! D(i, j) = |a_i - b_j|₁ + min(D(i-1, j), D(i, j-1), D(i-1, j-1))
//!
//! yields the cumulative cost of the cheapest monotonic alignment; lower is
//! better. Cost is O(n·m) time. [`dtw_distance`] keeps two rows, while
//! [`dtw_align`] keeps the full matrix to recover the warping path.

use serde::{Deserialize, Serialize};

use super::{ScoreOrder, Scorer};
use crate::chroma::ChromaSequence;
use crate::error::MatchError;

/// DTW result with the optimal warping path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    /// Cumulative L1 cost of the path
    pub distance: f64,

    /// Matched `(query frame, candidate frame)` pairs from `(0, 0)` to the end
    pub path: Vec<(usize, usize)>,
}

fn l1(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (*x as f64 - *y as f64).abs())
        .sum()
}

/// Cumulative DTW distance between `a` and `b`
///
/// # Errors
///
/// `MatchError::DimensionMismatch` if the sequences have different feature
/// counts, `MatchError::InvalidInput` if their hop lengths disagree.
pub fn dtw_distance(a: &ChromaSequence, b: &ChromaSequence) -> Result<f64, MatchError> {
    a.ensure_comparable(b)?;

    let m = b.n_frames();
    let mut previous = vec![f64::INFINITY; m + 1];
    let mut current = vec![f64::INFINITY; m + 1];
    previous[0] = 0.0;

    for x in a.frames() {
        current[0] = f64::INFINITY;
        for (j, y) in b.frames().iter().enumerate() {
            let best = previous[j].min(previous[j + 1]).min(current[j]);
            current[j + 1] = l1(x, y) + best;
        }
        std::mem::swap(&mut previous, &mut current);
    }

    Ok(previous[m])
}

/// DTW distance between `a` and `b` together with the warping path
pub fn dtw_align(a: &ChromaSequence, b: &ChromaSequence) -> Result<Alignment, MatchError> {
    a.ensure_comparable(b)?;

    let n = a.n_frames();
    let m = b.n_frames();
    let width = m + 1;
    let mut acc = vec![f64::INFINITY; (n + 1) * width];
    acc[0] = 0.0;

    for i in 1..=n {
        for j in 1..=m {
            let best = acc[(i - 1) * width + j - 1]
                .min(acc[(i - 1) * width + j])
                .min(acc[i * width + j - 1]);
            acc[i * width + j] = l1(a.frame(i - 1), b.frame(j - 1)) + best;
        }
    }

    let mut path = vec![(n - 1, m - 1)];
    let (mut i, mut j) = (n, m);
    while i > 1 || j > 1 {
        let diagonal = acc[(i - 1) * width + j - 1];
        let up = acc[(i - 1) * width + j];
        let left = acc[i * width + j - 1];
        // ties prefer the diagonal step
        if diagonal <= up && diagonal <= left {
            i -= 1;
            j -= 1;
        } else if up <= left {
            i -= 1;
        } else {
            j -= 1;
        }
        path.push((i - 1, j - 1));
    }
    path.reverse();

    Ok(Alignment {
        distance: acc[n * width + m],
        path,
    })
}

/// L1 DTW scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignmentScorer;

impl AlignmentScorer {
    /// Create a new alignment scorer
    pub fn new() -> Self {
        Self
    }
}

impl Scorer for AlignmentScorer {
    type Artifact = ChromaSequence;

    fn order(&self) -> ScoreOrder {
        ScoreOrder::LowerIsBetter
    }

    fn name(&self) -> &'static str {
        "dtw-l1"
    }

    fn score(&self, candidate: &ChromaSequence, query: &ChromaSequence) -> Result<f64, MatchError> {
        dtw_distance(query, candidate)
    }
}
