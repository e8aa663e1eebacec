//! k-means initialisation of HMM state means
//!
//! k-means++ seeding (sampling proportional to squared distance from the
//! nearest chosen centre) followed by Lloyd iterations.

use rand::Rng;

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: &[f64], centers: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, center) in centers.iter().enumerate() {
        let dist = squared_distance(point, center);
        if dist < best_dist {
            best_dist = dist;
            best = c;
        }
    }
    best
}

/// Cluster `data` into `k` centres
///
/// `data` must contain at least `k` points; callers check this up front.
pub(crate) fn kmeans<R: Rng>(
    data: &[Vec<f64>],
    k: usize,
    max_iter: usize,
    rng: &mut R,
) -> Vec<Vec<f64>> {
    debug_assert!(data.len() >= k && k > 0);
    let n = data.len();

    let mut centers: Vec<Vec<f64>> = Vec::with_capacity(k);
    centers.push(data[rng.gen_range(0..n)].clone());

    let mut distances: Vec<f64> = data
        .iter()
        .map(|x| squared_distance(x, &centers[0]))
        .collect();

    while centers.len() < k {
        let total: f64 = distances.iter().sum();
        let idx = if total > 0.0 {
            let mut r = rng.gen::<f64>() * total;
            let mut chosen = None;
            for (j, &dist) in distances.iter().enumerate() {
                if dist <= 0.0 {
                    continue;
                }
                chosen = Some(j);
                r -= dist;
                if r <= 0.0 {
                    break;
                }
            }
            chosen.unwrap_or(0)
        } else {
            // every point already coincides with a centre
            rng.gen_range(0..n)
        };

        centers.push(data[idx].clone());
        let newest = centers.len() - 1;
        for (j, x) in data.iter().enumerate() {
            distances[j] = distances[j].min(squared_distance(x, &centers[newest]));
        }
    }

    let dim = data[0].len();
    let mut assignments = vec![usize::MAX; n];
    for iteration in 0..max_iter {
        let mut changed = false;
        for (j, x) in data.iter().enumerate() {
            let c = nearest(x, &centers);
            if assignments[j] != c {
                assignments[j] = c;
                changed = true;
            }
        }
        if !changed {
            log::debug!("k-means converged after {} iterations", iteration);
            break;
        }

        let mut sums = vec![vec![0.0f64; dim]; k];
        let mut counts = vec![0usize; k];
        for (x, &c) in data.iter().zip(&assignments) {
            counts[c] += 1;
            for (s, v) in sums[c].iter_mut().zip(x) {
                *s += v;
            }
        }
        for c in 0..k {
            // empty clusters keep their previous centre
            if counts[c] > 0 {
                for (center, s) in centers[c].iter_mut().zip(&sums[c]) {
                    *center = s / counts[c] as f64;
                }
            }
        }
    }

    centers
}
