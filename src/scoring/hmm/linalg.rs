//! Cholesky factorisation for full-covariance Gaussians

/// Lower-triangular factor `L` of a symmetric positive-definite matrix `A = L Lᵀ`
#[derive(Debug, Clone)]
pub(crate) struct Cholesky {
    lower: Vec<f64>,
    n: usize,
    log_det: f64,
}

impl Cholesky {
    /// Factor a row-major `n x n` matrix, or `None` if it is not positive definite
    pub(crate) fn new(matrix: &[f64], n: usize) -> Option<Self> {
        debug_assert_eq!(matrix.len(), n * n);
        let mut lower = vec![0.0f64; n * n];

        for j in 0..n {
            let mut diag = matrix[j * n + j];
            for k in 0..j {
                diag -= lower[j * n + k] * lower[j * n + k];
            }
            if !(diag > 0.0) || !diag.is_finite() {
                return None;
            }
            let ljj = diag.sqrt();
            lower[j * n + j] = ljj;

            for i in (j + 1)..n {
                let mut sum = matrix[i * n + j];
                for k in 0..j {
                    sum -= lower[i * n + k] * lower[j * n + k];
                }
                lower[i * n + j] = sum / ljj;
            }
        }

        let log_det = 2.0 * (0..n).map(|j| lower[j * n + j].ln()).sum::<f64>();
        Some(Self { lower, n, log_det })
    }

    /// `ln |A|`
    pub(crate) fn log_det(&self) -> f64 {
        self.log_det
    }

    /// Squared Mahalanobis norm `dᵀ A⁻¹ d`
    pub(crate) fn mahalanobis(&self, diff: &[f64]) -> f64 {
        let n = self.n;
        let mut y = vec![0.0f64; n];
        let mut total = 0.0;
        for i in 0..n {
            let mut sum = diff[i];
            for k in 0..i {
                sum -= self.lower[i * n + k] * y[k];
            }
            y[i] = sum / self.lower[i * n + i];
            total += y[i] * y[i];
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let mut m = vec![0.0; 9];
        m[0] = 1.0;
        m[4] = 1.0;
        m[8] = 1.0;
        let chol = Cholesky::new(&m, 3).unwrap();
        assert!(chol.log_det().abs() < 1e-12);
        assert!((chol.mahalanobis(&[1.0, 2.0, 2.0]) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_known_2x2() {
        // A = [[4, 2], [2, 3]], det = 8, A^-1 = [[3, -2], [-2, 4]] / 8
        let chol = Cholesky::new(&[4.0, 2.0, 2.0, 3.0], 2).unwrap();
        assert!((chol.log_det() - 8.0f64.ln()).abs() < 1e-12);
        // d = [1, 1]: (3 - 2 - 2 + 4) / 8 = 3/8
        assert!((chol.mahalanobis(&[1.0, 1.0]) - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_indefinite() {
        assert!(Cholesky::new(&[1.0, 2.0, 2.0, 1.0], 2).is_none());
        assert!(Cholesky::new(&[0.0], 1).is_none());
    }
}
