//! Empirical Fisher information and the natural-gradient direction.
//!
//! For a batch of `lambda` log-probability gradients `g_i`,
//!
//! ```text
//! F = (1 / lambda) * sum_i g_i g_iᵀ
//! direction = F⁻¹ (delta / lambda),    delta = sum_i u_i g_i
//! ```
//!
//! Both ranking models are invariant to a common shift of all weights, so every `g_i` is
//! orthogonal to the all-ones vector in exact arithmetic and `F` is singular in theory. In
//! floating point the LU factorisation usually still succeeds; a failed or non-finite
//! inverse is reported as a [`NumericalError`] and answered with a restart.

use nalgebra::{DMatrix, DVector};
use permuta_model::NumericalError;

/// Accumulates `sum_i g_i g_iᵀ` over one batch.
#[derive(Debug, Clone)]
pub struct FisherAccumulator {
    outer_sum: DMatrix<f64>,
    count: usize,
}

impl FisherAccumulator {
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            outer_sum: DMatrix::zeros(n, n),
            count: 0,
        }
    }

    /// Clears the batch.
    pub fn reset(&mut self) {
        self.outer_sum.fill(0.0);
        self.count = 0;
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Adds `g gᵀ`.
    ///
    /// # Panics
    ///
    /// Panics if `grad` does not have `n` entries.
    pub fn add(&mut self, grad: &[f64]) {
        assert_eq!(grad.len(), self.outer_sum.nrows(), "gradient size mismatch");
        let g = DVector::from_column_slice(grad);
        self.outer_sum.ger(1.0, &g, &g, 1.0);
        self.count += 1;
    }

    /// `F = outer_sum / lambda`.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn fisher(&self, lambda: usize) -> DMatrix<f64> {
        &self.outer_sum / lambda as f64
    }

    /// Writes `F⁻¹ (delta / lambda)` into `direction`.
    ///
    /// # Panics
    ///
    /// Panics if `delta` or `direction` does not have `n` entries, or if `lambda` is zero.
    #[expect(clippy::cast_precision_loss)]
    pub fn natural_direction(
        &self,
        delta: &[f64],
        lambda: usize,
        direction: &mut [f64],
    ) -> Result<(), NumericalError> {
        let n = self.outer_sum.nrows();
        assert_eq!(delta.len(), n, "delta size mismatch");
        assert_eq!(direction.len(), n, "direction size mismatch");
        assert!(lambda > 0, "batch size must be positive");

        let inverse = self
            .fisher(lambda)
            .try_inverse()
            .ok_or(NumericalError::SingularFisher)?;
        if inverse.iter().any(|v| !v.is_finite()) {
            return Err(NumericalError::NonFiniteInverse);
        }
        let scaled = DVector::from_column_slice(delta) / lambda as f64;
        let result = inverse * scaled;
        direction.copy_from_slice(result.as_slice());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fisher_is_mean_outer_product() {
        let mut acc = FisherAccumulator::new(2);
        acc.add(&[1.0, 0.0]);
        acc.add(&[1.0, 2.0]);
        assert_eq!(acc.count(), 2);
        let f = acc.fisher(2);
        assert_eq!(f[(0, 0)], 1.0);
        assert_eq!(f[(0, 1)], 1.0);
        assert_eq!(f[(1, 0)], 1.0);
        assert_eq!(f[(1, 1)], 2.0);
    }

    #[test]
    fn test_natural_direction_solves_fisher_system() {
        let mut acc = FisherAccumulator::new(2);
        acc.add(&[1.0, 0.0]);
        acc.add(&[1.0, 2.0]);
        // F = [[1, 1], [1, 2]], F⁻¹ = [[2, -1], [-1, 1]]
        let mut direction = [0.0; 2];
        acc.natural_direction(&[2.0, 4.0], 2, &mut direction)
            .unwrap();
        // delta / lambda = [1, 2]
        assert!((direction[0] - 0.0).abs() < 1e-12);
        assert!((direction[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_batch_is_singular() {
        let acc = FisherAccumulator::new(3);
        let mut direction = [0.0; 3];
        assert_eq!(
            acc.natural_direction(&[0.0; 3], 1, &mut direction),
            Err(NumericalError::SingularFisher)
        );
    }

    #[test]
    fn test_non_finite_gradient_is_reported() {
        let mut acc = FisherAccumulator::new(2);
        acc.add(&[f64::INFINITY, 1.0]);
        acc.add(&[0.0, 1.0]);
        let mut direction = [0.0; 2];
        assert!(acc.natural_direction(&[1.0, 1.0], 2, &mut direction).is_err());
    }

    #[test]
    fn test_reset_clears_batch() {
        let mut acc = FisherAccumulator::new(2);
        acc.add(&[1.0, 1.0]);
        acc.reset();
        assert_eq!(acc.count(), 0);
        assert_eq!(acc.fisher(1), DMatrix::zeros(2, 2));
    }
}
