//! Self-adaptation of the step size and the batch size.

use permuta_model::weights;

/// Cumulative step-size control for `alpha`.
///
/// With `r = 1/sqrt(n)`, every non-restart generation does
///
/// ```text
/// p     <- (1 - r) p + delta / |delta|
/// alpha <- alpha * exp(|p| / sqrt(1 / (2r - r²)) - 1)
/// ```
///
/// and clamps `alpha` to `[lower, upper]`. The denominator is the stationary norm of `p`
/// under uncorrelated unit steps, so sustained progress in one direction grows `alpha` and
/// oscillation shrinks it.
#[derive(Debug, Clone)]
pub struct StepSizeController {
    initial: f64,
    lower: f64,
    upper: f64,
    decay: f64,
    expected_norm: f64,
    path: Vec<f64>,
}

impl StepSizeController {
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn new(n: usize, initial: f64, lower: f64, upper: f64) -> Self {
        let decay = 1.0 / (n.max(1) as f64).sqrt();
        let expected_norm = (1.0 / (2.0 * decay - decay * decay)).sqrt();
        Self {
            initial,
            lower,
            upper,
            decay,
            expected_norm,
            path: vec![0.0; n],
        }
    }

    /// The cumulation vector `p`.
    #[must_use]
    pub fn path(&self) -> &[f64] {
        &self.path
    }

    /// Returns the step size for the next generation.
    ///
    /// After a restart the path is zeroed and the initial step size comes back. A zero or
    /// non-finite `delta` leaves both the path and `alpha` unchanged.
    pub fn update(&mut self, alpha: f64, delta: &[f64], restart: bool) -> f64 {
        if restart {
            self.path.fill(0.0);
            return self.initial;
        }
        let norm = weights::norm2(delta);
        if norm == 0.0 || !norm.is_finite() {
            return alpha;
        }
        for (p, d) in self.path.iter_mut().zip(delta) {
            *p = (1.0 - self.decay) * *p + d / norm;
        }
        let ratio = weights::norm2(&self.path) / self.expected_norm;
        (alpha * (ratio - 1.0).exp()).clamp(self.lower, self.upper)
    }
}

/// Entropy-driven batch size.
///
/// A spread-out model gets a large batch and a concentrated one a small batch:
/// `lower + (upper - lower) * H / ln(n)`, truncated.
#[derive(Debug, Clone, Copy)]
pub struct PopulationSizeController {
    pub initial: usize,
    pub lower: usize,
    pub upper: usize,
}

impl PopulationSizeController {
    /// Returns the batch size for the next generation.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn update(&self, entropy: f64, n: usize, restart: bool) -> usize {
        if restart {
            return self.initial;
        }
        if n < 2 || !entropy.is_finite() {
            return self.lower;
        }
        let span = (self.upper - self.lower) as f64;
        let lambda = self.lower as f64 + span * entropy / (n as f64).ln();
        (lambda as usize).clamp(self.lower, self.upper)
    }
}
