//! Bradley-Terry pairwise-preference model over permutations.
//!
//! Item `j` beats item `i` with probability
//!
//! ```text
//! P[i][j] = expw[j] / (expw[i] + expw[j]),    P[i][i] = 0,    P[j][i] = 1 - P[i][j]
//! ```
//!
//! and a permutation is scored by the product of its `n(n-1)/2` pairwise outcomes. The model
//! caches the full matrix `P` and the row sums `Q[i] = sum_j P[i][j]`; both are rebuilt by
//! [`RankingModel::update_derived_state`].
//!
//! # Sampling
//!
//! There is no cheap exact sampler. [`BradleyTerry`] builds a permutation by insertion: each
//! new item starts at a random slot of the partial permutation and walks left or right one
//! slot at a time, moving left past the neighbour `s` with probability `P[s][new]`. The walk
//! stops after `max_iterations` steps or when it steps past the right end. The result is an
//! approximation of the Bradley-Terry distribution, not an exact draw.
//!
//! # Gradients
//!
//! - [`BradleyTerry::grad_log_prob_pairwise`]: the closed form over all pairs (`O(n²)`).
//! - [`RankingModel::grad_log_prob`]: `1 + Q[x_i] - i` (`O(n)`), equal to the pairwise form
//!   plus one on every component. Both models are invariant to adding a constant to every
//!   weight, so the offset does not change the search.
//! - [`BradleyTerry::grad_log_prob_exhaustive`]: central finite differences of
//!   `ln prob_exponential`, which enumerates all `n!` permutations. Only usable for tiny `n`.

use itertools::Itertools as _;
use rand::Rng;

use crate::{
    NumericalError, Permutation, RankingModel,
    weights::{self, LogWeights, Shift},
};

/// Default cap on insertion-walk steps per item.
pub const DEFAULT_MAX_ITERATIONS: usize = 40;

/// Largest `n` the enumeration-based methods accept.
pub const MAX_ENUMERATION_SIZE: usize = 8;

const FINITE_DIFFERENCE_STEP: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct BradleyTerry {
    weights: LogWeights,
    preference: Vec<Vec<f64>>,
    row_sums: Vec<f64>,
    max_iterations: usize,
}

impl BradleyTerry {
    /// Creates the uniform model over `n` items.
    #[must_use]
    pub fn new(n: usize) -> Self {
        let mut this = Self {
            weights: LogWeights::uniform(n),
            preference: vec![vec![0.0; n]; n],
            row_sums: vec![0.0; n],
            max_iterations: DEFAULT_MAX_ITERATIONS,
        };
        this.refresh_pairwise();
        this
    }

    /// Sets the insertion-walk step cap used by [`RankingModel::sample`].
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// `P[i][j]`: probability that `j` is preferred over `i`.
    #[must_use]
    pub fn preference(&self, i: usize, j: usize) -> f64 {
        self.preference[i][j]
    }

    /// `Q[i] = sum_j P[i][j]`.
    #[must_use]
    pub fn row_sums(&self) -> &[f64] {
        &self.row_sums
    }

    /// Random initial parameters.
    ///
    /// Draws `lambda ~ U(0, 1)` and, per item, `k ~ U{1..n}`; sets `expw = exp(-lambda * k)`
    /// normalised to sum to one and `w = ln(expw)`.
    pub fn set_random<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let n = self.len();
        if n == 0 {
            return;
        }
        let lambda = rng.random::<f64>();
        let mut strengths = weights::from_fn(
            |_| {
                #[expect(clippy::cast_precision_loss)]
                let k = rng.random_range(1..=n) as f64;
                (-lambda * k).exp()
            },
            n,
        );
        weights::normalize_l1(&mut strengths);
        for (w, s) in self.weights.log_weights_mut().iter_mut().zip(&strengths) {
            *w = s.ln();
        }
        self.weights.refresh(Shift::None);
        self.refresh_pairwise();
    }

    fn refresh_pairwise(&mut self) {
        let expw = self.weights.exp_weights();
        let n = expw.len();
        for i in 0..n {
            self.preference[i][i] = 0.0;
            for j in i + 1..n {
                let p = expw[j] / (expw[i] + expw[j]);
                self.preference[i][j] = p;
                self.preference[j][i] = 1.0 - p;
            }
        }
        for (q, row) in self.row_sums.iter_mut().zip(&self.preference) {
            *q = row.iter().sum();
        }
    }

    /// Insertion-heuristic sampling.
    pub fn sample_insertion<R>(&self, rng: &mut R) -> Permutation
    where
        R: Rng + ?Sized,
    {
        let n = self.len();
        if n == 0 {
            return Permutation::identity(0);
        }
        let mut remaining = (0..n).collect::<Vec<_>>();
        let mut sample = Vec::with_capacity(n);
        sample.push(remaining.remove(rng.random_range(0..n)));

        for sampled in 1..n {
            let r = rng.random_range(0..n - sampled);
            let candidate = remaining[r];
            let mut slot = rng.random_range(0..sampled);
            let mut neighbour = sample[slot];
            let mut iterations = 0;
            let mut stop = false;
            while iterations < self.max_iterations && !stop {
                let p = self.preference[neighbour][candidate];
                if rng.random::<f64>() < p {
                    // moving left stops at the front without ending the walk
                    if slot > 0 {
                        slot -= 1;
                        neighbour = sample[slot];
                    }
                } else {
                    slot += 1;
                    if slot == sampled {
                        stop = true;
                    } else {
                        neighbour = sample[slot];
                    }
                }
                iterations += 1;
            }
            sample.insert(slot, candidate);
            remaining.remove(r);
        }
        Permutation::from_vec_unchecked(sample)
    }

    /// Closed-form gradient of `ln prob_proportional(x)`:
    /// `g[x_i] = sum_{j>i} P[x_i][x_j] - sum_{j<i} P[x_j][x_i]`.
    ///
    /// # Panics
    ///
    /// Panics if `x` or `grad` has a different size than the model.
    pub fn grad_log_prob_pairwise(
        &self,
        x: &Permutation,
        grad: &mut [f64],
    ) -> Result<(), NumericalError> {
        assert_eq!(x.len(), self.len(), "permutation size mismatch");
        assert_eq!(grad.len(), self.len(), "gradient size mismatch");
        let x = x.as_slice();
        for (i, &item) in x.iter().enumerate() {
            let ahead = x[i + 1..]
                .iter()
                .map(|&other| self.preference[item][other])
                .sum::<f64>();
            let behind = x[..i]
                .iter()
                .map(|&other| self.preference[other][item])
                .sum::<f64>();
            grad[item] = ahead - behind;
            if !grad[item].is_finite() {
                return Err(NumericalError::Gradient { position: i });
            }
        }
        Ok(())
    }

    /// Finite-difference gradient of `ln prob_exponential(x)`.
    ///
    /// Each weight is perturbed by `±1e-6` and the normalised probability is recomputed by
    /// enumerating all `n!` permutations.
    ///
    /// # Panics
    ///
    /// Panics if the model has more than [`MAX_ENUMERATION_SIZE`] items, or on a size mismatch.
    pub fn grad_log_prob_exhaustive(
        &self,
        x: &Permutation,
        grad: &mut [f64],
    ) -> Result<(), NumericalError> {
        assert_eq!(x.len(), self.len(), "permutation size mismatch");
        assert_eq!(grad.len(), self.len(), "gradient size mismatch");
        let h = FINITE_DIFFERENCE_STEP;
        let mut probe = self.weights.clone();
        for item in 0..self.len() {
            let w = self.weights.log_weights()[item];
            probe.log_weights_mut()[item] = w + h;
            probe.refresh(Shift::None);
            let plus = prob_exponential_of(probe.exp_weights(), x).ln();
            probe.log_weights_mut()[item] = w - h;
            probe.refresh(Shift::None);
            let minus = prob_exponential_of(probe.exp_weights(), x).ln();
            probe.log_weights_mut()[item] = w;
            grad[item] = (plus - minus) / (2.0 * h);
            if !grad[item].is_finite() {
                let position = x.as_slice().iter().position(|&i| i == item).unwrap_or(0);
                return Err(NumericalError::Gradient { position });
            }
        }
        Ok(())
    }

    /// Unnormalised pairwise score `prod_{i<j} expw[x_i] / (expw[x_i] + expw[x_j])`.
    #[must_use]
    pub fn prob_proportional(&self, x: &Permutation) -> f64 {
        pairwise_product(self.weights.exp_weights(), x.as_slice())
    }

    /// Pairwise score normalised over all `n!` permutations.
    ///
    /// # Panics
    ///
    /// Panics if the model has more than [`MAX_ENUMERATION_SIZE`] items.
    #[must_use]
    pub fn prob_exponential(&self, x: &Permutation) -> f64 {
        prob_exponential_of(self.weights.exp_weights(), x)
    }

    /// Like [`prob_exponential`](Self::prob_exponential) but with the raw weights `w` used as
    /// strengths. Only meaningful when every `w[i] > 0`.
    ///
    /// # Panics
    ///
    /// Panics if the model has more than [`MAX_ENUMERATION_SIZE`] items.
    #[must_use]
    pub fn prob_classical(&self, x: &Permutation) -> f64 {
        prob_exponential_of(self.weights.log_weights(), x)
    }
}

fn pairwise_product(strengths: &[f64], x: &[usize]) -> f64 {
    let mut p = 1.0;
    for (i, &a) in x.iter().enumerate() {
        for &b in &x[i + 1..] {
            p *= strengths[a] / (strengths[a] + strengths[b]);
        }
    }
    p
}

fn prob_exponential_of(strengths: &[f64], x: &Permutation) -> f64 {
    let n = strengths.len();
    assert!(
        n <= MAX_ENUMERATION_SIZE,
        "enumeration over {n}! permutations is not supported"
    );
    let normalization = (0..n)
        .permutations(n)
        .map(|perm| pairwise_product(strengths, &perm))
        .sum::<f64>();
    pairwise_product(strengths, x.as_slice()) / normalization
}

impl RankingModel for BradleyTerry {
    const NAME: &'static str = "bradley-terry";

    fn weights(&self) -> &LogWeights {
        &self.weights
    }

    fn log_weights_mut(&mut self) -> &mut [f64] {
        self.weights.log_weights_mut()
    }

    fn update_derived_state(&mut self) {
        self.weights.refresh(Shift::Max);
        self.refresh_pairwise();
    }

    fn sample<R>(&self, rng: &mut R) -> Permutation
    where
        R: Rng + ?Sized,
    {
        self.sample_insertion(rng)
    }

    /// `g[x_i] = 1 + Q[x_i] - i`.
    fn grad_log_prob(&self, x: &Permutation, grad: &mut [f64]) -> Result<(), NumericalError> {
        assert_eq!(x.len(), self.len(), "permutation size mismatch");
        assert_eq!(grad.len(), self.len(), "gradient size mismatch");
        for (position, &item) in x.as_slice().iter().enumerate() {
            #[expect(clippy::cast_precision_loss)]
            let g = 1.0 + self.row_sums[item] - position as f64;
            if !g.is_finite() {
                return Err(NumericalError::Gradient { position });
            }
            grad[item] = g;
        }
        Ok(())
    }

    fn set_uniform(&mut self) {
        self.weights.set_uniform();
        self.refresh_pairwise();
    }

    fn set_degenerate(&mut self, order: &Permutation) {
        self.weights.set_degenerate(order);
        self.refresh_pairwise();
    }
}
