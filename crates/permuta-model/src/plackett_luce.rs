//! Plackett-Luce distribution over permutations.
//!
//! A permutation is drawn by repeatedly picking one of the remaining items with probability
//! proportional to its strength `expw[i] = exp(w[i])`:
//!
//! ```text
//! P(x) = prod_i expw[x_i] / (expw[x_i] + expw[x_{i+1}] + ... + expw[x_{n-1}])
//! ```
//!
//! # Sampling
//!
//! Two samplers produce the same distribution:
//!
//! - [`PlackettLuceSampler::Roulette`] keeps a set of remaining items and spins a roulette
//!   wheel over their strengths at each step (`O(n)` per step, `O(n²)` total).
//! - [`PlackettLuceSampler::Gumbel`] perturbs each log-weight with an independent standard
//!   Gumbel variable and sorts by the perturbed key (`O(n log n)`).
//!
//! # Gradient
//!
//! The gradient of `ln P(x)` with respect to `w[x_k]` is
//!
//! ```text
//! 1 - expw[x_k] * sum_{i <= k} 1 / S_i,    S_i = expw[x_i] + ... + expw[x_{n-1}]
//! ```
//!
//! which one forward pass computes by peeling items off `S` and accumulating `1 / S_i`.

use rand::Rng;
use rand_distr::{Distribution as _, Gumbel};

use crate::{
    NumericalError, Permutation, RankingModel,
    weights::{LogWeights, Shift},
};

/// Which algorithm [`PlackettLuce`] uses to draw permutations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PlackettLuceSampler {
    /// Sequential roulette-wheel selection without replacement.
    #[default]
    Roulette,
    /// Gumbel-max keys sorted in descending order.
    Gumbel,
}

/// Plackett-Luce model over permutations of `n` items.
#[derive(Debug, Clone)]
pub struct PlackettLuce {
    weights: LogWeights,
    sampler: PlackettLuceSampler,
}

impl PlackettLuce {
    /// Creates the uniform model over `n` items.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            weights: LogWeights::uniform(n),
            sampler: PlackettLuceSampler::default(),
        }
    }

    /// Creates a model whose strengths `expw` are exactly `strengths`.
    ///
    /// This is how MM-estimated strengths (which are not log-weights) become a model.
    #[must_use]
    pub fn from_strengths(strengths: &[f64]) -> Self {
        Self {
            weights: LogWeights::from_strengths(strengths),
            sampler: PlackettLuceSampler::default(),
        }
    }

    /// Selects the sampling algorithm used by [`RankingModel::sample`].
    #[must_use]
    pub fn with_sampler(mut self, sampler: PlackettLuceSampler) -> Self {
        self.sampler = sampler;
        self
    }

    #[must_use]
    pub fn sampler(&self) -> PlackettLuceSampler {
        self.sampler
    }

    /// Roulette-wheel sampling without replacement.
    ///
    /// The wheel total is summed afresh over the remaining items at every draw, so items far
    /// below the ones already taken keep their relative odds. The last remaining candidate is
    /// chosen when floating-point rounding lets the draw fall past the end of the wheel.
    pub fn sample_roulette<R>(&self, rng: &mut R) -> Permutation
    where
        R: Rng + ?Sized,
    {
        let expw = self.weights.exp_weights();
        let n = expw.len();
        let mut remaining = (0..n).collect::<Vec<_>>();
        let mut x = Vec::with_capacity(n);
        for _ in 0..n {
            let total = remaining.iter().map(|&item| expw[item]).sum::<f64>();
            let r = rng.random::<f64>() * total;
            let mut acc = 0.0;
            let k = remaining
                .iter()
                .position(|&item| {
                    acc += expw[item];
                    r < acc
                })
                .unwrap_or(remaining.len() - 1);
            let item = remaining.swap_remove(k);
            x.push(item);
        }
        Permutation::from_vec_unchecked(x)
    }

    /// Gumbel-max sampling: `key_i = w_i + G_i` with `G_i ~ Gumbel(0, 1)`, items sorted by
    /// descending key.
    ///
    /// Equal keys keep index order, so a given generator state always yields the same
    /// permutation.
    pub fn sample_fast<R>(&self, rng: &mut R) -> Permutation
    where
        R: Rng + ?Sized,
    {
        let gumbel = Gumbel::new(0.0, 1.0).expect("standard Gumbel parameters are valid");
        let keys = self
            .weights
            .log_weights()
            .iter()
            .map(|w| w + gumbel.sample(rng))
            .collect::<Vec<f64>>();
        let mut items = (0..keys.len()).collect::<Vec<_>>();
        items.sort_by(|&a, &b| keys[b].total_cmp(&keys[a]));
        Permutation::from_vec_unchecked(items)
    }

    /// Exact probability of `x`.
    #[must_use]
    pub fn prob(&self, x: &Permutation) -> f64 {
        self.log_prob(x).exp()
    }

    /// Exact log-probability of `x`.
    ///
    /// # Panics
    ///
    /// Panics if `x` has a different size than the model.
    #[must_use]
    pub fn log_prob(&self, x: &Permutation) -> f64 {
        assert_eq!(x.len(), self.len(), "permutation size mismatch");
        let expw = self.weights.exp_weights();
        let mut tail = 0.0;
        let mut log_prob = 0.0;
        // walk backwards so every S_i is a sum, never a difference
        for &item in x.as_slice().iter().rev() {
            tail += expw[item];
            log_prob += (expw[item] / tail).ln();
        }
        log_prob
    }
}

impl RankingModel for PlackettLuce {
    const NAME: &'static str = "plackett-luce";

    fn weights(&self) -> &LogWeights {
        &self.weights
    }

    fn log_weights_mut(&mut self) -> &mut [f64] {
        self.weights.log_weights_mut()
    }

    fn update_derived_state(&mut self) {
        self.weights.refresh(Shift::Max);
    }

    fn sample<R>(&self, rng: &mut R) -> Permutation
    where
        R: Rng + ?Sized,
    {
        match self.sampler {
            PlackettLuceSampler::Roulette => self.sample_roulette(rng),
            PlackettLuceSampler::Gumbel => self.sample_fast(rng),
        }
    }

    fn grad_log_prob(&self, x: &Permutation, grad: &mut [f64]) -> Result<(), NumericalError> {
        assert_eq!(x.len(), self.len(), "permutation size mismatch");
        assert_eq!(grad.len(), self.len(), "gradient size mismatch");
        let expw = self.weights.exp_weights();
        let x = x.as_slice();
        let Some(&first) = x.first() else {
            return Ok(());
        };

        let mut s_in = self.weights.exp_sum();
        let mut s_out = 1.0 / s_in;
        grad[first] = 1.0 - expw[first] * s_out;
        if !(s_in.is_finite() && s_out.is_finite() && grad[first].is_finite()) {
            return Err(NumericalError::Gradient { position: 0 });
        }
        for position in 1..x.len() {
            s_in -= expw[x[position - 1]];
            s_out += 1.0 / s_in;
            let item = x[position];
            grad[item] = 1.0 - expw[item] * s_out;
            if !(s_in.is_finite() && s_out.is_finite() && grad[item].is_finite()) {
                return Err(NumericalError::Gradient { position });
            }
        }
        Ok(())
    }

    fn set_uniform(&mut self) {
        self.weights.set_uniform();
    }

    fn set_degenerate(&mut self, order: &Permutation) {
        self.weights.set_degenerate(order);
    }
}
