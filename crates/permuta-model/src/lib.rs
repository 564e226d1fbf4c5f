//! Probabilistic ranking models over permutations.
//!
//! This crate holds the parametric distributions that the search algorithms in
//! `permuta-search` refine generation after generation:
//!
//! - [`PlackettLuce`] - sequential weighted selection without replacement. Exact sampling
//!   (roulette wheel, `O(n²)`, or Gumbel keys, `O(n log n)`) and an `O(n)` closed-form
//!   log-probability gradient.
//! - [`BradleyTerry`] - pairwise preferences `P[i][j] = expw[j] / (expw[i] + expw[j])`.
//!   Approximate insertion sampling and three gradient formulations (pairwise closed form,
//!   the `O(n)` form used by the search loop, and an enumeration-based finite-difference
//!   oracle for tiny `n`).
//! - [`estimator::MmEstimator`] - maximum-likelihood Plackett-Luce strengths from a set of
//!   observed orderings via Hunter's Minorize-Maximize iteration.
//!
//! Both models share the [`RankingModel`] contract and store their parameters in a
//! [`LogWeights`] vector: one real log-weight per item plus the derived `exp` values. The
//! derived state is refreshed explicitly with [`RankingModel::update_derived_state`].
//!
//! # Numeric type
//!
//! All model quantities are `f64`. The degenerate ladder needs `exp(±10)`, and after the
//! softmax shift every `exp(w)` is at most 1, which keeps the whole core far from the `f64`
//! overflow boundary. Non-finite intermediates are reported as [`NumericalError`] instead of
//! being propagated silently.
//!
//! # Randomness
//!
//! Every sampling call takes an explicit generator (`&mut R where R: rand::Rng`). There is no
//! global random state, so a fixed seed reproduces a run exactly.
//!
//! # Example
//!
//! ```
//! use permuta_model::{PlackettLuce, RankingModel as _};
//! use rand::SeedableRng as _;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//! let model = PlackettLuce::new(5);
//! let x = model.sample(&mut rng);
//! assert_eq!(x.len(), 5);
//!
//! let mut grad = vec![0.0; 5];
//! model.grad_log_prob(&x, &mut grad).unwrap();
//! ```

use rand::Rng;

pub use self::{
    bradley_terry::BradleyTerry,
    permutation::{InvalidPermutationError, Permutation},
    plackett_luce::{PlackettLuce, PlackettLuceSampler},
    weights::LogWeights,
};

pub mod bradley_terry;
pub mod estimator;
pub mod permutation;
pub mod plackett_luce;
pub mod weights;

/// A non-finite value showed up where the search needs a finite one.
///
/// These are expected events in long runs; the search loop answers them with a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum NumericalError {
    #[display("non-finite log-probability gradient at rank position {position}")]
    Gradient { position: usize },
    #[display("Fisher information matrix is singular")]
    SingularFisher,
    #[display("inverse Fisher information matrix has a non-finite entry")]
    NonFiniteInverse,
    #[display("model entropy is not finite after the update")]
    NonFiniteEntropy,
}

/// A parametric distribution over permutations of `n` items.
///
/// Implementations keep their log-weights in a [`LogWeights`]; mutating them through
/// [`log_weights_mut`](Self::log_weights_mut) leaves the derived state stale until
/// [`update_derived_state`](Self::update_derived_state) is called.
pub trait RankingModel {
    /// Short tag identifying the model family in logs.
    const NAME: &'static str;

    /// Shared parameter storage.
    fn weights(&self) -> &LogWeights;

    /// Mutable log-weights `w`. Call [`update_derived_state`](Self::update_derived_state)
    /// afterwards.
    fn log_weights_mut(&mut self) -> &mut [f64];

    /// Recomputes everything derived from `w`.
    fn update_derived_state(&mut self);

    /// Draws one permutation.
    fn sample<R>(&self, rng: &mut R) -> Permutation
    where
        R: Rng + ?Sized;

    /// Writes the gradient of `ln P(x)` with respect to `w` into `grad`.
    ///
    /// Fails when any intermediate quantity is not finite.
    fn grad_log_prob(&self, x: &Permutation, grad: &mut [f64]) -> Result<(), NumericalError>;

    /// Resets to the uniform parameterisation.
    fn set_uniform(&mut self);

    /// Concentrates the distribution on `order` (weights `+10` down to `-10`).
    fn set_degenerate(&mut self, order: &Permutation);

    /// Number of items.
    fn len(&self) -> usize {
        self.weights().len()
    }

    /// Whether the model has no items.
    fn is_empty(&self) -> bool {
        self.weights().is_empty()
    }

    /// Items sorted by descending weight, ties broken by index.
    fn mode(&self) -> Permutation {
        self.weights().mode()
    }

    /// Entropy of the categorical distribution `expw / sexpw` over items.
    fn entropy(&self) -> f64 {
        self.weights().entropy()
    }

    /// `max(expw) / sexpw`.
    fn max_prob(&self) -> f64 {
        self.weights().max_prob()
    }
}
