//! Maximum-likelihood Plackett-Luce strengths from observed orderings.
//!
//! [`MmEstimator`] runs Hunter's Minorize-Maximize iteration. With `wins[a]` the number of
//! rankings in which `a` is not last and `S_{r,i}` the strength left in ranking `r` from
//! position `i` on, every step sets
//!
//! ```text
//! gamma'[a] = wins[a] / sum_r sum_{i <= pos_r(a), i < n-1} 1 / S_{r,i}
//! ```
//!
//! until the Euclidean norm of `gamma' - gamma` drops below the threshold or the iteration cap
//! is reached. The result is normalised to sum to one and is meant to be used directly as
//! `expw` (see [`PlackettLuce::from_strengths`]).
//!
//! When every ranking agrees on one order no finite maximum exists: the strengths keep
//! drifting apart, the iteration runs to the cap, and the induced mode is still that order.

use crate::{Permutation, PlackettLuce, weights};

pub const DEFAULT_MAX_ITERATIONS: usize = 5000;
pub const DEFAULT_THRESHOLD: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmEstimator {
    pub max_iterations: usize,
    pub threshold: f64,
}

impl Default for MmEstimator {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Result of [`MmEstimator::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct MmFit {
    /// Strengths normalised to sum to one.
    pub strengths: Vec<f64>,
    pub iterations: usize,
    /// Whether the change norm fell below the threshold before the iteration cap.
    pub converged: bool,
}

impl MmFit {
    #[must_use]
    pub fn into_model(self) -> PlackettLuce {
        PlackettLuce::from_strengths(&self.strengths)
    }
}

impl MmEstimator {
    /// Fits strengths for `n` items to `rankings`.
    ///
    /// Suffix sums that are not positive and finite contribute nothing, and an item whose
    /// normaliser is zero keeps its previous strength. An all-zero result becomes uniform.
    ///
    /// # Panics
    ///
    /// Panics if a ranking does not have `n` items.
    pub fn fit<'a, I>(&self, n: usize, rankings: I) -> MmFit
    where
        I: IntoIterator<Item = &'a Permutation>,
    {
        let rankings = rankings.into_iter().collect::<Vec<_>>();
        let mut wins = vec![0.0_f64; n];
        for x in &rankings {
            assert_eq!(x.len(), n, "ranking size mismatch");
            if let Some((_, init)) = x.as_slice().split_last() {
                for &item in init {
                    wins[item] += 1.0;
                }
            }
        }

        let mut gamma = vec![1.0_f64; n];
        let mut next = vec![0.0_f64; n];
        let mut normalizer = vec![0.0_f64; n];
        let mut suffix = vec![0.0_f64; n];
        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.max_iterations {
            iterations += 1;
            normalizer.fill(0.0);
            for x in &rankings {
                let x = x.as_slice();
                let mut tail = 0.0_f64;
                for (s, &item) in suffix.iter_mut().zip(x).rev() {
                    tail += gamma[item];
                    *s = tail;
                }
                let mut acc = 0.0_f64;
                for (i, &item) in x.iter().enumerate() {
                    let s = suffix[i];
                    if i + 1 < n && s > 0.0 && s.is_finite() {
                        acc += 1.0 / s;
                    }
                    normalizer[item] += acc;
                }
            }
            for ((next, &w), (&sr, &g)) in next
                .iter_mut()
                .zip(&wins)
                .zip(normalizer.iter().zip(&gamma))
            {
                *next = if sr > 0.0 { w / sr } else { g };
            }
            let delta = gamma
                .iter()
                .zip(&next)
                .map(|(g, ng)| (ng - g) * (ng - g))
                .sum::<f64>()
                .sqrt();
            gamma.copy_from_slice(&next);
            if delta < self.threshold {
                converged = true;
                break;
            }
        }

        if !weights::normalize_l1(&mut gamma) {
            #[expect(clippy::cast_precision_loss)]
            gamma.fill(1.0 / n as f64);
        }
        if !converged {
            tracing::debug!(iterations, "MM iteration reached its cap before converging");
        }
        MmFit {
            strengths: gamma,
            iterations,
            converged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RankingModel as _;

    fn perm(items: &[usize]) -> Permutation {
        Permutation::new(items.to_vec()).unwrap()
    }

    #[test]
    fn test_identical_rankings_recover_their_order() {
        let order = perm(&[2, 0, 3, 1]);
        let rankings = vec![order.clone(); 6];
        let fit = MmEstimator::default().fit(4, &rankings);
        assert!((fit.strengths.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(fit.strengths.iter().all(|s| s.is_finite()));
        assert_eq!(fit.into_model().mode(), order);
    }

    #[test]
    fn test_cyclic_rankings_converge_to_uniform() {
        let rankings = [perm(&[0, 1, 2]), perm(&[1, 2, 0]), perm(&[2, 0, 1])];
        let fit = MmEstimator::default().fit(3, &rankings);
        assert!(fit.converged);
        assert!(fit.iterations < DEFAULT_MAX_ITERATIONS);
        for s in &fit.strengths {
            assert!((s - 1.0 / 3.0).abs() < 1e-6, "strengths = {:?}", fit.strengths);
        }
    }

    #[test]
    fn test_majority_order_wins() {
        let rankings = [
            perm(&[0, 1, 2]),
            perm(&[0, 1, 2]),
            perm(&[0, 2, 1]),
            perm(&[1, 0, 2]),
            perm(&[2, 1, 0]),
        ];
        let fit = MmEstimator::default().fit(3, &rankings);
        assert!(fit.converged);
        assert_eq!(fit.into_model().mode(), perm(&[0, 1, 2]));
    }

    #[test]
    fn test_iteration_cap_is_respected() {
        let rankings = vec![perm(&[0, 1, 2]); 3];
        let estimator = MmEstimator {
            max_iterations: 7,
            threshold: 0.0,
        };
        let fit = estimator.fit(3, &rankings);
        assert_eq!(fit.iterations, 7);
        assert!(!fit.converged);
    }

    #[test]
    fn test_no_rankings_gives_uniform() {
        let rankings: Vec<Permutation> = Vec::new();
        let fit = MmEstimator::default().fit(4, &rankings);
        assert!(fit.converged);
        assert_eq!(fit.strengths, vec![0.25; 4]);
    }

    #[test]
    fn test_single_item() {
        let rankings = [perm(&[0])];
        let fit = MmEstimator::default().fit(1, &rankings);
        assert_eq!(fit.strengths, vec![1.0]);
    }
}
