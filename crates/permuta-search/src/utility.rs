//! Fitness shaping: per-sample weights for the likelihood-ratio gradient.
//!
//! Each generation the raw scores of the `lambda` samples are turned into weights `u_i`, and
//! the ascent direction is `sum_i u_i * grad ln P(x_i)`. The weights of a batch sum to at most
//! one.
//!
//! | Kind | `u_i` |
//! |---|---|
//! | `fitness` | `score_i / upper_bound / lambda` |
//! | `normalizedFitness` | `(score_i / min) / sum_j (score_j / min)` |
//! | `superlinear` | `ln(mu + 0.5) - ln(rank_i + 1)`, normalised, top `mu` only |
//! | `linear` | `mu + 0.5 - (rank_i + 1)`, normalised, top `mu` only |
//! | `equal` | `1 / mu`, top `mu` only |
//!
//! with `mu = max(1, lambda / 2)`. Ranks come from a descending sort of the scores, ties broken
//! by sample index.

use std::cmp::Reverse;

/// The closed set of shaping schemes.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr, derive_more::Display,
)]
pub enum UtilityKind {
    #[display("fitness")]
    Fitness,
    #[display("normalizedFitness")]
    NormalizedFitness,
    #[default]
    #[display("superlinear")]
    Superlinear,
    #[display("linear")]
    Linear,
    #[display("equal")]
    Equal,
}

impl UtilityKind {
    /// Whether weights depend only on the rank of a score.
    #[must_use]
    pub fn is_rank_based(self) -> bool {
        matches!(self, Self::Superlinear | Self::Linear | Self::Equal)
    }
}

/// Utility weights for batches of a fixed size.
#[derive(Debug, Clone)]
pub struct UtilityFunction {
    kind: UtilityKind,
    lambda: usize,
    upper_bound: i64,
    rank_weights: Vec<f64>,
    values: Vec<f64>,
}

impl UtilityFunction {
    /// `upper_bound` is the objective's upper bound, used by [`UtilityKind::Fitness`].
    ///
    /// # Panics
    ///
    /// Panics if `lambda` is zero.
    #[must_use]
    pub fn new(kind: UtilityKind, lambda: usize, upper_bound: i64) -> Self {
        let mut this = Self {
            kind,
            lambda: 0,
            upper_bound,
            rank_weights: vec![],
            values: vec![],
        };
        this.resize(lambda);
        this
    }

    #[must_use]
    pub fn kind(&self) -> UtilityKind {
        self.kind
    }

    #[must_use]
    pub fn lambda(&self) -> usize {
        self.lambda
    }

    /// Number of top-ranked samples that receive weight in the rank-based schemes.
    #[must_use]
    pub fn mu(&self) -> usize {
        (self.lambda / 2).max(1)
    }

    /// Changes the batch size and rebuilds the rank-weight table.
    ///
    /// # Panics
    ///
    /// Panics if `lambda` is zero.
    #[expect(clippy::cast_precision_loss)]
    pub fn resize(&mut self, lambda: usize) {
        assert!(lambda > 0, "batch size must be positive");
        self.lambda = lambda;
        self.values.clear();
        let mu = self.mu();
        let mu_f = mu as f64;
        self.rank_weights = match self.kind {
            UtilityKind::Fitness | UtilityKind::NormalizedFitness => vec![],
            UtilityKind::Superlinear => {
                let log_mu = (mu_f + 0.5).ln();
                (0..mu).map(|k| log_mu - (k as f64 + 1.0).ln()).collect()
            }
            UtilityKind::Linear => (0..mu).map(|k| mu_f + 0.5 - (k as f64 + 1.0)).collect(),
            UtilityKind::Equal => vec![1.0; mu],
        };
        let sum = self.rank_weights.iter().sum::<f64>();
        for w in &mut self.rank_weights {
            *w /= sum;
        }
    }

    /// Computes the weights of a batch. Must be called before [`utility`](Self::utility).
    ///
    /// # Panics
    ///
    /// Panics if `scores.len()` differs from the batch size.
    #[expect(clippy::cast_precision_loss)]
    pub fn prepare(&mut self, scores: &[i64]) {
        assert_eq!(scores.len(), self.lambda, "batch size mismatch");
        let lambda = self.lambda as f64;
        self.values.clear();
        match self.kind {
            UtilityKind::Fitness => {
                let divisor = if self.upper_bound > 0 {
                    self.upper_bound as f64
                } else {
                    1.0
                };
                self.values
                    .extend(scores.iter().map(|&s| s as f64 / divisor / lambda));
            }
            UtilityKind::NormalizedFitness => {
                let min = scores.iter().copied().min().unwrap_or(0);
                let divisor = if min > 0 { min as f64 } else { 1.0 };
                let sum = scores.iter().map(|&s| s as f64 / divisor).sum::<f64>();
                if sum > 0.0 {
                    self.values
                        .extend(scores.iter().map(|&s| (s as f64 / divisor) / sum));
                } else {
                    self.values.resize(scores.len(), 1.0 / lambda);
                }
            }
            UtilityKind::Superlinear | UtilityKind::Linear | UtilityKind::Equal => {
                let mut order = (0..scores.len()).collect::<Vec<_>>();
                order.sort_by_key(|&i| (Reverse(scores[i]), i));
                self.values.resize(scores.len(), 0.0);
                for (rank, &i) in order.iter().enumerate().take(self.rank_weights.len()) {
                    self.values[i] = self.rank_weights[rank];
                }
            }
        }
    }

    /// Weight of sample `i` of the last prepared batch.
    #[must_use]
    pub fn utility(&self, i: usize) -> f64 {
        self.values[i]
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINDS: [UtilityKind; 5] = [
        UtilityKind::Fitness,
        UtilityKind::NormalizedFitness,
        UtilityKind::Superlinear,
        UtilityKind::Linear,
        UtilityKind::Equal,
    ];

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            "normalizedFitness".parse::<UtilityKind>().unwrap(),
            UtilityKind::NormalizedFitness
        );
        assert_eq!(
            "SUPERLINEAR".parse::<UtilityKind>().unwrap(),
            UtilityKind::Superlinear
        );
        assert!("quadratic".parse::<UtilityKind>().is_err());
        for kind in KINDS {
            assert_eq!(kind.to_string().parse::<UtilityKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_superlinear_weights() {
        let mut uf = UtilityFunction::new(UtilityKind::Superlinear, 4, 0);
        uf.prepare(&[3, 9, 1, 5]);
        // mu = 2: weights ln(2.5) - ln(1) and ln(2.5) - ln(2)
        let a = 2.5_f64.ln();
        let b = 2.5_f64.ln() - 2.0_f64.ln();
        assert!((uf.utility(1) - a / (a + b)).abs() < 1e-12);
        assert!((uf.utility(3) - b / (a + b)).abs() < 1e-12);
        assert_eq!(uf.utility(0), 0.0);
        assert_eq!(uf.utility(2), 0.0);
    }

    #[test]
    fn test_linear_weights() {
        let mut uf = UtilityFunction::new(UtilityKind::Linear, 6, 0);
        uf.prepare(&[1, 2, 3, 4, 5, 6]);
        // mu = 3: raw weights 2.5, 1.5, 0.5
        assert!((uf.utility(5) - 2.5 / 4.5).abs() < 1e-12);
        assert!((uf.utility(4) - 1.5 / 4.5).abs() < 1e-12);
        assert!((uf.utility(3) - 0.5 / 4.5).abs() < 1e-12);
        assert_eq!(&uf.values()[..3], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_ties_break_by_index() {
        let mut uf = UtilityFunction::new(UtilityKind::Equal, 4, 0);
        uf.prepare(&[7, 7, 7, 7]);
        assert_eq!(uf.values(), &[0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_fitness_scales_by_upper_bound() {
        let mut uf = UtilityFunction::new(UtilityKind::Fitness, 2, 10);
        uf.prepare(&[5, 10]);
        assert_eq!(uf.values(), &[0.25, 0.5]);

        let mut no_bound = UtilityFunction::new(UtilityKind::Fitness, 2, 0);
        no_bound.prepare(&[1, -1]);
        assert_eq!(no_bound.values(), &[0.5, -0.5]);
    }

    #[test]
    fn test_normalized_fitness() {
        let mut uf = UtilityFunction::new(UtilityKind::NormalizedFitness, 3, 0);
        uf.prepare(&[2, 4, 6]);
        for (v, expected) in uf.values().iter().zip([1.0 / 6.0, 2.0 / 6.0, 3.0 / 6.0]) {
            assert!((v - expected).abs() < 1e-12);
        }
        uf.prepare(&[0, 0, 0]);
        assert_eq!(uf.values(), &[1.0 / 3.0; 3]);
        uf.prepare(&[-3, 0, 1]);
        assert!((uf.values().iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_sample_batch() {
        for kind in KINDS {
            let mut uf = UtilityFunction::new(kind, 1, 4);
            assert_eq!(uf.mu(), 1);
            uf.prepare(&[4]);
            assert!((uf.utility(0) - 1.0).abs() < 1e-12, "{kind}");
        }
    }

    #[test]
    fn test_resize_rebuilds_table() {
        let mut uf = UtilityFunction::new(UtilityKind::Equal, 4, 0);
        uf.resize(10);
        assert_eq!(uf.lambda(), 10);
        uf.prepare(&[0; 10]);
        assert_eq!(uf.values().iter().filter(|&&v| v > 0.0).count(), 5);
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn prop_weights_sum_to_at_most_one(
                scores in prop::collection::vec(-1000_i64..=1000, 1..200),
                kind_index in 0_usize..5,
            ) {
                let kind = KINDS[kind_index];
                let mut uf = UtilityFunction::new(kind, scores.len(), 1000);
                uf.prepare(&scores);
                let sum = uf.values().iter().sum::<f64>();
                prop_assert!(sum <= 1.0 + 1e-9, "{kind}: sum = {sum}");
            }

            #[test]
            fn prop_only_top_mu_receive_weight(
                scores in prop::collection::vec(any::<i32>(), 1..200),
                kind_index in 2_usize..5,
            ) {
                let kind = KINDS[kind_index];
                let scores = scores.into_iter().map(i64::from).collect::<Vec<_>>();
                let mut uf = UtilityFunction::new(kind, scores.len(), 0);
                uf.prepare(&scores);
                let mu = uf.mu();
                let mut order = (0..scores.len()).collect::<Vec<_>>();
                order.sort_by_key(|&i| (Reverse(scores[i]), i));
                for (rank, &i) in order.iter().enumerate() {
                    if rank < mu {
                        prop_assert!(uf.utility(i) > 0.0);
                    } else {
                        prop_assert_eq!(uf.utility(i), 0.0);
                    }
                }
            }
        }
    }
}
