//! Log-weight vectors shared by the ranking models.
//!
//! Both [`PlackettLuce`](crate::PlackettLuce) and [`BradleyTerry`](crate::BradleyTerry) are
//! parameterised by one real log-weight `w[i]` per item. [`LogWeights`] owns `w` together with
//! its derived state:
//!
//! - `expw[i] = exp(w[i])`
//! - `sexpw = sum(expw)`
//! - the Shannon entropy of the categorical distribution `expw / sexpw`
//!
//! The derived state is **not** kept in sync automatically. Code that mutates `w` through
//! [`LogWeights::log_weights_mut`] must call [`LogWeights::refresh`] before reading any derived
//! quantity again.
//!
//! # Numeric range
//!
//! Everything is `f64`. The degenerate ladder spans `exp(+10)..exp(-10)`, and a refresh with
//! [`Shift::Max`] keeps every `expw[i] <= 1`, so overflow only happens when `w` itself is
//! already non-finite.

use crate::Permutation;

/// Top of the degenerate weight ladder.
pub const DEGENERATE_UPPER: f64 = 10.0;
/// Bottom of the degenerate weight ladder.
pub const DEGENERATE_LOWER: f64 = -10.0;

/// How [`LogWeights::refresh`] normalises `w` before exponentiating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shift {
    /// Use `w` as is.
    #[default]
    None,
    /// Subtract `max(w)` from every weight first (softmax shift).
    ///
    /// Both models are invariant to adding a constant to every weight, so this leaves the
    /// distribution unchanged.
    Max,
}

/// Log-weights and their cached derived state.
#[derive(Debug, Clone, PartialEq)]
pub struct LogWeights {
    w: Vec<f64>,
    expw: Vec<f64>,
    sexpw: f64,
    entropy: f64,
}

impl LogWeights {
    /// Creates the uniform parameterisation: `w[i] = ln(1/n)`, so `sexpw = 1`.
    #[must_use]
    pub fn uniform(n: usize) -> Self {
        let mut this = Self {
            w: vec![0.0; n],
            expw: vec![0.0; n],
            sexpw: 0.0,
            entropy: 0.0,
        };
        this.set_uniform();
        this
    }

    /// Creates weights whose `expw` is exactly `strengths` (and `w = ln(strengths)`).
    ///
    /// Zero strengths are allowed and give `w = -inf`.
    #[must_use]
    pub fn from_strengths(strengths: &[f64]) -> Self {
        let mut this = Self {
            w: strengths.iter().map(|s| s.ln()).collect(),
            expw: strengths.to_vec(),
            sexpw: 0.0,
            entropy: 0.0,
        };
        this.sexpw = this.expw.iter().sum();
        this.entropy = categorical_entropy(&this.expw, this.sexpw);
        this
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.w.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.w.is_empty()
    }

    #[must_use]
    pub fn log_weights(&self) -> &[f64] {
        &self.w
    }

    /// Mutable access to `w`. Call [`refresh`](Self::refresh) afterwards.
    pub fn log_weights_mut(&mut self) -> &mut [f64] {
        &mut self.w
    }

    #[must_use]
    pub fn exp_weights(&self) -> &[f64] {
        &self.expw
    }

    #[must_use]
    pub fn exp_sum(&self) -> f64 {
        self.sexpw
    }

    /// Resets to the uniform parameterisation.
    #[expect(clippy::cast_precision_loss)]
    pub fn set_uniform(&mut self) {
        let n = self.w.len();
        if n == 0 {
            self.sexpw = 0.0;
            self.entropy = 0.0;
            return;
        }
        let u = 1.0 / n as f64;
        self.w.fill(u.ln());
        self.expw.fill(u);
        self.sexpw = 1.0;
        self.entropy = (n as f64).ln();
    }

    /// Concentrates the distribution on `order`.
    ///
    /// `order[0]` gets weight `+10`, `order[n-1]` gets `-10`, and the items in between sit on
    /// `n - 1` equal steps of the ladder.
    ///
    /// # Panics
    ///
    /// Panics if `order.len()` differs from the number of weights.
    #[expect(clippy::cast_precision_loss)]
    pub fn set_degenerate(&mut self, order: &Permutation) {
        assert_eq!(order.len(), self.w.len(), "order size mismatch");
        let n = self.w.len();
        let step = if n > 1 {
            (DEGENERATE_UPPER - DEGENERATE_LOWER) / (n - 1) as f64
        } else {
            0.0
        };
        for (rank, &item) in order.as_slice().iter().enumerate() {
            self.w[item] = DEGENERATE_UPPER - step * rank as f64;
        }
        self.refresh(Shift::None);
    }

    /// Recomputes `expw`, `sexpw` and the cached entropy from `w`.
    pub fn refresh(&mut self, shift: Shift) {
        if shift == Shift::Max {
            if let Some(max) = self.w.iter().copied().reduce(f64::max) {
                for w in &mut self.w {
                    *w -= max;
                }
            }
        }
        self.sexpw = 0.0;
        for (e, w) in self.expw.iter_mut().zip(&self.w) {
            *e = w.exp();
            self.sexpw += *e;
        }
        self.entropy = categorical_entropy(&self.expw, self.sexpw);
    }

    /// Items sorted by descending weight, ties broken by item index.
    #[must_use]
    pub fn mode(&self) -> Permutation {
        let mut items = (0..self.w.len()).collect::<Vec<_>>();
        items.sort_by(|&a, &b| self.w[b].total_cmp(&self.w[a]));
        Permutation::from_vec_unchecked(items)
    }

    /// Shannon entropy of the categorical distribution `expw / sexpw` over items.
    ///
    /// This is `ln(n)` for the uniform model and `0` when a single item carries all the mass.
    /// It is non-finite when the weights are.
    #[must_use]
    pub fn entropy(&self) -> f64 {
        self.entropy
    }

    /// `max(expw) / sexpw`.
    #[must_use]
    pub fn max_prob(&self) -> f64 {
        let max = self.expw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        max / self.sexpw
    }
}

fn categorical_entropy(expw: &[f64], sexpw: f64) -> f64 {
    expw.iter()
        .map(|e| {
            let p = e / sexpw;
            // 0 ln 0 = 0, but NaN must propagate
            if p == 0.0 { 0.0 } else { -p * p.ln() }
        })
        .sum()
}

/// Creates a vector by applying a function to each index.
///
/// ```
/// use permuta_model::weights;
///
/// let v = weights::from_fn(|i| 1.0 / (i as f64 + 1.0), 3);
/// assert_eq!(v, vec![1.0, 0.5, 1.0 / 3.0]);
/// ```
pub fn from_fn<F>(mut f: F, len: usize) -> Vec<f64>
where
    F: FnMut(usize) -> f64,
{
    let mut values = Vec::with_capacity(len);
    for i in 0..len {
        values.push(f(i));
    }
    values
}

/// Normalizes a vector to sum to 1.0 (L1 normalization).
///
/// If the sum is zero or negative, values are left unchanged and `false` is returned.
pub fn normalize_l1(values: &mut [f64]) -> bool {
    let sum: f64 = values.iter().copied().sum();
    if sum > 0.0 {
        for v in values {
            *v /= sum;
        }
        true
    } else {
        false
    }
}

/// Euclidean norm.
#[must_use]
pub fn norm2(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_entropy_is_log_n() {
        for n in 1..30 {
            let weights = LogWeights::uniform(n);
            #[expect(clippy::cast_precision_loss)]
            let expected = (n as f64).ln();
            assert!((weights.entropy() - expected).abs() < 1e-12, "n = {n}");
            assert!((weights.exp_sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_single_mass_entropy_is_zero() {
        let weights = LogWeights::from_strengths(&[0.0, 1.0, 0.0, 0.0]);
        assert_eq!(weights.entropy(), 0.0);
        assert_eq!(weights.max_prob(), 1.0);
        assert_eq!(weights.mode().as_slice()[0], 1);
    }

    #[test]
    fn test_degenerate_ladder() {
        let order = Permutation::new(vec![2, 0, 3, 1]).unwrap();
        let mut weights = LogWeights::uniform(4);
        weights.set_degenerate(&order);
        let w = weights.log_weights();
        assert!((w[2] - 10.0).abs() < 1e-12);
        assert!((w[1] + 10.0).abs() < 1e-12);
        assert!((w[0] - (10.0 - 20.0 / 3.0)).abs() < 1e-12);
        assert_eq!(weights.mode(), order);
        assert!(weights.max_prob() > 0.99);
    }

    #[test]
    fn test_degenerate_single_item() {
        let mut weights = LogWeights::uniform(1);
        weights.set_degenerate(&Permutation::identity(1));
        assert_eq!(weights.log_weights(), &[10.0]);
        assert_eq!(weights.entropy(), 0.0);
    }

    #[test]
    fn test_refresh_with_max_shift_keeps_distribution() {
        let mut weights = LogWeights::uniform(3);
        weights.log_weights_mut().copy_from_slice(&[2.0, 5.0, 3.0]);
        weights.refresh(Shift::None);
        let before = weights
            .exp_weights()
            .iter()
            .map(|e| e / weights.exp_sum())
            .collect::<Vec<_>>();
        weights.refresh(Shift::Max);
        assert_eq!(weights.log_weights()[1], 0.0);
        for (b, e) in before.iter().zip(weights.exp_weights()) {
            assert!((b - e / weights.exp_sum()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_nan_weights_give_nan_entropy() {
        let mut weights = LogWeights::uniform(3);
        weights.log_weights_mut()[0] = f64::NAN;
        weights.refresh(Shift::Max);
        assert!(!weights.entropy().is_finite());
    }

    #[test]
    fn test_mode_ties_break_by_index() {
        let mut weights = LogWeights::uniform(4);
        weights.log_weights_mut().copy_from_slice(&[1.0, 3.0, 1.0, 3.0]);
        weights.refresh(Shift::None);
        assert_eq!(weights.mode().as_slice(), &[1, 3, 0, 2]);
    }

    #[test]
    fn test_normalize_l1() {
        let mut v = vec![1.0, 3.0];
        assert!(normalize_l1(&mut v));
        assert_eq!(v, vec![0.25, 0.75]);
        let mut zeros = vec![0.0, 0.0];
        assert!(!normalize_l1(&mut zeros));
        assert_eq!(zeros, vec![0.0, 0.0]);
    }
}
