use permuta_model::Permutation;

/// The best permutation seen so far in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incumbent {
    permutation: Permutation,
    score: i64,
    evaluation: usize,
}

impl Incumbent {
    #[must_use]
    pub fn new(permutation: Permutation, score: i64, evaluation: usize) -> Self {
        Self {
            permutation,
            score,
            evaluation,
        }
    }

    #[must_use]
    pub fn permutation(&self) -> &Permutation {
        &self.permutation
    }

    #[must_use]
    pub fn score(&self) -> i64 {
        self.score
    }

    /// 1-based index of the evaluation that found this permutation.
    #[must_use]
    pub fn evaluation(&self) -> usize {
        self.evaluation
    }

    /// Replaces the incumbent when `score` is strictly better. Returns whether it did.
    pub fn offer(&mut self, permutation: &Permutation, score: i64, evaluation: usize) -> bool {
        if score <= self.score {
            return false;
        }
        tracing::debug!(score, evaluation, "new best permutation");
        self.permutation.clone_from(permutation);
        self.score = score;
        self.evaluation = evaluation;
        true
    }
}

/// Keeps the first offer and then every strict improvement.
pub(crate) fn offer(
    incumbent: &mut Option<Incumbent>,
    permutation: &Permutation,
    score: i64,
    evaluation: usize,
) {
    match incumbent {
        Some(best) => {
            best.offer(permutation, score, evaluation);
        }
        None => {
            tracing::debug!(score, evaluation, "first evaluated permutation");
            *incumbent = Some(Incumbent::new(permutation.clone(), score, evaluation));
        }
    }
}
