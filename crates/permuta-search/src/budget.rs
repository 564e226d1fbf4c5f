/// A fixed number of objective evaluations, consumed one permutation at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationBudget {
    max: usize,
    used: usize,
}

impl EvaluationBudget {
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self { max, used: 0 }
    }

    /// `1000 · n²`.
    #[must_use]
    pub fn default_for(n: usize) -> usize {
        1000 * n * n
    }

    #[must_use]
    pub fn max(&self) -> usize {
        self.max
    }

    #[must_use]
    pub fn used(&self) -> usize {
        self.used
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.max - self.used
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max
    }

    /// Takes one evaluation and returns its 1-based index, or `None` once the budget is spent.
    pub fn try_consume(&mut self) -> Option<usize> {
        if self.is_exhausted() {
            return None;
        }
        self.used += 1;
        Some(self.used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_until_exhausted() {
        let mut budget = EvaluationBudget::new(2);
        assert_eq!(budget.remaining(), 2);
        assert_eq!(budget.try_consume(), Some(1));
        assert_eq!(budget.try_consume(), Some(2));
        assert!(budget.is_exhausted());
        assert_eq!(budget.try_consume(), None);
        assert_eq!(budget.used(), 2);
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn test_default_size() {
        assert_eq!(EvaluationBudget::default_for(5), 25_000);
        assert!(EvaluationBudget::new(0).is_exhausted());
    }
}
