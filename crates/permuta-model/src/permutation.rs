//! Permutations of `n` items.
//!
//! A [`Permutation`] is an ordering description: `x[i]` is the item placed at rank position
//! `i`. Every value in `0..n` appears exactly once; the constructor rejects anything else, so
//! code holding a `Permutation` never needs to re-validate it.

use std::fmt;

use rand::{Rng, seq::SliceRandom as _};

/// Error returned when a sequence is not a bijection on `0..n`.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum InvalidPermutationError {
    #[display("item {item} at position {position} is out of range for size {len}")]
    OutOfRange {
        position: usize,
        item: usize,
        len: usize,
    },
    #[display("item {item} appears more than once (again at position {position})")]
    Duplicate { position: usize, item: usize },
}

/// A bijection from rank position to item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    /// Validates `items` and wraps it.
    ///
    /// # Examples
    ///
    /// ```
    /// use permuta_model::Permutation;
    ///
    /// assert!(Permutation::new(vec![2, 0, 1]).is_ok());
    /// assert!(Permutation::new(vec![0, 0, 1]).is_err());
    /// assert!(Permutation::new(vec![0, 3, 1]).is_err());
    /// ```
    pub fn new(items: Vec<usize>) -> Result<Self, InvalidPermutationError> {
        let len = items.len();
        let mut seen = vec![false; len];
        for (position, &item) in items.iter().enumerate() {
            if item >= len {
                return Err(InvalidPermutationError::OutOfRange {
                    position,
                    item,
                    len,
                });
            }
            if seen[item] {
                return Err(InvalidPermutationError::Duplicate { position, item });
            }
            seen[item] = true;
        }
        Ok(Self(items))
    }

    /// Wraps `items` without validation.
    ///
    /// Callers must guarantee the bijection; debug builds still check it.
    #[must_use]
    pub(crate) fn from_vec_unchecked(items: Vec<usize>) -> Self {
        debug_assert!(
            Self::new(items.clone()).is_ok(),
            "not a permutation: {items:?}"
        );
        Self(items)
    }

    /// Returns `[0, 1, ..., n-1]`.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        Self((0..n).collect())
    }

    /// Draws a uniformly random permutation (Fisher-Yates).
    pub fn random<R>(n: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut items = (0..n).collect::<Vec<_>>();
        items.shuffle(rng);
        Self(items)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the permutation of zero items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<usize> {
        self.0
    }

    /// Returns the ranking description: `y[x[i]] = i`.
    ///
    /// ```
    /// use permuta_model::Permutation;
    ///
    /// let x = Permutation::new(vec![2, 0, 1]).unwrap();
    /// assert_eq!(x.inverse().as_slice(), &[1, 2, 0]);
    /// ```
    #[must_use]
    pub fn inverse(&self) -> Self {
        let mut inv = vec![0; self.0.len()];
        for (position, &item) in self.0.iter().enumerate() {
            inv[item] = position;
        }
        Self(inv)
    }

    /// Number of item pairs the two permutations order differently (Kendall tau distance).
    ///
    /// # Panics
    ///
    /// Panics if the permutations have different sizes.
    #[must_use]
    pub fn kendall_distance(&self, other: &Self) -> usize {
        assert_eq!(self.len(), other.len(), "size mismatch");
        let rank = other.inverse();
        let ranks = self.0.iter().map(|&item| rank.0[item]).collect::<Vec<_>>();
        let mut count = 0;
        for i in 0..ranks.len() {
            for j in i + 1..ranks.len() {
                if ranks[i] > ranks[j] {
                    count += 1;
                }
            }
        }
        count
    }
}

impl AsRef<[usize]> for Permutation {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

impl TryFrom<Vec<usize>> for Permutation {
    type Error = InvalidPermutationError;

    fn try_from(items: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(items)
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for item in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{item}")?;
            first = false;
        }
        Ok(())
    }
}
