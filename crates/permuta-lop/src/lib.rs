//! Objective functions over permutations.
//!
//! The search algorithms only see the [`Objective`] trait: a pure function from a permutation
//! to an integer score (higher is better) plus a pair of precomputed score bounds used for
//! fitness scaling. [`LopInstance`] implements it for the Linear Ordering Problem.
//!
//! # Example
//!
//! ```
//! use permuta_lop::{LopInstance, Objective as _};
//! use permuta_model::Permutation;
//!
//! let instance = "3\n0 1 1\n0 0 1\n0 0 0\n3\n".parse::<LopInstance>().unwrap();
//! assert_eq!(instance.evaluate(&Permutation::identity(3)), 3);
//! assert_eq!(instance.known_optimum(), Some(3));
//! ```

use permuta_model::Permutation;

pub use self::lop::{InstanceError, LopInstance};

pub mod lop;

/// Lower and upper estimates of the objective value over all permutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBounds {
    pub lower: i64,
    pub upper: i64,
}

/// A maximisation problem over permutations of `size()` items.
pub trait Objective {
    /// Number of items in a candidate permutation.
    fn size(&self) -> usize;

    /// Scores `x`; higher is better.
    fn evaluate(&self, x: &Permutation) -> i64;

    /// Bounds computed once at load time.
    fn bounds(&self) -> ScoreBounds;
}

impl<T> Objective for &T
where
    T: Objective + ?Sized,
{
    fn size(&self) -> usize {
        (**self).size()
    }

    fn evaluate(&self, x: &Permutation) -> i64 {
        (**self).evaluate(x)
    }

    fn bounds(&self) -> ScoreBounds {
        (**self).bounds()
    }
}
