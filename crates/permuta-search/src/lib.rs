//! Ranking-model search over permutations.
//!
//! This crate turns the models of `permuta-model` into black-box optimisers for any
//! [`Objective`]:
//!
//! - [`gradient::GradientSearch`] - stochastic gradient ascent on the model parameters with
//!   fitness shaping, optional natural gradient, cumulative step-size control and
//!   entropy-driven batch size
//! - [`eda::PledaSearch`] - an estimation of distribution algorithm that re-fits a
//!   Plackett-Luce model by MM every generation
//!
//! # Algorithms
//!
//! | Tag | Model | Natural gradient | Adapts `alpha` | Adapts `lambda` |
//! |---|---|---|---|---|
//! | `PL` | Plackett-Luce | | | |
//! | `PLN` | Plackett-Luce | ✓ | | |
//! | `PLSL` | Plackett-Luce | | ✓ | |
//! | `PLSS` | Plackett-Luce | | | ✓ |
//! | `PLSA` | Plackett-Luce | | ✓ | ✓ |
//! | `PLNSA` | Plackett-Luce | ✓ | ✓ | ✓ |
//! | `BT` | Bradley-Terry | | | |
//! | `PLEDA` | Plackett-Luce (MM) | | | |
//!
//! # Numerical failures
//!
//! A non-finite gradient, a singular or non-finite Fisher inverse, or a non-finite entropy
//! after an update never aborts a run. The model is reset to the degenerate distribution at
//! the best permutation found so far, the restart counter goes up, and adaptation starts
//! over from the initial `alpha` and `lambda`.
//!
//! # Example
//!
//! ```
//! use permuta_lop::LopInstance;
//! use permuta_search::{Algorithm, SearchConfig};
//! use rand::SeedableRng as _;
//!
//! let instance = "3\n0 4 1\n0 0 2\n3 0 0\n".parse::<LopInstance>().unwrap();
//! let config = SearchConfig {
//!     algorithm: Algorithm::Plsa,
//!     max_evaluations: Some(500),
//!     ..SearchConfig::default()
//! };
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let outcome = permuta_search::run(&config, &instance, &mut rng, |_| {}).unwrap();
//! assert_eq!(outcome.evaluations, 500);
//! ```

use permuta_lop::Objective;
use permuta_model::{BradleyTerry, Permutation, PlackettLuce};
use rand::Rng;

pub use self::{
    algorithm::{Algorithm, ConfigError, ModelKind, SearchConfig},
    budget::EvaluationBudget,
    incumbent::Incumbent,
    report::{Delimiter, GenerationRecord, RecordFormatter},
    utility::{UtilityFunction, UtilityKind},
};

pub mod adaptation;
pub mod algorithm;
pub mod budget;
pub mod eda;
pub mod gradient;
pub mod incumbent;
pub mod natural;
pub mod report;
pub mod utility;

/// Final state of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub best: Permutation,
    pub best_score: i64,
    /// 1-based evaluation at which `best` was found.
    pub best_evaluation: usize,
    pub evaluations: usize,
    pub generations: usize,
    pub restarts: usize,
    /// Batch size at the end of the run.
    pub lambda: usize,
    /// Step size at the end of the run.
    pub alpha: f64,
}

/// Validates `config`, builds the model it names and runs it to the end of the budget.
pub fn run<O, R, F>(
    config: &SearchConfig,
    objective: O,
    rng: &mut R,
    on_record: F,
) -> Result<SearchOutcome, ConfigError>
where
    O: Objective,
    R: Rng + ?Sized,
    F: FnMut(&GenerationRecord),
{
    config.validate()?;
    let n = objective.size();
    if n == 0 {
        return Err(ConfigError::EmptyProblem);
    }
    let outcome = match config.algorithm.model_kind() {
        Some(ModelKind::PlackettLuce) => {
            let model = PlackettLuce::new(n).with_sampler(config.pl_sampler);
            gradient::GradientSearch::new(model, objective, config).run(rng, on_record)
        }
        Some(ModelKind::BradleyTerry) => {
            let model = BradleyTerry::new(n).with_max_iterations(config.bt_sampling_iterations);
            gradient::GradientSearch::new(model, objective, config).run(rng, on_record)
        }
        None => eda::PledaSearch::new(objective, config, rng).run(rng, on_record),
    };
    outcome.ok_or(ConfigError::ZeroBudget)
}
