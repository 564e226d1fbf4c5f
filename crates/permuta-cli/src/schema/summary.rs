use chrono::{DateTime, Utc};
use permuta_search::{Algorithm, Delimiter};
use permuta_stats::descriptive::DescriptiveStats;
use serde::Serialize;

/// Result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub instance: String,
    pub seed: u64,
    pub algorithm: Algorithm,
    /// Initial batch size.
    pub lambda: usize,
    /// Initial step size.
    pub alpha: f64,
    pub best_fitness: i64,
    pub best_evaluation: usize,
    pub elapsed_secs: f64,
    pub best_permutation: Vec<usize>,
    pub known_optimum: Option<i64>,
    pub evaluations: usize,
    pub generations: usize,
    pub restarts: usize,
    pub final_lambda: usize,
    pub final_alpha: f64,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// `instance, seed, algorithm, lambda, alpha, best fitness, best evaluation, elapsed secs`
    #[must_use]
    pub fn to_line(&self, delimiter: Delimiter) -> String {
        let d = delimiter.as_char();
        let Self {
            instance,
            seed,
            algorithm,
            lambda,
            alpha,
            best_fitness,
            best_evaluation,
            elapsed_secs,
            ..
        } = self;
        format!(
            "{instance}{d}{seed}{d}{algorithm}{d}{lambda}{d}{alpha}{d}{best_fitness}{d}\
             {best_evaluation}{d}{elapsed_secs:.3}"
        )
    }
}

/// Spread of the best fitness over repeated runs.
#[derive(Debug, Clone, Serialize)]
pub struct FitnessSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl From<DescriptiveStats> for FitnessSummary {
    fn from(stats: DescriptiveStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean,
            median: stats.median,
            std_dev: stats.std_dev,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub runs: Vec<RunSummary>,
    pub best_fitness: Option<FitnessSummary>,
}

impl RunReport {
    #[must_use]
    pub fn new(runs: Vec<RunSummary>) -> Self {
        let best_fitness =
            DescriptiveStats::from_scores(runs.iter().map(|run| run.best_fitness)).map(Into::into);
        Self { runs, best_fitness }
    }
}
