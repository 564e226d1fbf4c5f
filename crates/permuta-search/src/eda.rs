//! Plackett-Luce estimation of distribution algorithm.
//!
//! A resident population of `10n` orderings is kept sorted by fitness. Every generation
//!
//! 1. learns Plackett-Luce strengths by MM from the `n - 1` best residents plus one fresh
//!    uniformly random ordering, which keeps the fit away from the unbounded maximum of
//!    perfectly agreeing rankings,
//! 2. samples up to `10n - 1` offspring from the learned model into the offspring buffer,
//! 3. sorts residents and offspring together, so the best `10n` become the next residents.
//!
//! There is no gradient, step size or restart here; the budget is the only stopping rule.

use std::{cmp::Reverse, iter};

use permuta_lop::Objective;
use permuta_model::{Permutation, PlackettLuce, RankingModel as _, estimator::MmEstimator};
use permuta_stats::descriptive::DescriptiveStats;
use rand::Rng;

use crate::{
    Algorithm, EvaluationBudget, GenerationRecord, Incumbent, SearchConfig, SearchOutcome,
    incumbent, report,
};

/// Fitness of an individual that has not been evaluated yet.
pub const UNSET_FITNESS: i64 = i64::MIN;

/// A candidate ordering and its fitness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Individual {
    permutation: Permutation,
    fitness: i64,
}

impl Individual {
    #[must_use]
    pub fn unset(n: usize) -> Self {
        Self {
            permutation: Permutation::identity(n),
            fitness: UNSET_FITNESS,
        }
    }

    #[must_use]
    pub fn permutation(&self) -> &Permutation {
        &self.permutation
    }

    #[must_use]
    pub fn fitness(&self) -> i64 {
        self.fitness
    }

    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.fitness != UNSET_FITNESS
    }
}

/// Residents followed by an offspring buffer, in one vector.
#[derive(Debug, Clone)]
pub struct Population {
    individuals: Vec<Individual>,
    resident_count: usize,
}

impl Population {
    #[must_use]
    pub fn new(n: usize, resident_count: usize, offspring_count: usize) -> Self {
        Self {
            individuals: vec![Individual::unset(n); resident_count + offspring_count],
            resident_count,
        }
    }

    #[must_use]
    pub fn residents(&self) -> &[Individual] {
        &self.individuals[..self.resident_count]
    }

    #[must_use]
    pub fn offspring(&self) -> &[Individual] {
        &self.individuals[self.resident_count..]
    }

    fn set_resident(&mut self, index: usize, permutation: Permutation, fitness: i64) {
        self.individuals[index] = Individual {
            permutation,
            fitness,
        };
    }

    fn set_offspring(&mut self, index: usize, permutation: Permutation, fitness: i64) {
        self.set_resident(self.resident_count + index, permutation, fitness);
    }

    /// Sorts the residents by descending fitness.
    pub fn sort_residents(&mut self) {
        self.individuals[..self.resident_count].sort_by_key(|ind| Reverse(ind.fitness));
    }

    /// Sorts residents and offspring together by descending fitness.
    pub fn sort_all(&mut self) {
        self.individuals.sort_by_key(|ind| Reverse(ind.fitness));
    }

    /// Fitness statistics of the evaluated residents.
    #[must_use]
    pub fn compute_fitness_stats(&self) -> Option<DescriptiveStats> {
        DescriptiveStats::from_scores(
            self.residents()
                .iter()
                .filter(|ind| ind.is_evaluated())
                .map(Individual::fitness),
        )
    }
}

/// One PLEDA run.
#[derive(Debug)]
pub struct PledaSearch<O> {
    objective: O,
    budget: EvaluationBudget,
    population: Population,
    model: PlackettLuce,
    estimator: MmEstimator,
    incumbent: Option<Incumbent>,
    selection_count: usize,
    offspring_count: usize,
    print_interval: usize,
    generation: usize,
}

impl<O> PledaSearch<O>
where
    O: Objective,
{
    /// Creates the run and evaluates the initial random residents.
    pub fn new<R>(objective: O, config: &SearchConfig, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let n = objective.size();
        let resident_count = 10 * n;
        let offspring_count = resident_count.saturating_sub(1);
        let mut this = Self {
            budget: EvaluationBudget::new(config.max_evaluations_for(n)),
            population: Population::new(n, resident_count, offspring_count),
            model: PlackettLuce::new(n),
            estimator: MmEstimator::default(),
            incumbent: None,
            selection_count: n,
            offspring_count,
            print_interval: config.print_interval,
            generation: 0,
            objective,
        };
        for index in 0..resident_count {
            let Some(evaluation) = this.budget.try_consume() else {
                break;
            };
            let x = Permutation::random(n, rng);
            let fitness = this.objective.evaluate(&x);
            incumbent::offer(&mut this.incumbent, &x, fitness, evaluation);
            this.population.set_resident(index, x, fitness);
        }
        this.population.sort_residents();
        this
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    #[must_use]
    pub fn model(&self) -> &PlackettLuce {
        &self.model
    }

    #[must_use]
    pub fn budget(&self) -> &EvaluationBudget {
        &self.budget
    }

    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.budget.is_exhausted()
    }

    pub fn run<R, F>(&mut self, rng: &mut R, mut on_record: F) -> Option<SearchOutcome>
    where
        R: Rng + ?Sized,
        F: FnMut(&GenerationRecord),
    {
        tracing::info!(
            n = self.objective.size(),
            residents = self.population.resident_count,
            budget = self.budget.max(),
            "starting PLEDA"
        );
        while !self.is_finished() {
            if let Some(record) = self.step(rng) {
                on_record(&record);
            }
        }
        let outcome = self.outcome();
        if let Some(outcome) = &outcome {
            tracing::info!(
                best_score = outcome.best_score,
                best_evaluation = outcome.best_evaluation,
                generations = outcome.generations,
                "PLEDA finished"
            );
        }
        outcome
    }

    /// Runs one generation: learn, sample, select.
    pub fn step<R>(&mut self, rng: &mut R) -> Option<GenerationRecord>
    where
        R: Rng + ?Sized,
    {
        if self.is_finished() {
            return None;
        }
        self.generation += 1;
        let n = self.objective.size();

        let top = self.selection_count.saturating_sub(1);
        let regularizer = Permutation::random(n, rng);
        let rankings = self.population.residents()[..top]
            .iter()
            .map(Individual::permutation)
            .chain(iter::once(&regularizer));
        let fit = self.estimator.fit(n, rankings);
        tracing::trace!(
            generation = self.generation,
            iterations = fit.iterations,
            converged = fit.converged,
            "learned model"
        );
        self.model = fit.into_model();

        let count = self.offspring_count.min(self.budget.remaining());
        for index in 0..count {
            let Some(evaluation) = self.budget.try_consume() else {
                break;
            };
            let x = self.model.sample_roulette(rng);
            let fitness = self.objective.evaluate(&x);
            incumbent::offer(&mut self.incumbent, &x, fitness, evaluation);
            self.population.set_offspring(index, x, fitness);
        }
        self.population.sort_all();

        if let Some(stats) = self.population.compute_fitness_stats() {
            tracing::trace!(
                generation = self.generation,
                max = stats.max,
                mean = stats.mean,
                median = stats.median,
                "selected residents"
            );
        }

        report::is_record_generation(self.generation, self.print_interval)
            .then(|| self.record(count))
    }

    #[must_use]
    pub fn outcome(&self) -> Option<SearchOutcome> {
        let best = self.incumbent.as_ref()?;
        Some(SearchOutcome {
            best: best.permutation().clone(),
            best_score: best.score(),
            best_evaluation: best.evaluation(),
            evaluations: self.budget.used(),
            generations: self.generation,
            restarts: 0,
            lambda: self.offspring_count,
            alpha: 0.0,
        })
    }

    fn record(&self, sampled: usize) -> GenerationRecord {
        GenerationRecord {
            algorithm: Algorithm::Pleda,
            lambda: sampled,
            alpha: 0.0,
            generation: self.generation,
            mode_score: self.objective.evaluate(&self.model.mode()),
            entropy: self.model.entropy(),
            max_prob: self.model.max_prob(),
            best_score: self.incumbent.as_ref().map_or(UNSET_FITNESS, Incumbent::score),
            restarts: 0,
        }
    }
}
