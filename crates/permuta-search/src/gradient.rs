//! Stochastic gradient ascent on the parameters of a ranking model.
//!
//! Every generation runs through the same phases:
//!
//! 1. **Sampling**: draw `min(lambda, remaining)` permutations, evaluate them and track the
//!    incumbent. The run terminates once the budget is spent.
//! 2. **Gradient computation**: shape the scores into utility weights and accumulate
//!    `delta = sum_i u_i grad ln P(x_i)`. Natural variants also build the empirical Fisher
//!    matrix and precondition `delta`. A progress record is emitted here, before the model
//!    changes.
//! 3. **Model update**: `w += alpha * direction` and refresh the derived state. A failed
//!    gradient, a failed Fisher inverse or a non-finite entropy after the update instead resets
//!    the model to the degenerate distribution at the incumbent and counts a restart.
//! 4. **Adaptation update**: adapt `alpha` (cumulative step-size control) and `lambda`
//!    (entropy) when the variant enables them. A restart pins both back to their initial
//!    values.

use permuta_lop::Objective;
use permuta_model::{NumericalError, Permutation, RankingModel};
use permuta_stats::descriptive::DescriptiveStats;
use rand::Rng;

use crate::{
    Algorithm, EvaluationBudget, GenerationRecord, Incumbent, SearchConfig, SearchOutcome,
    adaptation::{PopulationSizeController, StepSizeController},
    incumbent,
    natural::FisherAccumulator,
    report,
    utility::UtilityFunction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Phase {
    Sampling,
    GradientComputation,
    ModelUpdate,
    AdaptationUpdate,
    Terminated,
}

/// One gradient-ascent run over model `M` and objective `O`.
#[derive(Debug)]
pub struct GradientSearch<M, O> {
    model: M,
    objective: O,
    algorithm: Algorithm,
    print_interval: usize,
    utility: UtilityFunction,
    budget: EvaluationBudget,
    incumbent: Option<Incumbent>,
    step_size: Option<StepSizeController>,
    batch_size: Option<PopulationSizeController>,
    fisher: Option<FisherAccumulator>,
    phase: Phase,
    generation: usize,
    restarts: usize,
    lambda: usize,
    alpha: f64,
    restart: bool,
    failure: Option<NumericalError>,
    samples: Vec<Permutation>,
    scores: Vec<i64>,
    grad: Vec<f64>,
    delta: Vec<f64>,
    direction: Vec<f64>,
}

impl<M, O> GradientSearch<M, O>
where
    M: RankingModel,
    O: Objective,
{
    /// Starts a run from `model` as given.
    ///
    /// Only the variant flags of `config.algorithm` are read; the caller chooses the model.
    ///
    /// # Panics
    ///
    /// Panics if the model and the objective disagree on the problem size, or if
    /// `config.lambda` is zero.
    pub fn new(model: M, objective: O, config: &SearchConfig) -> Self {
        let n = objective.size();
        assert_eq!(model.len(), n, "model size does not match the objective");
        let algorithm = config.algorithm;
        let upper_bound = objective.bounds().upper;
        Self {
            model,
            objective,
            algorithm,
            print_interval: config.print_interval,
            utility: UtilityFunction::new(config.utility, config.lambda, upper_bound),
            budget: EvaluationBudget::new(config.max_evaluations_for(n)),
            incumbent: None,
            step_size: algorithm.adapts_step_size().then(|| {
                StepSizeController::new(n, config.alpha, config.lower_alpha, config.upper_alpha)
            }),
            batch_size: algorithm
                .adapts_batch_size()
                .then_some(PopulationSizeController {
                    initial: config.lambda,
                    lower: config.lower_lambda,
                    upper: config.upper_lambda,
                }),
            fisher: algorithm
                .uses_natural_gradient()
                .then(|| FisherAccumulator::new(n)),
            phase: Phase::Sampling,
            generation: 0,
            restarts: 0,
            lambda: config.lambda,
            alpha: config.alpha,
            restart: false,
            failure: None,
            samples: Vec::with_capacity(config.lambda),
            scores: Vec::with_capacity(config.lambda),
            grad: vec![0.0; n],
            delta: vec![0.0; n],
            direction: vec![0.0; n],
        }
    }

    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of generations started so far.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    #[must_use]
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    #[must_use]
    pub fn lambda(&self) -> usize {
        self.lambda
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[must_use]
    pub fn budget(&self) -> &EvaluationBudget {
        &self.budget
    }

    #[must_use]
    pub fn best(&self) -> Option<&Incumbent> {
        self.incumbent.as_ref()
    }

    /// Runs until the budget is spent, passing every progress record to `on_record`.
    ///
    /// Returns `None` only when the budget allowed no evaluation at all.
    pub fn run<R, F>(&mut self, rng: &mut R, mut on_record: F) -> Option<SearchOutcome>
    where
        R: Rng + ?Sized,
        F: FnMut(&GenerationRecord),
    {
        tracing::info!(
            algorithm = %self.algorithm,
            model = M::NAME,
            n = self.model.len(),
            budget = self.budget.max(),
            "starting gradient search"
        );
        while !self.phase.is_terminated() {
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
                restarts = outcome.restarts,
                "gradient search finished"
            );
        }
        outcome
    }

    /// Executes the current phase and moves to the next one.
    pub fn step<R>(&mut self, rng: &mut R) -> Option<GenerationRecord>
    where
        R: Rng + ?Sized,
    {
        match self.phase {
            Phase::Sampling => {
                self.sample_and_evaluate(rng);
                None
            }
            Phase::GradientComputation => self.compute_direction(),
            Phase::ModelUpdate => {
                self.update_model();
                None
            }
            Phase::AdaptationUpdate => {
                self.adapt();
                None
            }
            Phase::Terminated => None,
        }
    }

    /// The result so far.
    #[must_use]
    pub fn outcome(&self) -> Option<SearchOutcome> {
        let best = self.incumbent.as_ref()?;
        Some(SearchOutcome {
            best: best.permutation().clone(),
            best_score: best.score(),
            best_evaluation: best.evaluation(),
            evaluations: self.budget.used(),
            generations: self.generation,
            restarts: self.restarts,
            lambda: self.lambda,
            alpha: self.alpha,
        })
    }

    fn sample_and_evaluate<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        if self.budget.is_exhausted() {
            self.phase = Phase::Terminated;
            return;
        }
        self.generation += 1;
        self.samples.clear();
        self.scores.clear();
        let count = self.lambda.min(self.budget.remaining());
        for _ in 0..count {
            let Some(evaluation) = self.budget.try_consume() else {
                break;
            };
            let x = self.model.sample(rng);
            let score = self.objective.evaluate(&x);
            incumbent::offer(&mut self.incumbent, &x, score, evaluation);
            self.samples.push(x);
            self.scores.push(score);
        }
        if let Some(stats) = DescriptiveStats::from_scores(self.scores.iter().copied()) {
            tracing::trace!(
                generation = self.generation,
                min = stats.min,
                max = stats.max,
                mean = stats.mean,
                std_dev = stats.std_dev,
                "evaluated batch"
            );
        }
        self.phase = if self.budget.is_exhausted() {
            Phase::Terminated
        } else {
            Phase::GradientComputation
        };
    }

    fn compute_direction(&mut self) -> Option<GenerationRecord> {
        self.utility.prepare(&self.scores);
        self.delta.fill(0.0);
        self.failure = None;
        if let Some(fisher) = &mut self.fisher {
            fisher.reset();
        }

        for (i, x) in self.samples.iter().enumerate() {
            if let Err(err) = self.model.grad_log_prob(x, &mut self.grad) {
                self.failure = Some(err);
                break;
            }
            let u = self.utility.utility(i);
            for (d, g) in self.delta.iter_mut().zip(&self.grad) {
                *d += u * g;
            }
            if let Some(fisher) = &mut self.fisher {
                fisher.add(&self.grad);
            }
        }

        if self.failure.is_none() {
            match &self.fisher {
                Some(fisher) => {
                    if let Err(err) =
                        fisher.natural_direction(&self.delta, self.lambda, &mut self.direction)
                    {
                        self.failure = Some(err);
                    }
                }
                None => self.direction.copy_from_slice(&self.delta),
            }
        }

        self.phase = Phase::ModelUpdate;
        report::is_record_generation(self.generation, self.print_interval)
            .then(|| self.record())
    }

    fn update_model(&mut self) {
        if self.failure.is_none() {
            let alpha = self.alpha;
            for (w, d) in self.model.log_weights_mut().iter_mut().zip(&self.direction) {
                *w += alpha * d;
            }
            self.model.update_derived_state();
            if !self.model.entropy().is_finite() {
                self.failure = Some(NumericalError::NonFiniteEntropy);
            }
        }

        self.restart = self.failure.is_some();
        if let Some(err) = self.failure {
            self.restarts += 1;
            tracing::warn!(
                generation = self.generation,
                restarts = self.restarts,
                "{err}; restarting at the best permutation"
            );
            match &self.incumbent {
                Some(best) => self.model.set_degenerate(best.permutation()),
                None => self.model.set_uniform(),
            }
        }
        self.phase = Phase::AdaptationUpdate;
    }

    fn adapt(&mut self) {
        if let Some(step_size) = &mut self.step_size {
            self.alpha = step_size.update(self.alpha, &self.delta, self.restart);
        }
        if let Some(batch_size) = &self.batch_size {
            let lambda = batch_size.update(self.model.entropy(), self.model.len(), self.restart);
            if lambda != self.lambda {
                self.lambda = lambda;
                self.utility.resize(lambda);
            }
        }
        tracing::trace!(
            generation = self.generation,
            lambda = self.lambda,
            alpha = self.alpha,
            entropy = self.model.entropy(),
            "adapted"
        );
        self.phase = Phase::Sampling;
    }

    fn record(&self) -> GenerationRecord {
        let mode_score = self.objective.evaluate(&self.model.mode());
        GenerationRecord {
            algorithm: self.algorithm,
            lambda: self.lambda,
            alpha: self.alpha,
            generation: self.generation,
            mode_score,
            entropy: self.model.entropy(),
            max_prob: self.model.max_prob(),
            best_score: self.incumbent.as_ref().map_or(i64::MIN, Incumbent::score),
            restarts: self.restarts,
        }
    }
}

#[cfg(test)]
mod tests {
    use permuta_lop::LopInstance;
    use permuta_model::{BradleyTerry, PlackettLuce};
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;

    fn identity_cost(n: usize) -> LopInstance {
        let costs = (0..n * n)
            .map(|k| i64::from(k / n < k % n))
            .collect::<Vec<_>>();
        LopInstance::new(n, costs, i64::try_from(n * (n - 1) / 2).ok()).unwrap()
    }

    fn plain_config() -> SearchConfig {
        SearchConfig {
            algorithm: Algorithm::Pl,
            alpha: 0.1,
            lambda: 20,
            max_evaluations: Some(25_000),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_plain_gradient_finds_identity() {
        let instance = identity_cost(5);
        let mut rng = Pcg64::seed_from_u64(42);
        let mut search = GradientSearch::new(PlackettLuce::new(5), &instance, &plain_config());
        let outcome = search.run(&mut rng, |_| {}).unwrap();
        assert_eq!(outcome.best_score, 10);
        assert_eq!(outcome.best, Permutation::identity(5));
        assert_eq!(outcome.evaluations, 25_000);
        assert_eq!(search.model().mode(), Permutation::identity(5));
        assert!(search.phase().is_terminated());
    }

    #[test]
    fn test_phases_cycle_in_order() {
        let instance = identity_cost(4);
        let mut rng = Pcg64::seed_from_u64(1);
        let mut search = GradientSearch::new(PlackettLuce::new(4), &instance, &plain_config());
        let expected = [
            Phase::GradientComputation,
            Phase::ModelUpdate,
            Phase::AdaptationUpdate,
            Phase::Sampling,
            Phase::GradientComputation,
        ];
        for phase in expected {
            search.step(&mut rng);
            assert_eq!(search.phase(), phase);
        }
        assert_eq!(search.generation(), 2);
        assert_eq!(search.budget().used(), 40);
    }

    #[test]
    fn test_gradient_failure_restarts_at_incumbent() {
        let instance = identity_cost(3);
        let mut model = PlackettLuce::new(3);
        model
            .log_weights_mut()
            .copy_from_slice(&[0.0, -1000.0, -1000.0]);
        model.update_derived_state();
        let mut rng = Pcg64::seed_from_u64(3);
        let mut search = GradientSearch::new(model, &instance, &plain_config());

        search.step(&mut rng); // sampling
        search.step(&mut rng); // gradient
        search.step(&mut rng); // update
        assert_eq!(search.restarts(), 1);

        let mut expected = PlackettLuce::new(3);
        expected.set_degenerate(search.best().unwrap().permutation());
        assert_eq!(search.model().weights(), expected.weights());
    }

    #[test]
    fn test_singular_fisher_restarts_natural_search() {
        // at the uniform two-item model every gradient is ±(0.5, -0.5), so F is exactly singular
        let instance = identity_cost(2);
        let config = SearchConfig {
            algorithm: Algorithm::Plnsa,
            alpha: 0.2,
            lambda: 10,
            lower_lambda: 10,
            upper_lambda: 50,
            max_evaluations: Some(500),
            ..SearchConfig::default()
        };
        let mut rng = Pcg64::seed_from_u64(8);
        let mut search = GradientSearch::new(PlackettLuce::new(2), &instance, &config);

        search.step(&mut rng); // sampling
        search.step(&mut rng); // gradient
        assert_eq!(search.failure, Some(NumericalError::SingularFisher));
        search.step(&mut rng); // update
        assert_eq!(search.restarts(), 1);
        let mut expected = PlackettLuce::new(2);
        expected.set_degenerate(search.best().unwrap().permutation());
        assert_eq!(search.model().weights(), expected.weights());
        search.step(&mut rng); // adaptation
        assert_eq!(search.alpha(), 0.2);
        assert_eq!(search.lambda(), 10);
        assert!(search.phase().is_sampling());

        let outcome = search.run(&mut rng, |_| {}).unwrap();
        assert!(outcome.restarts >= 1);
        assert_eq!(outcome.evaluations, 500);
        assert_eq!(outcome.best_score, 1);
        assert!(search.phase().is_terminated());
    }

    #[test]
    fn test_restart_resets_adapted_parameters() {
        let instance = identity_cost(3);
        let mut model = PlackettLuce::new(3);
        model
            .log_weights_mut()
            .copy_from_slice(&[0.0, -1000.0, -1000.0]);
        model.update_derived_state();
        let config = SearchConfig {
            algorithm: Algorithm::Plsa,
            alpha: 0.2,
            lambda: 30,
            lower_lambda: 10,
            upper_lambda: 50,
            max_evaluations: Some(1000),
            ..SearchConfig::default()
        };
        let mut rng = Pcg64::seed_from_u64(5);
        let mut search = GradientSearch::new(model, &instance, &config);
        for _ in 0..4 {
            search.step(&mut rng);
        }
        assert_eq!(search.restarts(), 1);
        assert_eq!(search.alpha(), 0.2);
        assert_eq!(search.lambda(), 30);
        assert!(search.phase().is_sampling());
    }

    #[test]
    fn test_records_are_emitted_at_interval() {
        let instance = identity_cost(4);
        let config = SearchConfig {
            print_interval: 10,
            max_evaluations: Some(20 * 35),
            ..plain_config()
        };
        let mut rng = Pcg64::seed_from_u64(9);
        let mut search = GradientSearch::new(PlackettLuce::new(4), &instance, &config);
        let mut generations = vec![];
        search.run(&mut rng, |record| {
            assert_eq!(record.algorithm, Algorithm::Pl);
            generations.push(record.generation);
        });
        // the last generation only samples
        assert_eq!(generations, vec![1, 10, 20, 30]);
        assert_eq!(search.generation(), 35);
    }

    #[test]
    fn test_partial_last_batch_respects_budget() {
        let instance = identity_cost(4);
        let config = SearchConfig {
            lambda: 30,
            max_evaluations: Some(100),
            ..plain_config()
        };
        let mut rng = Pcg64::seed_from_u64(2);
        let mut search = GradientSearch::new(PlackettLuce::new(4), &instance, &config);
        let outcome = search.run(&mut rng, |_| {}).unwrap();
        assert_eq!(outcome.evaluations, 100);
        assert_eq!(outcome.generations, 4);
        assert!(outcome.best_evaluation <= 100);
    }

    #[test]
    fn test_every_gradient_variant_solves_small_instance() {
        let instance = identity_cost(5);
        for algorithm in Algorithm::ALL {
            let config = SearchConfig {
                algorithm,
                max_evaluations: Some(5000),
                ..SearchConfig::default()
            };
            let mut rng = Pcg64::seed_from_u64(17);
            let outcome = match algorithm.model_kind() {
                Some(crate::ModelKind::PlackettLuce) => {
                    GradientSearch::new(PlackettLuce::new(5), &instance, &config)
                        .run(&mut rng, |_| {})
                }
                Some(crate::ModelKind::BradleyTerry) => {
                    GradientSearch::new(BradleyTerry::new(5), &instance, &config)
                        .run(&mut rng, |_| {})
                }
                None => continue,
            }
            .unwrap();
            assert_eq!(outcome.best_score, 10, "{algorithm}");
            assert_eq!(outcome.evaluations, 5000, "{algorithm}");
            assert!(outcome.lambda >= 1, "{algorithm}");
        }
    }

    #[test]
    fn test_empty_budget_yields_nothing() {
        let instance = identity_cost(3);
        let config = SearchConfig {
            max_evaluations: Some(0),
            ..plain_config()
        };
        let mut rng = Pcg64::seed_from_u64(0);
        let mut search = GradientSearch::new(PlackettLuce::new(3), &instance, &config);
        assert!(search.run(&mut rng, |_| {}).is_none());
        assert_eq!(search.generation(), 0);
    }
}
