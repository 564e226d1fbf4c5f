use std::{io, path::PathBuf, time::Instant};

use anyhow::Context as _;
use chrono::Utc;
use permuta_lop::LopInstance;
use permuta_model::{PlackettLuceSampler, bradley_terry};
use permuta_search::{
    Algorithm, Delimiter, RecordFormatter, SearchConfig, UtilityKind,
    algorithm::{
        DEFAULT_ALPHA, DEFAULT_LAMBDA, DEFAULT_LOWER_ALPHA, DEFAULT_LOWER_LAMBDA,
        DEFAULT_PRINT_INTERVAL, DEFAULT_UPPER_ALPHA, DEFAULT_UPPER_LAMBDA,
    },
};
use rand::SeedableRng as _;
use rand_pcg::Pcg64;

use crate::{
    schema::summary::{RunReport, RunSummary},
    util::{self, Output},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct RunArg {
    /// LOP instance file (`.mat` files pick up a sibling `.opt`)
    instance: PathBuf,
    #[arg(long, default_value = "pl")]
    algorithm: Algorithm,
    /// Fitness shaping: fitness, normalizedFitness, superlinear, linear or equal
    #[arg(long, default_value = "superlinear")]
    utility: UtilityKind,
    /// Initial batch size
    #[arg(long, default_value_t = DEFAULT_LAMBDA)]
    lambda: usize,
    /// Initial step size
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    alpha: f64,
    #[arg(long, default_value_t = DEFAULT_LOWER_ALPHA)]
    lower_alpha: f64,
    #[arg(long, default_value_t = DEFAULT_UPPER_ALPHA)]
    upper_alpha: f64,
    #[arg(long, default_value_t = DEFAULT_LOWER_LAMBDA)]
    lower_lambda: usize,
    #[arg(long, default_value_t = DEFAULT_UPPER_LAMBDA)]
    upper_lambda: usize,
    /// Emit a record every this many generations (0 disables records)
    #[arg(long, default_value_t = DEFAULT_PRINT_INTERVAL)]
    print_interval: usize,
    /// Random seed; drawn from the OS when absent
    #[arg(long)]
    seed: Option<u64>,
    /// Evaluation budget [default: 1000 * n^2]
    #[arg(long)]
    max_evaluations: Option<usize>,
    /// Gibbs sweeps per Bradley-Terry sample
    #[arg(long, default_value_t = bradley_terry::DEFAULT_MAX_ITERATIONS)]
    bt_sampling_iterations: usize,
    /// Sample Plackett-Luce orderings with Gumbel keys instead of roulette selection
    #[arg(long)]
    fast_sampling: bool,
    #[arg(long, default_value = "semicolon")]
    delimiter: Delimiter,
    /// Record output file path [default: stdout]
    #[arg(long)]
    output: Option<PathBuf>,
    /// Write run summaries as JSON to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,
    /// Repeat the search with consecutive seeds
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    runs: u64,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

impl RunArg {
    pub(super) fn search_config(&self) -> SearchConfig {
        SearchConfig {
            algorithm: self.algorithm,
            utility: self.utility,
            lambda: self.lambda,
            alpha: self.alpha,
            lower_alpha: self.lower_alpha,
            upper_alpha: self.upper_alpha,
            lower_lambda: self.lower_lambda,
            upper_lambda: self.upper_lambda,
            print_interval: self.print_interval,
            max_evaluations: self.max_evaluations,
            bt_sampling_iterations: self.bt_sampling_iterations,
            pl_sampler: if self.fast_sampling {
                PlackettLuceSampler::Gumbel
            } else {
                PlackettLuceSampler::Roulette
            },
        }
    }
}

pub(crate) fn run(arg: &RunArg) -> anyhow::Result<()> {
    util::init_tracing(arg.verbose);

    let instance = util::read_instance_file(&arg.instance)?;
    let instance_id = util::instance_id(&arg.instance);
    let config = arg.search_config();
    config
        .validate()
        .context("Invalid search configuration")?;

    let base_seed = match arg.seed {
        Some(seed) => seed,
        None => {
            let seed = rand::random();
            tracing::info!(seed, "no seed given, drew one from the OS");
            seed
        }
    };

    let mut output = Output::from_output_path(arg.output.clone())?;
    let mut summaries = vec![];
    for run_index in 0..arg.runs {
        let seed = base_seed.wrapping_add(run_index);
        let summary = search_once(
            &instance,
            &instance_id,
            &config,
            seed,
            arg.delimiter,
            &mut output,
        )
        .with_context(|| format!("Run with seed {seed} failed"))?;
        summaries.push(summary);
    }
    output.finish()?;

    let report = RunReport::new(summaries);
    if let Some(stats) = report.best_fitness.as_ref().filter(|_| arg.runs > 1) {
        tracing::info!(
            runs = stats.count,
            min = stats.min,
            max = stats.max,
            mean = stats.mean,
            median = stats.median,
            std_dev = stats.std_dev,
            "best fitness over runs"
        );
        eprintln!("Best fitness over {} runs:", stats.count);
        eprintln!("  Min:    {:.0}", stats.min);
        eprintln!("  Max:    {:.0}", stats.max);
        eprintln!("  Mean:   {:.3}", stats.mean);
        eprintln!("  Median: {:.0}", stats.median);
        eprintln!("  Stddev: {:.3}", stats.std_dev);
    }

    if let Some(path) = &arg.summary_json {
        Output::save_json(&report, Some(path.clone()))?;
        eprintln!("Summary saved to {}", path.display());
    }

    Ok(())
}

/// Runs one seeded search, writing its records and then its summary line to `out`.
fn search_once<W>(
    instance: &LopInstance,
    instance_id: &str,
    config: &SearchConfig,
    seed: u64,
    delimiter: Delimiter,
    out: &mut W,
) -> anyhow::Result<RunSummary>
where
    W: io::Write,
{
    let formatter = RecordFormatter {
        instance: instance_id.to_owned(),
        seed,
        delimiter,
    };
    let mut rng = Pcg64::seed_from_u64(seed);
    let start = Instant::now();

    let mut write_result = Ok(());
    let outcome = permuta_search::run(config, instance, &mut rng, |record| {
        if write_result.is_ok() {
            write_result = writeln!(out, "{}", formatter.format(record));
        }
    })?;
    write_result?;
    let elapsed = start.elapsed();

    let summary = RunSummary {
        instance: instance_id.to_owned(),
        seed,
        algorithm: config.algorithm,
        lambda: config.lambda,
        alpha: config.alpha,
        best_fitness: outcome.best_score,
        best_evaluation: outcome.best_evaluation,
        elapsed_secs: elapsed.as_secs_f64(),
        best_permutation: outcome.best.as_slice().to_vec(),
        known_optimum: instance.known_optimum(),
        evaluations: outcome.evaluations,
        generations: outcome.generations,
        restarts: outcome.restarts,
        final_lambda: outcome.lambda,
        final_alpha: outcome.alpha,
        finished_at: Utc::now(),
    };
    writeln!(out, "{}", summary.to_line(delimiter))?;
    if let Some(optimum) = summary.known_optimum {
        tracing::info!(
            seed,
            best = summary.best_fitness,
            optimum,
            gap = optimum - summary.best_fitness,
            "run finished"
        );
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_once_writes_records_then_summary() {
        let instance = "4\n0 1 1 1\n0 0 1 1\n0 0 0 1\n0 0 0 0\n6\n"
            .parse::<LopInstance>()
            .unwrap();
        let config = SearchConfig {
            algorithm: Algorithm::Plsa,
            max_evaluations: Some(2000),
            print_interval: 10,
            ..SearchConfig::default()
        };
        let mut out = vec![];
        let summary =
            search_once(&instance, "tiny", &config, 3, Delimiter::Semicolon, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();

        assert!(lines.len() >= 2);
        assert!(lines[0].starts_with("tiny;PLSA;100;0.01;1;"));
        assert!(lines[..lines.len() - 1].iter().all(|l| l.split(';').count() == 11));
        assert!(lines[lines.len() - 1].starts_with("tiny;3;PLSA;100;0.01;6;"));

        assert_eq!(summary.best_fitness, 6);
        assert_eq!(summary.known_optimum, Some(6));
        assert_eq!(summary.evaluations, 2000);
        assert_eq!(summary.best_permutation, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_same_seed_gives_same_output() {
        let instance = "3\n0 4 1\n0 0 2\n3 0 0\n".parse::<LopInstance>().unwrap();
        let config = SearchConfig {
            algorithm: Algorithm::Bt,
            max_evaluations: Some(300),
            print_interval: 1,
            ..SearchConfig::default()
        };
        let records = |seed| {
            let mut out = vec![];
            search_once(&instance, "t", &config, seed, Delimiter::Comma, &mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            // the summary line carries the elapsed time
            text.lines().rev().skip(1).map(str::to_owned).collect::<Vec<_>>()
        };
        assert_eq!(records(9), records(9));
    }
}
