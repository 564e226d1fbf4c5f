use clap::{Parser, Subcommand};

use self::{info::InfoArg, run::RunArg};

mod info;
mod run;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Search an instance with a ranking-model algorithm
    Run(#[clap(flatten)] RunArg),
    /// Print the size, bounds and known optimum of an instance
    Info(#[clap(flatten)] InfoArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Run(arg) => run::run(&arg)?,
        Mode::Info(arg) => info::run(&arg)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn test_parse_run_options() {
        let args = CommandArgs::try_parse_from([
            "permuta",
            "run",
            "be75eec.mat",
            "--algorithm",
            "plnsa",
            "--utility",
            "normalizedFitness",
            "--seed",
            "5",
            "--fast-sampling",
        ])
        .unwrap();
        let Mode::Run(arg) = args.mode else {
            panic!("expected run mode");
        };
        let config = arg.search_config();
        assert_eq!(config.algorithm, permuta_search::Algorithm::Plnsa);
        assert_eq!(config.utility, permuta_search::UtilityKind::NormalizedFitness);
        assert_eq!(config.lambda, 100);
        assert_eq!(config.pl_sampler, permuta_model::PlackettLuceSampler::Gumbel);
        assert_eq!(config.max_evaluations, None);
    }

    #[test]
    fn test_unknown_values_are_usage_errors() {
        let err = CommandArgs::try_parse_from(["permuta", "run", "x", "--algorithm", "cma"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        let err = CommandArgs::try_parse_from(["permuta", "run", "x", "--runs", "0"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }
}
