//! The algorithm registry and the search configuration.

use permuta_model::PlackettLuceSampler;

use crate::utility::UtilityKind;

/// Which ranking model a gradient variant drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum ModelKind {
    PlackettLuce,
    BradleyTerry,
}

/// Search algorithms.
///
/// The gradient variants share one generation loop and differ only in which of natural
/// gradient, step-size adaptation and batch-size adaptation is active. `Pleda` is the
/// population-based estimation-of-distribution variant.
#[derive(
    Default,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    derive_more::FromStr,
    derive_more::Display,
    serde::Serialize,
)]
pub enum Algorithm {
    /// Plain gradient ascent.
    #[default]
    #[display("PL")]
    #[serde(rename = "PL")]
    Pl,
    /// Natural-gradient ascent.
    #[display("PLN")]
    #[serde(rename = "PLN")]
    Pln,
    /// Self-adapting step size.
    #[display("PLSL")]
    #[serde(rename = "PLSL")]
    Plsl,
    /// Self-adapting batch size.
    #[display("PLSS")]
    #[serde(rename = "PLSS")]
    Plss,
    /// Self-adapting step size and batch size.
    #[display("PLSA")]
    #[serde(rename = "PLSA")]
    Plsa,
    /// Natural gradient with self-adapting step size and batch size.
    #[display("PLNSA")]
    #[serde(rename = "PLNSA")]
    Plnsa,
    /// Plain gradient ascent on the Bradley-Terry model.
    #[display("BT")]
    #[serde(rename = "BT")]
    Bt,
    /// Estimation of distribution with MM-learned Plackett-Luce models.
    #[display("PLEDA")]
    #[serde(rename = "PLEDA")]
    Pleda,
}

impl Algorithm {
    pub const ALL: [Self; 8] = [
        Self::Pl,
        Self::Pln,
        Self::Plsl,
        Self::Plss,
        Self::Plsa,
        Self::Plnsa,
        Self::Bt,
        Self::Pleda,
    ];

    /// `None` for the population-based variant.
    #[must_use]
    pub fn model_kind(self) -> Option<ModelKind> {
        match self {
            Self::Bt => Some(ModelKind::BradleyTerry),
            Self::Pleda => None,
            _ => Some(ModelKind::PlackettLuce),
        }
    }

    #[must_use]
    pub fn uses_natural_gradient(self) -> bool {
        matches!(self, Self::Pln | Self::Plnsa)
    }

    #[must_use]
    pub fn adapts_step_size(self) -> bool {
        matches!(self, Self::Plsl | Self::Plsa | Self::Plnsa)
    }

    #[must_use]
    pub fn adapts_batch_size(self) -> bool {
        matches!(self, Self::Plss | Self::Plsa | Self::Plnsa)
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("batch size must be at least 1")]
    ZeroLambda,
    #[display("step size {alpha} must be positive and finite")]
    InvalidAlpha { alpha: f64 },
    #[display("step size {alpha} is outside [{lower}, {upper}]")]
    AlphaOutOfBounds { alpha: f64, lower: f64, upper: f64 },
    #[display("batch size {lambda} is outside [{lower}, {upper}]")]
    LambdaOutOfBounds {
        lambda: usize,
        lower: usize,
        upper: usize,
    },
    #[display("evaluation budget must be at least 1")]
    ZeroBudget,
    #[display("problem size must be positive")]
    EmptyProblem,
}

pub const DEFAULT_LAMBDA: usize = 100;
pub const DEFAULT_ALPHA: f64 = 0.01;
pub const DEFAULT_LOWER_ALPHA: f64 = 1e-4;
pub const DEFAULT_UPPER_ALPHA: f64 = 0.9;
pub const DEFAULT_LOWER_LAMBDA: usize = 10;
pub const DEFAULT_UPPER_LAMBDA: usize = 1000;
pub const DEFAULT_PRINT_INTERVAL: usize = 100;

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub algorithm: Algorithm,
    pub utility: UtilityKind,
    /// Initial batch size.
    pub lambda: usize,
    /// Initial step size.
    pub alpha: f64,
    pub lower_alpha: f64,
    pub upper_alpha: f64,
    pub lower_lambda: usize,
    pub upper_lambda: usize,
    /// Emit a record on generation 1 and every `print_interval` generations. 0 disables.
    pub print_interval: usize,
    /// `None` means `1000 · n²`.
    pub max_evaluations: Option<usize>,
    pub bt_sampling_iterations: usize,
    pub pl_sampler: PlackettLuceSampler,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            utility: UtilityKind::default(),
            lambda: DEFAULT_LAMBDA,
            alpha: DEFAULT_ALPHA,
            lower_alpha: DEFAULT_LOWER_ALPHA,
            upper_alpha: DEFAULT_UPPER_ALPHA,
            lower_lambda: DEFAULT_LOWER_LAMBDA,
            upper_lambda: DEFAULT_UPPER_LAMBDA,
            print_interval: DEFAULT_PRINT_INTERVAL,
            max_evaluations: None,
            bt_sampling_iterations: permuta_model::bradley_terry::DEFAULT_MAX_ITERATIONS,
            pl_sampler: PlackettLuceSampler::default(),
        }
    }
}

impl SearchConfig {
    /// Checks the settings the chosen algorithm actually reads.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_evaluations == Some(0) {
            return Err(ConfigError::ZeroBudget);
        }
        if self.algorithm == Algorithm::Pleda {
            return Ok(());
        }
        if self.lambda == 0 {
            return Err(ConfigError::ZeroLambda);
        }
        if !(self.alpha > 0.0 && self.alpha.is_finite()) {
            return Err(ConfigError::InvalidAlpha { alpha: self.alpha });
        }
        if self.algorithm.adapts_step_size()
            && !(self.lower_alpha <= self.alpha && self.alpha <= self.upper_alpha)
        {
            return Err(ConfigError::AlphaOutOfBounds {
                alpha: self.alpha,
                lower: self.lower_alpha,
                upper: self.upper_alpha,
            });
        }
        if self.algorithm.adapts_batch_size()
            && !(1 <= self.lower_lambda
                && self.lower_lambda <= self.lambda
                && self.lambda <= self.upper_lambda)
        {
            return Err(ConfigError::LambdaOutOfBounds {
                lambda: self.lambda,
                lower: self.lower_lambda,
                upper: self.upper_lambda,
            });
        }
        Ok(())
    }

    /// The evaluation budget for a problem of size `n`.
    #[must_use]
    pub fn max_evaluations_for(&self, n: usize) -> usize {
        self.max_evaluations
            .unwrap_or_else(|| crate::EvaluationBudget::default_for(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_algorithm_tags() {
        for algorithm in Algorithm::ALL {
            let tag = algorithm.to_string();
            assert_eq!(tag.parse::<Algorithm>().unwrap(), algorithm);
            assert_eq!(tag.to_lowercase().parse::<Algorithm>().unwrap(), algorithm);
        }
        assert!("PLX".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_variant_flags() {
        assert!(!Algorithm::Pl.uses_natural_gradient());
        assert!(Algorithm::Plnsa.uses_natural_gradient());
        assert!(Algorithm::Plsl.adapts_step_size());
        assert!(!Algorithm::Plsl.adapts_batch_size());
        assert!(Algorithm::Plss.adapts_batch_size());
        assert!(!Algorithm::Plss.adapts_step_size());
        assert!(Algorithm::Plsa.adapts_step_size() && Algorithm::Plsa.adapts_batch_size());
        assert!(Algorithm::Bt.model_kind().unwrap().is_bradley_terry());
        assert!(Algorithm::Pln.model_kind().unwrap().is_plackett_luce());
        assert_eq!(Algorithm::Pleda.model_kind(), None);
    }

    #[test]
    fn test_default_config_is_valid() {
        for algorithm in Algorithm::ALL {
            let config = SearchConfig {
                algorithm,
                ..SearchConfig::default()
            };
            assert_eq!(config.validate(), Ok(()));
        }
        assert_eq!(SearchConfig::default().max_evaluations_for(5), 25_000);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let config = SearchConfig {
            lambda: 0,
            ..SearchConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroLambda));

        let config = SearchConfig {
            algorithm: Algorithm::Pleda,
            max_evaluations: Some(0),
            ..SearchConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroBudget));

        let config = SearchConfig {
            alpha: f64::NAN,
            ..SearchConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAlpha { .. })
        ));

        let config = SearchConfig {
            algorithm: Algorithm::Plsl,
            alpha: 2.0,
            ..SearchConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AlphaOutOfBounds { .. })
        ));

        // fixed-step variants ignore the alpha bounds
        let config = SearchConfig {
            algorithm: Algorithm::Pl,
            alpha: 2.0,
            ..SearchConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));

        let config = SearchConfig {
            algorithm: Algorithm::Plss,
            lambda: 5,
            ..SearchConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LambdaOutOfBounds { lambda: 5, .. })
        ));
    }
}
