//! Per-generation progress records.
//!
//! A record line holds, in this order: instance id, algorithm tag, lambda, alpha, generation,
//! score of the model's mode, model entropy, model max-probability, best score so far, seed,
//! restart count.

use crate::Algorithm;

/// Model and search state at one logged generation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GenerationRecord {
    pub algorithm: Algorithm,
    pub lambda: usize,
    pub alpha: f64,
    /// 1-based.
    pub generation: usize,
    pub mode_score: i64,
    pub entropy: f64,
    pub max_prob: f64,
    pub best_score: i64,
    pub restarts: usize,
}

/// Whether generation `generation` is logged at interval `interval`.
#[must_use]
pub fn is_record_generation(generation: usize, interval: usize) -> bool {
    interval > 0 && (generation == 1 || generation % interval == 0)
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum Delimiter {
    #[default]
    Semicolon,
    Comma,
}

impl Delimiter {
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::Semicolon => ';',
            Self::Comma => ',',
        }
    }
}

/// Renders records as delimited lines for one run.
#[derive(Debug, Clone)]
pub struct RecordFormatter {
    pub instance: String,
    pub seed: u64,
    pub delimiter: Delimiter,
}

impl RecordFormatter {
    #[must_use]
    pub fn format(&self, record: &GenerationRecord) -> String {
        let d = self.delimiter.as_char();
        let GenerationRecord {
            algorithm,
            lambda,
            alpha,
            generation,
            mode_score,
            entropy,
            max_prob,
            best_score,
            restarts,
        } = record;
        let instance = &self.instance;
        let seed = self.seed;
        format!(
            "{instance}{d}{algorithm}{d}{lambda}{d}{alpha}{d}{generation}{d}{mode_score}{d}\
             {entropy:.3}{d}{max_prob:.3}{d}{best_score}{d}{seed}{d}{restarts}"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> GenerationRecord {
        GenerationRecord {
            algorithm: Algorithm::Plsa,
            lambda: 20,
            alpha: 0.1,
            generation: 100,
            mode_score: 9,
            entropy: 1.5,
            max_prob: 0.25,
            best_score: 10,
            restarts: 2,
        }
    }

    #[test]
    fn test_format_semicolon_line() {
        let formatter = RecordFormatter {
            instance: "tiny".to_owned(),
            seed: 7,
            delimiter: Delimiter::Semicolon,
        };
        assert_eq!(
            formatter.format(&record()),
            "tiny;PLSA;20;0.1;100;9;1.500;0.250;10;7;2"
        );
    }

    #[test]
    fn test_format_comma_line() {
        let formatter = RecordFormatter {
            instance: "tiny".to_owned(),
            seed: 7,
            delimiter: "comma".parse().unwrap(),
        };
        assert_eq!(
            formatter.format(&record()),
            "tiny,PLSA,20,0.1,100,9,1.500,0.250,10,7,2"
        );
    }

    #[test]
    fn test_small_step_size_keeps_its_digits() {
        let formatter = RecordFormatter {
            instance: "tiny".to_owned(),
            seed: 7,
            delimiter: Delimiter::Semicolon,
        };
        let record = GenerationRecord {
            alpha: 1e-4,
            ..record()
        };
        let line = formatter.format(&record);
        assert_eq!(line.split(';').nth(3), Some("0.0001"));
    }

    #[test]
    fn test_record_generations() {
        assert!(is_record_generation(1, 100));
        assert!(!is_record_generation(2, 100));
        assert!(is_record_generation(200, 100));
        assert!(!is_record_generation(1, 0));
        assert!(is_record_generation(3, 1));
    }
}
