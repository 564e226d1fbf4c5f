//! Linear Ordering Problem instances.
//!
//! An instance is an `n × n` integer cost matrix. Placing item `a` anywhere before item `b`
//! earns `cost[a][b]`, so the score of a permutation is
//!
//! ```text
//! sum_{i < j} cost[x_i][x_j]
//! ```
//!
//! # File format
//!
//! Whitespace-separated tokens: `n`, then the `n²` matrix entries in row-major order, then an
//! optional known optimum. Files with a `.mat` extension start with a one-line header that is
//! skipped, and take their optimum from a sibling `.opt` file when one exists. Two `.opt`
//! layouts are understood:
//!
//! ```text
//! Value               : 3095130
//! BELGIUM T59B11XXB, optimum solution (value 245750)
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use permuta_model::Permutation;

use crate::{Objective, ScoreBounds};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum InstanceError {
    #[display("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[display("instance is empty (missing size)")]
    MissingSize,
    #[display("invalid instance size `{token}`")]
    InvalidSize { token: String },
    #[display("instance size must be positive")]
    EmptyMatrix,
    #[display("missing matrix entry {index} of {expected}")]
    MissingEntry { index: usize, expected: usize },
    #[display("invalid matrix entry {index}: `{token}`")]
    InvalidEntry {
        index: usize,
        token: String,
    },
    #[display("invalid known optimum `{token}`")]
    InvalidOptimum { token: String },
    #[display("unexpected trailing data `{token}`")]
    TrailingData { token: String },
    #[display("cost matrix has {len} entries, expected {size}²")]
    MatrixSize { size: usize, len: usize },
    #[display("unrecognised optimum file {}", path.display())]
    OptimumFile { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LopInstance {
    size: usize,
    costs: Vec<i64>,
    bounds: ScoreBounds,
    known_optimum: Option<i64>,
}

impl LopInstance {
    /// Builds an instance from a row-major cost matrix.
    pub fn new(
        size: usize,
        costs: Vec<i64>,
        known_optimum: Option<i64>,
    ) -> Result<Self, InstanceError> {
        if size == 0 {
            return Err(InstanceError::EmptyMatrix);
        }
        if costs.len() != size * size {
            return Err(InstanceError::MatrixSize {
                size,
                len: costs.len(),
            });
        }
        let bounds = compute_bounds(size, &costs);
        Ok(Self {
            size,
            costs,
            bounds,
            known_optimum,
        })
    }

    /// Reads an instance file, including the `.mat`/`.opt` variant.
    pub fn from_path<P>(path: P) -> Result<Self, InstanceError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let read = |path: &Path| {
            fs::read_to_string(path).map_err(|source| InstanceError::Io {
                path: path.to_owned(),
                source,
            })
        };
        let text = read(path)?;
        let is_mat = path.extension().is_some_and(|ext| ext == "mat");
        if !is_mat {
            return text.parse();
        }

        let body = text.split_once('\n').map_or("", |(_, rest)| rest);
        let mut instance = body.parse::<Self>()?;
        let opt_path = path.with_extension("opt");
        if opt_path.is_file() {
            let opt = read(&opt_path)?;
            let optimum = parse_optimum_file(&opt)
                .ok_or_else(|| InstanceError::OptimumFile { path: opt_path })?;
            instance.known_optimum = Some(optimum);
        }
        Ok(instance)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn cost(&self, i: usize, j: usize) -> i64 {
        self.costs[i * self.size + j]
    }

    #[must_use]
    pub fn bounds(&self) -> ScoreBounds {
        self.bounds
    }

    #[must_use]
    pub fn known_optimum(&self) -> Option<i64> {
        self.known_optimum
    }
}

/// Sums, over every unordered pair, the smaller and the larger of the two directed costs.
fn compute_bounds(size: usize, costs: &[i64]) -> ScoreBounds {
    let mut lower = 0;
    let mut upper = 0;
    for i in 0..size {
        for j in i + 1..size {
            let forward = costs[i * size + j];
            let backward = costs[j * size + i];
            lower += forward.min(backward);
            upper += forward.max(backward);
        }
    }
    ScoreBounds { lower, upper }
}

fn parse_optimum_file(text: &str) -> Option<i64> {
    let line = text.lines().next()?;
    if line.contains("optimum solution") {
        let start = line.find('(')? + 1;
        let end = start + line[start..].find(')')?;
        line[start..end].split_whitespace().nth(1)?.parse().ok()
    } else {
        line.split_once(':')?.1.trim().parse().ok()
    }
}

impl FromStr for LopInstance {
    type Err = InstanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let token = tokens.next().ok_or(InstanceError::MissingSize)?;
        let size = token
            .parse::<usize>()
            .map_err(|_| InstanceError::InvalidSize {
                token: token.to_owned(),
            })?;
        let expected = size
            .checked_mul(size)
            .ok_or_else(|| InstanceError::InvalidSize {
                token: token.to_owned(),
            })?;
        let mut costs = vec![];
        for index in 0..expected {
            let token = tokens
                .next()
                .ok_or(InstanceError::MissingEntry { index, expected })?;
            let cost = token.parse().map_err(|_| InstanceError::InvalidEntry {
                index,
                token: token.to_owned(),
            })?;
            costs.push(cost);
        }
        let known_optimum = tokens
            .next()
            .map(|token| {
                token.parse().map_err(|_| InstanceError::InvalidOptimum {
                    token: token.to_owned(),
                })
            })
            .transpose()?;
        if let Some(token) = tokens.next() {
            return Err(InstanceError::TrailingData {
                token: token.to_owned(),
            });
        }
        Self::new(size, costs, known_optimum)
    }
}

impl Objective for LopInstance {
    fn size(&self) -> usize {
        self.size
    }

    /// # Panics
    ///
    /// Panics if `x` has a different size than the instance.
    fn evaluate(&self, x: &Permutation) -> i64 {
        assert_eq!(x.len(), self.size, "permutation size mismatch");
        let x = x.as_slice();
        let mut score = 0;
        for (i, &a) in x.iter().enumerate() {
            let row = &self.costs[a * self.size..(a + 1) * self.size];
            for &b in &x[i + 1..] {
                score += row[b];
            }
        }
        score
    }

    fn bounds(&self) -> ScoreBounds {
        self.bounds
    }
}
