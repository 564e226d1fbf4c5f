//! Summary statistics for batches of objective values.
//!
//! The search crates use this to describe the fitness of a generation in diagnostic logs, and
//! the command line uses it to summarise the best fitness over repeated runs.
//!
//! # Modules
//!
//! - [`descriptive`]: min, max, mean, median, variance and standard deviation of a dataset
//!
//! # Examples
//!
//! ```
//! use permuta_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```

pub mod descriptive;
