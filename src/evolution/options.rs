//! # EvolutionOptions
//!
//! The `EvolutionOptions` struct holds the run-wide settings of a
//! [`MetaGeneticAlgorithm`](crate::evolution::MetaGeneticAlgorithm): the crossover and
//! mutation probabilities handed to the metaheuristic, the size above which the
//! driver parallelizes a stage, how much progress it logs, and an optional seed
//! for the random streams.
//!
//! Metaheuristics read these options through
//! [`EvolutionContext::options`](crate::metaheuristics::EvolutionContext::options).
//!
//! ## Example
//!
//! ```rust
//! use metagenalg::evolution::options::{EvolutionOptions, LogLevel};
//!
//! // Create a new EvolutionOptions instance with custom parameters
//! let custom_options = EvolutionOptions::new(0.9, 0.05, LogLevel::Minimal);
//!
//! // Create a new EvolutionOptions instance with default parameters
//! let default_options = EvolutionOptions::default();
//! assert_eq!(default_options.get_parallel_threshold(), 1000);
//! ```
//!
//! ## Structs
//!
//! ### `EvolutionOptions`
//!
//! #### Fields
//!
//! - `crossover_probability`: The probability handed to the crossover stage.
//! - `mutation_probability`: The probability handed to the mutation stage.
//! - `log_level`: The logging level of the driver, represented by the `LogLevel` enum.
//! - `parallel_threshold`: The minimum number of items to process in parallel.
//! - `seed`: The base seed of the random streams, if the run should be reproducible.
//!
//! ### `LogLevel`
//!
//! - `Verbose`: Logs every generation with its best chromosome.
//! - `Minimal`: Logs one line per generation.
//! - `None`: Disables progress logging.

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Verbose,
    Minimal,
    #[default]
    None,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionOptions {
    crossover_probability: f32,
    mutation_probability: f32,
    log_level: LogLevel,
    /// Minimum number of items to process in parallel
    parallel_threshold: usize,
    seed: Option<u64>,
}

const DEFAULT_CROSSOVER_PROBABILITY: f32 = 0.75;
const DEFAULT_MUTATION_PROBABILITY: f32 = 0.1;
const DEFAULT_PARALLEL_THRESHOLD: usize = 1000;

impl EvolutionOptions {
    /// Creates options with the given probabilities and log level, no seed and the
    /// default parallel threshold.
    pub fn new(crossover_probability: f32, mutation_probability: f32, log_level: LogLevel) -> Self {
        Self {
            crossover_probability,
            mutation_probability,
            log_level,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            seed: None,
        }
    }

    pub fn get_crossover_probability(&self) -> f32 {
        self.crossover_probability
    }

    pub fn get_mutation_probability(&self) -> f32 {
        self.mutation_probability
    }

    pub fn get_log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Returns the minimum number of items to process in parallel.
    pub fn get_parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    pub fn get_seed(&self) -> Option<u64> {
        self.seed
    }

    /// Sets the crossover probability.
    pub fn set_crossover_probability(&mut self, probability: f32) {
        self.crossover_probability = probability;
    }

    /// Sets the mutation probability.
    pub fn set_mutation_probability(&mut self, probability: f32) {
        self.mutation_probability = probability;
    }

    /// Sets the log level.
    pub fn set_log_level(&mut self, log_level: LogLevel) {
        self.log_level = log_level;
    }

    /// Sets the parallel threshold.
    pub fn set_parallel_threshold(&mut self, threshold: usize) {
        self.parallel_threshold = threshold;
    }

    /// Sets the seed of the random streams.
    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.seed = seed;
    }

    /// Returns a builder for creating an `EvolutionOptions` instance.
    ///
    /// # Example
    ///
    /// ```rust
    /// use metagenalg::evolution::options::{EvolutionOptions, LogLevel};
    ///
    /// let options = EvolutionOptions::builder()
    ///     .crossover_probability(0.9)
    ///     .mutation_probability(0.02)
    ///     .log_level(LogLevel::Minimal)
    ///     .parallel_threshold(500)
    ///     .seed(42)
    ///     .build();
    /// assert_eq!(options.get_seed(), Some(42));
    /// ```
    pub fn builder() -> EvolutionOptionsBuilder {
        EvolutionOptionsBuilder::default()
    }
}

impl Default for EvolutionOptions {
    fn default() -> Self {
        Self::new(
            DEFAULT_CROSSOVER_PROBABILITY,
            DEFAULT_MUTATION_PROBABILITY,
            LogLevel::None,
        )
    }
}

/// Builder for `EvolutionOptions`.
///
/// Provides a fluent interface for constructing `EvolutionOptions` instances.
#[derive(Debug, Clone, Default)]
pub struct EvolutionOptionsBuilder {
    crossover_probability: Option<f32>,
    mutation_probability: Option<f32>,
    log_level: Option<LogLevel>,
    parallel_threshold: Option<usize>,
    seed: Option<u64>,
}

impl EvolutionOptionsBuilder {
    /// Sets the crossover probability.
    pub fn crossover_probability(mut self, value: f32) -> Self {
        self.crossover_probability = Some(value);
        self
    }

    /// Sets the mutation probability.
    pub fn mutation_probability(mut self, value: f32) -> Self {
        self.mutation_probability = Some(value);
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, value: LogLevel) -> Self {
        self.log_level = Some(value);
        self
    }

    /// Sets the parallel threshold.
    pub fn parallel_threshold(mut self, value: usize) -> Self {
        self.parallel_threshold = Some(value);
        self
    }

    /// Sets the seed of the random streams.
    pub fn seed(mut self, value: u64) -> Self {
        self.seed = Some(value);
        self
    }

    /// Builds the `EvolutionOptions` instance.
    pub fn build(self) -> EvolutionOptions {
        EvolutionOptions {
            crossover_probability: self
                .crossover_probability
                .unwrap_or(DEFAULT_CROSSOVER_PROBABILITY),
            mutation_probability: self
                .mutation_probability
                .unwrap_or(DEFAULT_MUTATION_PROBABILITY),
            log_level: self.log_level.unwrap_or_default(),
            parallel_threshold: self
                .parallel_threshold
                .unwrap_or(DEFAULT_PARALLEL_THRESHOLD),
            seed: self.seed,
        }
    }
}
