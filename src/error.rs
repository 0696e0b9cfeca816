//! # Error Types
//!
//! This module defines the error type shared by the metaheuristic engine and the
//! operators it drives. Every error in this crate is fatal: it signals either an
//! invalid composition built by the caller (a missing phase heuristic, a karyotype
//! that does not cover the chromosome, an unregistered parameter) or a range
//! mismatch between a population and the heuristic configured for it. Nothing is
//! retried; the error propagates out of the generation step.
//!
//! ## Examples
//!
//! Using the `Result` type:
//!
//! ```rust
//! use metagenalg::error::{GeneticError, Result};
//!
//! fn some_function() -> Result<()> {
//!     // Function implementation
//!     Ok(())
//! }
//!
//! fn caller() {
//!     match some_function() {
//!         Ok(_) => println!("Success!"),
//!         Err(e) => println!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! Using the `OptionExt` trait to convert `Option` to `Result`:
//!
//! ```rust
//! use metagenalg::error::{GeneticError, OptionExt};
//!
//! fn find_best_candidate(candidates: &[i32]) -> metagenalg::error::Result<i32> {
//!     candidates.iter().max().cloned().ok_or_else_genetic(||
//!         GeneticError::EmptyPopulation
//!     )
//! }
//! ```

use thiserror::Error;

/// Represents errors that can occur while composing or running metaheuristics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneticError {
    /// An invalid configuration was provided.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A switch resolved an index for which no heuristic was registered.
    #[error("No phase heuristic for index {0}")]
    MissingPhaseHeuristic(String),

    /// The karyotype phase sizes do not add up to the chromosome length.
    #[error("Karyotype length mismatch: phases cover {expected} genes, chromosome has {actual}")]
    KaryotypeLength { expected: usize, actual: usize },

    /// A matching technique was used where it has no meaning.
    #[error("Unsupported matching technique {technique} for {usage}")]
    UnsupportedMatching { technique: String, usage: String },

    /// A heuristic was asked to perform an operation it cannot perform.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A parameter was referenced by name but never registered.
    #[error("Parameter '{0}' is not registered")]
    UnregisteredParameter(String),

    /// A parameter was resolved with a different value type than it produces.
    #[error("Parameter '{name}' does not produce values of type {expected}")]
    ParameterType { name: String, expected: &'static str },

    /// A population does not fit the capacity a heuristic was configured with.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// An empty population was encountered.
    #[error("Empty population error: Cannot operate on an empty population")]
    EmptyPopulation,

    /// A genetic operator failed.
    #[error("Operator error: {0}")]
    Operator(String),

    /// A fitness calculation failed.
    #[error("Fitness calculation error: {0}")]
    FitnessCalculation(String),
}

/// A specialized Result type for metaheuristic operations.
///
/// This type is a convenience wrapper around `std::result::Result` with the error type
/// fixed to `GeneticError`.
pub type Result<T> = std::result::Result<T, GeneticError>;

/// Extension trait for Option to convert to Result with a custom error.
///
/// ## Examples
///
/// ```rust
/// use metagenalg::error::{GeneticError, OptionExt};
///
/// fn first(values: &[u8]) -> metagenalg::error::Result<u8> {
///     values.first().copied().ok_or_else_genetic(|| GeneticError::EmptyPopulation)
/// }
/// ```
pub trait OptionExt<T> {
    /// Converts an Option to a Result using a closure to generate the error.
    fn ok_or_else_genetic<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> GeneticError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_else_genetic<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> GeneticError,
    {
        self.ok_or_else(err_fn)
    }
}
