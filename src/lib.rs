#[macro_use]
mod flags;

pub mod caching;
pub mod chromosome;
pub mod crossover;
pub mod error;
pub mod evolution;
pub mod fitness;
pub mod metaheuristics;
pub mod mutation;
pub mod population;
pub mod reinsertion;
pub mod rng;
pub mod selection;
pub mod termination;

// Re-export commonly used types for convenience
pub use error::{GeneticError, OptionExt, Result};
pub use evolution::{EvolutionOptions, LogLevel, MetaGeneticAlgorithm, MetaGeneticAlgorithmBuilder};
pub use metaheuristics::{EvolutionContext, EvolutionStage, MetaHeuristic, ParamScope, SharedHeuristic};
