pub mod algorithm;
pub mod builder;
pub mod options;

pub use algorithm::MetaGeneticAlgorithm;
pub use builder::MetaGeneticAlgorithmBuilder;
pub use options::{EvolutionOptions, EvolutionOptionsBuilder, LogLevel};
