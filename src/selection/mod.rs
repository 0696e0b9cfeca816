//! # Selection
//!
//! Selection operators choose the parents of the next offspring from the
//! chromosomes of a generation. Metaheuristics call them through
//! [`MetaHeuristic::select_parent_chromosomes`](crate::metaheuristics::MetaHeuristic::select_parent_chromosomes),
//! which decides which chromosomes (the whole population, an island, a karyotype
//! phase) the operator sees.

use std::fmt::Debug;

use crate::chromosome::Chromosome;
use crate::error::Result;
use crate::rng::RandomNumberGenerator;

pub mod elitist;
pub mod roulette;
pub mod tournament;

pub use elitist::EliteSelection;
pub use roulette::RouletteWheelSelection;
pub use tournament::TournamentSelection;

/// Trait for selection operators.
pub trait Selection<C: Chromosome>: Debug + Send + Sync {
    /// Selects `count` chromosomes among `chromosomes`.
    ///
    /// # Arguments
    ///
    /// * `count` - The number of chromosomes to select.
    /// * `chromosomes` - The chromosomes to select from.
    /// * `rng` - The random stream of the calling thread.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::EmptyPopulation` if there is nothing to select from,
    /// or an operator-specific error.
    fn select_chromosomes(
        &self,
        count: usize,
        chromosomes: &[C],
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<C>>;
}
