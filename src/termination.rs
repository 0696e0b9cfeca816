//! # Termination
//!
//! Termination criteria decide when a run stops. They are checked by the driver
//! after every generation.

use std::fmt::Debug;

use crate::chromosome::Chromosome;
use crate::population::PopulationView;

/// Trait for termination criteria.
pub trait Termination<C: Chromosome>: Debug + Send + Sync {
    /// Returns `true` when the run should stop.
    fn has_reached(&self, population: &dyn PopulationView<C>) -> bool;
}

/// Stops once the population reaches a generation number.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationNumberTermination {
    expected_generation_number: usize,
}

impl GenerationNumberTermination {
    pub fn new(expected_generation_number: usize) -> Self {
        Self {
            expected_generation_number,
        }
    }
}

impl Default for GenerationNumberTermination {
    fn default() -> Self {
        Self::new(100)
    }
}

impl<C: Chromosome> Termination<C> for GenerationNumberTermination {
    fn has_reached(&self, population: &dyn PopulationView<C>) -> bool {
        population.generation_number() >= self.expected_generation_number
    }
}

/// Stops once the best chromosome reaches a fitness.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitnessThresholdTermination {
    expected_fitness: f64,
}

impl FitnessThresholdTermination {
    pub fn new(expected_fitness: f64) -> Self {
        Self { expected_fitness }
    }
}

impl<C: Chromosome> Termination<C> for FitnessThresholdTermination {
    fn has_reached(&self, population: &dyn PopulationView<C>) -> bool {
        population
            .best_chromosome()
            .and_then(|best| best.fitness())
            .is_some_and(|fitness| fitness >= self.expected_fitness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chromosome::BinaryChromosome;
    use crate::population::SubPopulation;

    fn reached<T: Termination<BinaryChromosome>>(
        termination: &T,
        population: &SubPopulation<BinaryChromosome>,
    ) -> bool {
        termination.has_reached(population)
    }

    #[test]
    fn test_generation_number_termination() {
        let chromosomes = vec![BinaryChromosome::from_genes(vec![true]); 2];
        let termination = GenerationNumberTermination::new(3);
        assert!(!reached(&termination, &SubPopulation::new(2, chromosomes.clone())));
        assert!(reached(&termination, &SubPopulation::new(3, chromosomes)));
    }

    #[test]
    fn test_fitness_threshold_termination() {
        let mut best = BinaryChromosome::from_genes(vec![true]);
        let termination = FitnessThresholdTermination::new(1.0);
        assert!(!reached(&termination, &SubPopulation::new(1, vec![best.clone()])));

        best.set_fitness(Some(1.0));
        assert!(reached(&termination, &SubPopulation::new(1, vec![best])));
    }
}
