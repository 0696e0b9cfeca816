//! # Reinsertion
//!
//! Reinsertion operators decide which offspring and parents form the next
//! generation.

use std::fmt::Debug;

use crate::chromosome::Chromosome;
use crate::error::{GeneticError, Result};
use crate::population::{compare_fitness, PopulationView};
use crate::rng::RandomNumberGenerator;

/// Trait for reinsertion operators.
pub trait Reinsertion<C: Chromosome>: Debug + Send + Sync {
    /// Selects the chromosomes of the next generation.
    ///
    /// # Arguments
    ///
    /// * `population` - The population being evolved, for its size bounds.
    /// * `offspring` - The offspring produced by crossover and mutation.
    /// * `parents` - The parents selected for this generation.
    /// * `rng` - The random stream of the calling thread.
    fn select_chromosomes(
        &self,
        population: &dyn PopulationView<C>,
        offspring: Vec<C>,
        parents: Vec<C>,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<C>>;
}

/// Pure reinsertion: the offspring replace the parents.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct PureReinsertion;

impl<C: Chromosome> Reinsertion<C> for PureReinsertion {
    fn select_chromosomes(
        &self,
        _population: &dyn PopulationView<C>,
        offspring: Vec<C>,
        _parents: Vec<C>,
        _rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<C>> {
        Ok(offspring)
    }
}

/// Elitist reinsertion: when there are fewer offspring than the population's
/// minimum size, the fittest parents fill the gap.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct ElitistReinsertion;

impl<C: Chromosome> Reinsertion<C> for ElitistReinsertion {
    fn select_chromosomes(
        &self,
        population: &dyn PopulationView<C>,
        mut offspring: Vec<C>,
        mut parents: Vec<C>,
        _rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<C>> {
        let missing = population.min_size().saturating_sub(offspring.len());
        if missing > 0 {
            parents.sort_by(|a, b| compare_fitness(b, a));
            offspring.extend(parents.into_iter().take(missing));
        }
        Ok(offspring)
    }
}

/// Uniform reinsertion: when there are fewer offspring than the population's
/// minimum size, random offspring are duplicated to fill the gap.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct UniformReinsertion;

impl<C: Chromosome> Reinsertion<C> for UniformReinsertion {
    fn select_chromosomes(
        &self,
        population: &dyn PopulationView<C>,
        mut offspring: Vec<C>,
        _parents: Vec<C>,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<C>> {
        if offspring.is_empty() {
            return Err(GeneticError::Operator(
                "Uniform reinsertion needs at least one offspring".to_string(),
            ));
        }
        while offspring.len() < population.min_size() {
            let pick = rng.gen_range(0..offspring.len());
            offspring.push(offspring[pick].clone());
        }
        Ok(offspring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chromosome::BinaryChromosome;
    use crate::population::SubPopulation;

    fn chromosome(fitness: f64) -> BinaryChromosome {
        let mut c = BinaryChromosome::from_genes(vec![fitness > 1.0]);
        c.set_fitness(Some(fitness));
        c
    }

    fn reinsert<R: Reinsertion<BinaryChromosome>>(
        reinsertion: &R,
        min_size: usize,
        offspring: Vec<BinaryChromosome>,
        parents: Vec<BinaryChromosome>,
    ) -> Result<Vec<BinaryChromosome>> {
        let population = SubPopulation::new(1, (0..min_size).map(|i| chromosome(i as f64)).collect());
        let mut rng = RandomNumberGenerator::from_seed(1);
        reinsertion.select_chromosomes(&population, offspring, parents, &mut rng)
    }

    #[test]
    fn test_pure_reinsertion_keeps_offspring() {
        let result = reinsert(&PureReinsertion, 2, vec![chromosome(5.0)], vec![]).unwrap();
        assert_eq!(result, vec![chromosome(5.0)]);
    }

    #[test]
    fn test_elitist_reinsertion_fills_with_best_parents() {
        let result = reinsert(
            &ElitistReinsertion,
            4,
            vec![chromosome(0.5), chromosome(0.25)],
            vec![chromosome(1.0), chromosome(9.0), chromosome(3.0)],
        )
        .unwrap();
        let fitness: Vec<Option<f64>> = result.iter().map(|c| c.fitness()).collect();
        assert_eq!(fitness, vec![Some(0.5), Some(0.25), Some(9.0), Some(3.0)]);
    }

    #[test]
    fn test_uniform_reinsertion_fills_with_offspring() {
        let result = reinsert(&UniformReinsertion, 5, vec![chromosome(7.0)], vec![]).unwrap();
        assert_eq!(result.len(), 5);
        assert!(result.iter().all(|c| c.fitness() == Some(7.0)));

        assert!(reinsert(&UniformReinsertion, 5, vec![], vec![]).is_err());
    }
}
