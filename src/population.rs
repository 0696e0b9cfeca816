//! # Populations
//!
//! A [`Population`] owns the current generation of chromosomes and tracks the best
//! individual seen so far. Metaheuristics never see the population itself: they
//! work through the read-only [`PopulationView`] trait, which is also implemented by
//! [`SubPopulation`], the owned slice of chromosomes an island or a karyotype phase
//! evolves on its own.
//!
//! Generation numbers start at 1 with the initial generation.

use std::cmp::Ordering;

use crate::chromosome::Chromosome;
use crate::error::{GeneticError, Result};
use crate::rng::RandomNumberGenerator;

/// Read-only view of a population, as seen by an evolution context.
pub trait PopulationView<C: Chromosome>: Send + Sync {
    /// Returns the number of the current generation (1-based).
    fn generation_number(&self) -> usize;

    /// Returns the chromosomes of the current generation.
    fn chromosomes(&self) -> &[C];

    /// Returns the best chromosome tracked so far, if any.
    fn best_chromosome(&self) -> Option<&C>;

    /// Returns the minimum number of chromosomes in a generation.
    fn min_size(&self) -> usize;

    /// Returns the maximum number of chromosomes in a generation.
    fn max_size(&self) -> usize;
}

/// Orders two chromosomes by fitness, unevaluated ones first.
pub fn compare_fitness<C: Chromosome>(a: &C, b: &C) -> Ordering {
    match (a.fitness(), b.fitness()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or_else(|| {
            // NaN sorts below every number
            b.is_nan().cmp(&a.is_nan())
        }),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Returns the chromosome with the highest fitness, ignoring unevaluated ones.
pub fn fittest<C: Chromosome>(chromosomes: &[C]) -> Option<&C> {
    chromosomes
        .iter()
        .filter(|c| c.fitness().is_some())
        .max_by(|a, b| compare_fitness(*a, *b))
}

/// One generation of a population.
#[derive(Debug, Clone)]
pub struct Generation<C: Chromosome> {
    number: usize,
    chromosomes: Vec<C>,
    best_chromosome: Option<C>,
}

impl<C: Chromosome> Generation<C> {
    fn new(number: usize, chromosomes: Vec<C>) -> Result<Self> {
        if chromosomes.len() < 2 {
            return Err(GeneticError::OutOfRange(format!(
                "A generation should have at least 2 chromosomes, got {}",
                chromosomes.len()
            )));
        }
        Ok(Self {
            number,
            chromosomes,
            best_chromosome: None,
        })
    }

    /// Returns the generation number.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Returns the chromosomes of the generation.
    pub fn chromosomes(&self) -> &[C] {
        &self.chromosomes
    }

    /// Returns the best chromosome of the generation, once it has ended.
    pub fn best_chromosome(&self) -> Option<&C> {
        self.best_chromosome.as_ref()
    }
}

/// A population evolving through successive generations.
#[derive(Debug, Clone)]
pub struct Population<C: Chromosome> {
    min_size: usize,
    max_size: usize,
    adam: C,
    current: Option<Generation<C>>,
    best_chromosome: Option<C>,
}

impl<C: Chromosome> Population<C> {
    /// Creates a population whose chromosomes are shaped like `adam`.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if `min_size < 2` or `max_size < min_size`.
    pub fn new(min_size: usize, max_size: usize, adam: C) -> Result<Self> {
        if min_size < 2 {
            return Err(GeneticError::Configuration(
                "The minimum size for a population is 2 chromosomes".to_string(),
            ));
        }
        if max_size < min_size {
            return Err(GeneticError::Configuration(format!(
                "The maximum size ({}) must be greater than or equal to the minimum size ({})",
                max_size, min_size
            )));
        }
        Ok(Self {
            min_size,
            max_size,
            adam,
            current: None,
            best_chromosome: None,
        })
    }

    /// Returns the chromosome every individual is created from.
    pub fn adam(&self) -> &C {
        &self.adam
    }

    /// Returns the current generation, if the population has been initialised.
    pub fn current_generation(&self) -> Option<&Generation<C>> {
        self.current.as_ref()
    }

    /// Returns how many generations have been created.
    pub fn generations_number(&self) -> usize {
        self.current.as_ref().map_or(0, |g| g.number)
    }

    /// Creates the first generation from `min_size` fresh random individuals.
    pub fn create_initial_generation(&mut self, rng: &mut RandomNumberGenerator) -> Result<()> {
        let chromosomes = (0..self.min_size)
            .map(|_| self.adam.create_new(rng))
            .collect();
        self.current = Some(Generation::new(1, chromosomes)?);
        self.best_chromosome = None;
        Ok(())
    }

    /// Replaces the current generation with `chromosomes`.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::OutOfRange` if fewer than two chromosomes are given.
    pub fn create_new_generation(&mut self, chromosomes: Vec<C>) -> Result<()> {
        let number = self.generations_number() + 1;
        self.current = Some(Generation::new(number, chromosomes)?);
        Ok(())
    }

    /// Runs `evaluate` over the chromosomes of the current generation, letting it
    /// assign their fitness. Does nothing before the initial generation.
    pub fn evaluate_current_generation<F>(&mut self, evaluate: F) -> Result<()>
    where
        F: FnOnce(&mut [C]) -> Result<()>,
    {
        match self.current.as_mut() {
            Some(generation) => evaluate(&mut generation.chromosomes),
            None => Ok(()),
        }
    }

    /// Ends the current generation: orders its chromosomes by descending fitness,
    /// drops the least fit beyond `max_size`, records the generation's best, and
    /// updates the population's best chromosome.
    ///
    /// # Returns
    ///
    /// `true` when the population's best chromosome changed.
    pub fn end_current_generation(&mut self) -> bool {
        let Some(generation) = self.current.as_mut() else {
            return false;
        };
        generation
            .chromosomes
            .sort_by(|a, b| compare_fitness(b, a));
        generation.chromosomes.truncate(self.max_size);
        generation.best_chromosome = fittest(&generation.chromosomes).cloned();

        let improved = match (&generation.best_chromosome, &self.best_chromosome) {
            (Some(candidate), Some(best)) => compare_fitness(candidate, best) == Ordering::Greater,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if improved {
            self.best_chromosome = generation.best_chromosome.clone();
        }
        improved
    }
}

impl<C: Chromosome> PopulationView<C> for Population<C> {
    fn generation_number(&self) -> usize {
        self.generations_number()
    }

    fn chromosomes(&self) -> &[C] {
        match &self.current {
            Some(generation) => &generation.chromosomes,
            None => &[],
        }
    }

    fn best_chromosome(&self) -> Option<&C> {
        self.best_chromosome.as_ref()
    }

    fn min_size(&self) -> usize {
        self.min_size
    }

    fn max_size(&self) -> usize {
        self.max_size
    }
}

/// An owned slice of a population evolved on its own, such as an island or the
/// sub-chromosomes of one karyotype phase.
#[derive(Debug, Clone)]
pub struct SubPopulation<C: Chromosome> {
    generation_number: usize,
    chromosomes: Vec<C>,
    best_chromosome: Option<C>,
    migration_rates: Vec<f64>,
}

impl<C: Chromosome> SubPopulation<C> {
    /// Creates a sub-population and tracks its fittest chromosome.
    pub fn new(generation_number: usize, chromosomes: Vec<C>) -> Self {
        let best_chromosome = fittest(&chromosomes).cloned();
        Self {
            generation_number,
            chromosomes,
            best_chromosome,
            migration_rates: Vec::new(),
        }
    }

    /// Returns the number of chromosomes.
    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    /// Returns `true` when the sub-population holds no chromosome.
    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    /// Mutable access to the chromosomes. Call [`SubPopulation::refresh_best`]
    /// after structural changes.
    pub fn chromosomes_mut(&mut self) -> &mut Vec<C> {
        &mut self.chromosomes
    }

    /// Recomputes the tracked best chromosome.
    pub fn refresh_best(&mut self) {
        self.best_chromosome = fittest(&self.chromosomes).cloned();
    }

    /// Returns the migration-rate row: one probability per island, the entry at
    /// the island's own index being its self-retention.
    pub fn migration_rates(&self) -> &[f64] {
        &self.migration_rates
    }

    /// Replaces the migration-rate row.
    pub fn set_migration_rates(&mut self, rates: Vec<f64>) {
        self.migration_rates = rates;
    }

    /// Consumes the sub-population and returns its chromosomes.
    pub fn into_chromosomes(self) -> Vec<C> {
        self.chromosomes
    }
}

impl<C: Chromosome> PopulationView<C> for SubPopulation<C> {
    fn generation_number(&self) -> usize {
        self.generation_number
    }

    fn chromosomes(&self) -> &[C] {
        &self.chromosomes
    }

    fn best_chromosome(&self) -> Option<&C> {
        self.best_chromosome.as_ref()
    }

    fn min_size(&self) -> usize {
        self.chromosomes.len()
    }

    fn max_size(&self) -> usize {
        self.chromosomes.len()
    }
}
