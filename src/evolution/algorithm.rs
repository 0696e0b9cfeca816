//! # MetaGeneticAlgorithm
//!
//! The driver of a run. Every generation it builds one parameter cache and one
//! [`EvolutionContext`], then hands the four stages to its metaheuristic:
//!
//! 1. Selection of `min_size` parents.
//! 2. Crossover, once every `parents_number()` parents, on the context narrowed to
//!    that parent.
//! 3. Mutation of every offspring, on the context narrowed to that offspring.
//! 4. Reinsertion of offspring and parents into the next generation.
//!
//! The new generation is evaluated, committed and ended only once every stage has
//! succeeded; a failed step leaves the population untouched. Ending a generation
//! keeps its `max_size` fittest chromosomes.
//!
//! Crossover, mutation and fitness evaluation run through rayon once the number of
//! items reaches the parallel threshold of the options.

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::options::{EvolutionOptions, LogLevel};
use crate::caching::ParameterCache;
use crate::chromosome::Chromosome;
use crate::crossover::Crossover;
use crate::error::{GeneticError, OptionExt, Result};
use crate::fitness::Fitness;
use crate::metaheuristics::{EvolutionContext, EvolutionStage, SharedHeuristic};
use crate::mutation::Mutation;
use crate::population::{Population, PopulationView};
use crate::reinsertion::Reinsertion;
use crate::rng::RngStreams;
use crate::selection::Selection;
use crate::termination::Termination;

/// A genetic algorithm whose stages are dispatched by a metaheuristic.
///
/// Use [`MetaGeneticAlgorithmBuilder`](super::MetaGeneticAlgorithmBuilder) to assemble one.
pub struct MetaGeneticAlgorithm<C: Chromosome> {
    population: Population<C>,
    fitness: Arc<dyn Fitness<C>>,
    selection: Arc<dyn Selection<C>>,
    crossover: Arc<dyn Crossover<C>>,
    mutation: Arc<dyn Mutation<C>>,
    reinsertion: Arc<dyn Reinsertion<C>>,
    termination: Arc<dyn Termination<C>>,
    metaheuristic: SharedHeuristic<C>,
    options: EvolutionOptions,
    rng: RngStreams,
}

impl<C: Chromosome> MetaGeneticAlgorithm<C> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        population: Population<C>,
        fitness: Arc<dyn Fitness<C>>,
        selection: Arc<dyn Selection<C>>,
        crossover: Arc<dyn Crossover<C>>,
        mutation: Arc<dyn Mutation<C>>,
        reinsertion: Arc<dyn Reinsertion<C>>,
        termination: Arc<dyn Termination<C>>,
        metaheuristic: SharedHeuristic<C>,
        options: EvolutionOptions,
    ) -> Self {
        let rng = RngStreams::with_seed(options.get_seed());
        Self {
            population,
            fitness,
            selection,
            crossover,
            mutation,
            reinsertion,
            termination,
            metaheuristic,
            options,
            rng,
        }
    }

    pub fn population(&self) -> &Population<C> {
        &self.population
    }

    pub fn options(&self) -> &EvolutionOptions {
        &self.options
    }

    pub fn metaheuristic(&self) -> &SharedHeuristic<C> {
        &self.metaheuristic
    }

    /// Returns the random streams of the run.
    pub fn rng_streams(&self) -> &RngStreams {
        &self.rng
    }

    /// Returns the number of the current generation, 0 before the run starts.
    pub fn generation_number(&self) -> usize {
        self.population.generations_number()
    }

    /// Returns the best chromosome found so far.
    pub fn best_chromosome(&self) -> Option<&C> {
        self.population.best_chromosome()
    }

    /// Creates and evaluates the initial generation, unless the run has already
    /// started.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::FitnessCalculation` if a fitness is not finite.
    pub fn initialize(&mut self) -> Result<()> {
        if self.population.current_generation().is_some() {
            return Ok(());
        }

        self.rng
            .with_rng(|rng| self.population.create_initial_generation(rng))?;
        let threshold = self.options.get_parallel_threshold();
        self.population.evaluate_current_generation(|chromosomes| {
            evaluate_fitness(self.fitness.as_ref(), threshold, chromosomes)
        })?;
        self.population.end_current_generation();
        self.log_progress(false);
        Ok(())
    }

    /// Runs generations until the termination criterion is reached.
    ///
    /// # Returns
    ///
    /// The best chromosome of the run.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a generation step. Generations completed
    /// before the failure are kept.
    pub fn start(&mut self) -> Result<C> {
        self.initialize()?;
        while !self.termination.has_reached(&self.population) {
            self.evolve_one_generation()?;
        }
        self.population
            .best_chromosome()
            .cloned()
            .ok_or_else_genetic(|| GeneticError::EmptyPopulation)
    }

    /// Runs a single generation step, initializing the run first if needed.
    ///
    /// # Errors
    ///
    /// Returns the error of the failing stage. The population is left as it was.
    pub fn evolve_one_generation(&mut self) -> Result<()> {
        self.initialize()?;

        let mut next = self.run_stages()?;

        let threshold = self.options.get_parallel_threshold();
        evaluate_fitness(self.fitness.as_ref(), threshold, &mut next)?;
        self.population.create_new_generation(next)?;
        let improved = self.population.end_current_generation();
        self.log_progress(improved);
        Ok(())
    }

    /// Runs the four stages on the current generation and returns the chromosomes
    /// of the next one.
    fn run_stages(&self) -> Result<Vec<C>> {
        let cache = ParameterCache::new();
        let ctx = EvolutionContext::new(&self.population, &cache, &self.rng)
            .with_options(&self.options);
        let generation = ctx.generation_number();

        let parents = self.metaheuristic.select_parent_chromosomes(
            &ctx.with_stage(EvolutionStage::SELECTION),
            self.selection.as_ref(),
            self.population.min_size(),
        )?;
        let offspring = self.cross(&ctx.with_stage(EvolutionStage::CROSSOVER), &parents)?;
        let offspring = self.mutate(&ctx.with_stage(EvolutionStage::MUTATION), offspring)?;
        debug!(
            generation,
            parents = parents.len(),
            offspring = offspring.len(),
            "selection, crossover and mutation completed"
        );

        let next = self.metaheuristic.reinsert(
            &ctx.with_stage(EvolutionStage::REINSERTION),
            self.reinsertion.as_ref(),
            offspring,
            parents,
        )?;
        let (min_size, max_size) = (self.population.min_size(), self.population.max_size());
        if next.len() < min_size {
            warn!(
                generation,
                size = next.len(),
                min_size,
                "reinsertion returned fewer chromosomes than the population minimum"
            );
        } else if next.len() > max_size {
            debug!(
                generation,
                size = next.len(),
                max_size,
                "reinsertion overflow, the least fit chromosomes will be dropped"
            );
        }
        Ok(next)
    }

    fn cross(&self, ctx: &EvolutionContext<'_, C>, parents: &[C]) -> Result<Vec<C>> {
        let probability = self.options.get_crossover_probability();
        let step = self.crossover.parents_number().max(1);
        let indexes: Vec<usize> = (0..parents.len()).step_by(step).collect();

        let cross_at = |index: usize| {
            self.metaheuristic.match_parents_and_cross(
                &ctx.individual(index),
                self.crossover.as_ref(),
                probability,
                parents,
            )
        };
        let children: Vec<Option<Vec<C>>> =
            if indexes.len() >= self.options.get_parallel_threshold() {
                indexes.into_par_iter().map(&cross_at).collect::<Result<_>>()?
            } else {
                indexes.into_iter().map(&cross_at).collect::<Result<_>>()?
            };

        Ok(children.into_iter().flatten().flatten().collect())
    }

    fn mutate(&self, ctx: &EvolutionContext<'_, C>, mut offspring: Vec<C>) -> Result<Vec<C>> {
        let probability = self.options.get_mutation_probability();
        let mutate_at = |(index, chromosome): (usize, &mut C)| {
            self.metaheuristic.mutate_chromosome(
                &ctx.individual(index),
                self.mutation.as_ref(),
                probability,
                chromosome,
            )
        };

        if offspring.len() >= self.options.get_parallel_threshold() {
            offspring.par_iter_mut().enumerate().try_for_each(&mutate_at)?;
        } else {
            offspring.iter_mut().enumerate().try_for_each(&mutate_at)?;
        }
        Ok(offspring)
    }

    fn log_progress(&self, improved: bool) {
        let generation = self.population.generations_number();
        let best_fitness = self.population.best_chromosome().and_then(|c| c.fitness());
        match self.options.get_log_level() {
            LogLevel::Minimal => info!(generation, best_fitness, "generation completed"),
            LogLevel::Verbose => info!(
                generation,
                best_fitness,
                improved,
                best = ?self.population.best_chromosome(),
                "generation completed"
            ),
            LogLevel::None => {}
        }
    }
}

/// Assigns a fitness to every unevaluated chromosome.
fn evaluate_fitness<C: Chromosome>(
    fitness: &dyn Fitness<C>,
    parallel_threshold: usize,
    chromosomes: &mut [C],
) -> Result<()> {
    let evaluate = |chromosome: &mut C| {
        if chromosome.fitness().is_some() {
            return Ok(());
        }
        let score = fitness.evaluate(chromosome);
        if !score.is_finite() {
            return Err(GeneticError::FitnessCalculation(format!(
                "Non-finite fitness score encountered: {}",
                score
            )));
        }
        chromosome.set_fitness(Some(score));
        Ok(())
    };

    if chromosomes.len() >= parallel_threshold {
        chromosomes.par_iter_mut().try_for_each(&evaluate)
    } else {
        chromosomes.iter_mut().try_for_each(&evaluate)
    }
}

impl<C: Chromosome> fmt::Debug for MetaGeneticAlgorithm<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaGeneticAlgorithm")
            .field("generation", &self.population.generations_number())
            .field("selection", &self.selection)
            .field("crossover", &self.crossover)
            .field("mutation", &self.mutation)
            .field("reinsertion", &self.reinsertion)
            .field("termination", &self.termination)
            .field("metaheuristic", &self.metaheuristic)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chromosome::BinaryChromosome;
    use crate::crossover::UniformCrossover;
    use crate::evolution::MetaGeneticAlgorithmBuilder;
    use crate::metaheuristics::{EukaryoteMetaHeuristic, PhaseSizes, DefaultMetaHeuristic};
    use crate::mutation::UniformMutation;
    use crate::reinsertion::ElitistReinsertion;
    use crate::rng::RandomNumberGenerator;
    use crate::selection::EliteSelection;
    use crate::termination::GenerationNumberTermination;

    fn one_max(c: &BinaryChromosome) -> f64 {
        c.count_ones() as f64
    }

    fn builder(length: usize) -> MetaGeneticAlgorithmBuilder<BinaryChromosome> {
        MetaGeneticAlgorithmBuilder::new()
            .with_population(Population::new(10, 10, BinaryChromosome::from_genes(vec![false; length])).unwrap())
            .with_fitness(one_max)
            .with_selection(EliteSelection::new())
            .with_crossover(UniformCrossover::default())
            .with_mutation(UniformMutation::new())
            .with_reinsertion(ElitistReinsertion)
            .with_options(EvolutionOptions::builder().seed(11).build())
    }

    #[test]
    fn test_run_reaches_termination() {
        let mut algorithm = builder(12)
            .with_termination(GenerationNumberTermination::new(8))
            .build()
            .unwrap();
        let best = algorithm.start().unwrap();

        assert_eq!(algorithm.generation_number(), 8);
        assert!(best.fitness().is_some());
        assert!(algorithm
            .population()
            .chromosomes()
            .iter()
            .all(|c| c.fitness().is_some()));
    }

    /// Keeps every offspring and every parent.
    #[derive(Debug)]
    struct KeepEverything;

    impl Reinsertion<BinaryChromosome> for KeepEverything {
        fn select_chromosomes(
            &self,
            _population: &dyn PopulationView<BinaryChromosome>,
            mut offspring: Vec<BinaryChromosome>,
            parents: Vec<BinaryChromosome>,
            _rng: &mut RandomNumberGenerator,
        ) -> Result<Vec<BinaryChromosome>> {
            offspring.extend(parents);
            Ok(offspring)
        }
    }

    #[test]
    fn test_oversized_reinsertion_is_truncated() {
        let options = EvolutionOptions::builder()
            .crossover_probability(1.0)
            .seed(3)
            .build();
        let mut algorithm = builder(12)
            .with_reinsertion(KeepEverything)
            .with_options(options)
            .build()
            .unwrap();
        algorithm.initialize().unwrap();

        for generation in 2..5 {
            algorithm.evolve_one_generation().unwrap();
            assert_eq!(algorithm.generation_number(), generation);
            assert_eq!(algorithm.population().chromosomes().len(), 10);
        }
        let best = algorithm.best_chromosome().and_then(|c| c.fitness()).unwrap();
        assert_eq!(algorithm.population().chromosomes()[0].fitness(), Some(best));
    }

    #[test]
    fn test_best_fitness_never_decreases() {
        let mut algorithm = builder(16).build().unwrap();
        algorithm.initialize().unwrap();
        let mut previous = algorithm.best_chromosome().and_then(|c| c.fitness()).unwrap();
        for _ in 0..5 {
            algorithm.evolve_one_generation().unwrap();
            let best = algorithm.best_chromosome().and_then(|c| c.fitness()).unwrap();
            assert!(best >= previous);
            previous = best;
        }
    }

    #[test]
    fn test_failed_step_commits_nothing() {
        let eukaryote: SharedHeuristic<BinaryChromosome> = Arc::new(
            EukaryoteMetaHeuristic::<BinaryChromosome>::new(
                PhaseSizes::new(vec![4, 4]).unwrap(),
                vec![
                    Arc::new(DefaultMetaHeuristic::new()) as SharedHeuristic<BinaryChromosome>,
                    Arc::new(DefaultMetaHeuristic::new()),
                ],
            )
            .unwrap(),
        );
        let mut algorithm = builder(8).with_metaheuristic(eukaryote).build().unwrap();
        algorithm.initialize().unwrap();
        let before: Vec<Vec<bool>> = algorithm
            .population()
            .chromosomes()
            .iter()
            .map(|c| c.genes().to_vec())
            .collect();

        let result = algorithm.evolve_one_generation();
        assert!(matches!(result, Err(GeneticError::UnsupportedOperation(_))));
        assert_eq!(algorithm.generation_number(), 1);
        let after: Vec<Vec<bool>> = algorithm
            .population()
            .chromosomes()
            .iter()
            .map(|c| c.genes().to_vec())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_non_finite_fitness_is_an_error() {
        let mut algorithm = builder(4)
            .with_fitness(|_: &BinaryChromosome| f64::NAN)
            .build()
            .unwrap();
        assert!(matches!(
            algorithm.initialize(),
            Err(GeneticError::FitnessCalculation(_))
        ));
    }

    #[test]
    fn test_parallel_stages_keep_population_size() {
        let mut options = EvolutionOptions::builder().seed(5).build();
        options.set_parallel_threshold(1);
        let mut algorithm = builder(10).with_options(options).build().unwrap();
        for _ in 0..3 {
            algorithm.evolve_one_generation().unwrap();
        }
        assert_eq!(algorithm.population().chromosomes().len(), 10);
        assert_eq!(algorithm.generation_number(), 4);
    }
}
