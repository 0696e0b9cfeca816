use std::sync::Arc;

use crate::{
    chromosome::Chromosome,
    crossover::Crossover,
    error::{GeneticError, Result},
    fitness::Fitness,
    metaheuristics::{DefaultMetaHeuristic, SharedHeuristic},
    mutation::Mutation,
    population::Population,
    reinsertion::{ElitistReinsertion, Reinsertion},
    selection::Selection,
    termination::{GenerationNumberTermination, Termination},
};

use super::{EvolutionOptions, MetaGeneticAlgorithm};

/// Assembles a [`MetaGeneticAlgorithm`].
///
/// Population, fitness, selection, crossover and mutation are mandatory. When not
/// given, reinsertion is elitist, termination stops after 100 generations, the
/// metaheuristic is a [`DefaultMetaHeuristic`] and options are the defaults.
pub struct MetaGeneticAlgorithmBuilder<C: Chromosome> {
    population: Option<Population<C>>,
    fitness: Option<Arc<dyn Fitness<C>>>,
    selection: Option<Arc<dyn Selection<C>>>,
    crossover: Option<Arc<dyn Crossover<C>>>,
    mutation: Option<Arc<dyn Mutation<C>>>,
    reinsertion: Option<Arc<dyn Reinsertion<C>>>,
    termination: Option<Arc<dyn Termination<C>>>,
    metaheuristic: Option<SharedHeuristic<C>>,
    options: Option<EvolutionOptions>,
}

impl<C: Chromosome> MetaGeneticAlgorithmBuilder<C> {
    pub fn new() -> Self {
        Self {
            population: None,
            fitness: None,
            selection: None,
            crossover: None,
            mutation: None,
            reinsertion: None,
            termination: None,
            metaheuristic: None,
            options: None,
        }
    }

    pub fn with_population(mut self, population: Population<C>) -> Self {
        self.population = Some(population);
        self
    }

    pub fn with_fitness(mut self, fitness: impl Fitness<C> + 'static) -> Self {
        self.fitness = Some(Arc::new(fitness));
        self
    }

    pub fn with_selection(mut self, selection: impl Selection<C> + 'static) -> Self {
        self.selection = Some(Arc::new(selection));
        self
    }

    pub fn with_crossover(mut self, crossover: impl Crossover<C> + 'static) -> Self {
        self.crossover = Some(Arc::new(crossover));
        self
    }

    pub fn with_mutation(mut self, mutation: impl Mutation<C> + 'static) -> Self {
        self.mutation = Some(Arc::new(mutation));
        self
    }

    pub fn with_reinsertion(mut self, reinsertion: impl Reinsertion<C> + 'static) -> Self {
        self.reinsertion = Some(Arc::new(reinsertion));
        self
    }

    pub fn with_termination(mut self, termination: impl Termination<C> + 'static) -> Self {
        self.termination = Some(Arc::new(termination));
        self
    }

    /// Sets the root of the metaheuristic composition.
    pub fn with_metaheuristic(mut self, metaheuristic: SharedHeuristic<C>) -> Self {
        self.metaheuristic = Some(metaheuristic);
        self
    }

    pub fn with_options(mut self, options: EvolutionOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Builds the algorithm.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if a mandatory part is missing or a
    /// probability of the options lies outside `[0, 1]`.
    pub fn build(self) -> Result<MetaGeneticAlgorithm<C>> {
        let population = self
            .population
            .ok_or_else(|| GeneticError::Configuration("Population not specified".to_string()))?;

        let fitness = self
            .fitness
            .ok_or_else(|| GeneticError::Configuration("Fitness not specified".to_string()))?;

        let selection = self.selection.ok_or_else(|| {
            GeneticError::Configuration("Selection operator not specified".to_string())
        })?;

        let crossover = self.crossover.ok_or_else(|| {
            GeneticError::Configuration("Crossover operator not specified".to_string())
        })?;

        let mutation = self.mutation.ok_or_else(|| {
            GeneticError::Configuration("Mutation operator not specified".to_string())
        })?;

        let options = self.options.unwrap_or_default();
        for (name, probability) in [
            ("Crossover", options.get_crossover_probability()),
            ("Mutation", options.get_mutation_probability()),
        ] {
            if !(0.0..=1.0).contains(&probability) {
                return Err(GeneticError::Configuration(format!(
                    "{} probability must be between 0 and 1, got {}",
                    name, probability
                )));
            }
        }

        Ok(MetaGeneticAlgorithm::new(
            population,
            fitness,
            selection,
            crossover,
            mutation,
            self.reinsertion
                .unwrap_or_else(|| Arc::new(ElitistReinsertion)),
            self.termination
                .unwrap_or_else(|| Arc::new(GenerationNumberTermination::default())),
            self.metaheuristic
                .unwrap_or_else(|| Arc::new(DefaultMetaHeuristic::new())),
            options,
        ))
    }
}

impl<C: Chromosome> Default for MetaGeneticAlgorithmBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
