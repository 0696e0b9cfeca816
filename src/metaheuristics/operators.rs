//! # Operator Overrides
//!
//! [`OperatorsMetaHeuristic`] swaps the operators the algorithm passes in for
//! operators produced by parameters, then lets its sub-heuristic apply them. The
//! parameter scope decides how often a new operator is picked: once per
//! generation, once per individual, and so on.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use metagenalg::chromosome::BinaryChromosome;
//! use metagenalg::crossover::{Crossover, OnePointCrossover, UniformCrossover};
//! use metagenalg::metaheuristics::{OperatorsMetaHeuristic, ParamScope, Parameter};
//!
//! // Uniform crossover on even generations, one-point crossover on odd ones.
//! let heuristic = OperatorsMetaHeuristic::<BinaryChromosome>::new().with_crossover(
//!     Parameter::new("crossover", ParamScope::GENERATION, |_, ctx| {
//!         let crossover: Arc<dyn Crossover<BinaryChromosome>> = if ctx.generation_number() % 2 == 0 {
//!             Arc::new(UniformCrossover::default())
//!         } else {
//!             Arc::new(OnePointCrossover::new())
//!         };
//!         Ok(crossover)
//!     }),
//! );
//! # let _ = heuristic;
//! ```

use std::sync::Arc;

use crate::chromosome::Chromosome;
use crate::crossover::Crossover;
use crate::error::Result;
use crate::metaheuristics::parameter::Parameter;
use crate::metaheuristics::{
    ContainerMetaHeuristic, EvolutionContext, EvolutionStage, ScopedHandler, ScopedMetaHeuristic,
};
use crate::mutation::Mutation;
use crate::reinsertion::Reinsertion;
use crate::selection::Selection;

pub type SelectionParameter<C> = Arc<Parameter<C, Arc<dyn Selection<C>>>>;
pub type CrossoverParameter<C> = Arc<Parameter<C, Arc<dyn Crossover<C>>>>;
pub type MutationParameter<C> = Arc<Parameter<C, Arc<dyn Mutation<C>>>>;
pub type ReinsertionParameter<C> = Arc<Parameter<C, Arc<dyn Reinsertion<C>>>>;

/// The operator parameters of an [`OperatorsMetaHeuristic`].
#[derive(Debug)]
pub struct OperatorOverrides<C: Chromosome> {
    selection: Option<SelectionParameter<C>>,
    crossover: Option<CrossoverParameter<C>>,
    mutation: Option<MutationParameter<C>>,
    reinsertion: Option<ReinsertionParameter<C>>,
}

/// A heuristic replacing some of the algorithm's operators.
pub type OperatorsMetaHeuristic<C> = ScopedMetaHeuristic<C, OperatorOverrides<C>>;

impl<C: Chromosome> ScopedMetaHeuristic<C, OperatorOverrides<C>> {
    /// Creates a heuristic overriding nothing yet.
    pub fn new() -> Self {
        Self::scoped(
            EvolutionStage::NONE,
            OperatorOverrides {
                selection: None,
                crossover: None,
                mutation: None,
                reinsertion: None,
            },
        )
    }

    /// Picks the selection operator with `parameter`, registered as "selection".
    pub fn with_selection(mut self, parameter: Parameter<C, Arc<dyn Selection<C>>>) -> Self {
        let parameter = self.register_parameter(parameter.renamed("selection"));
        self.handler_mut().selection = Some(parameter);
        self.add_scope(EvolutionStage::SELECTION);
        self
    }

    /// Picks the crossover operator with `parameter`, registered as "crossover".
    pub fn with_crossover(mut self, parameter: Parameter<C, Arc<dyn Crossover<C>>>) -> Self {
        let parameter = self.register_parameter(parameter.renamed("crossover"));
        self.handler_mut().crossover = Some(parameter);
        self.add_scope(EvolutionStage::CROSSOVER);
        self
    }

    /// Picks the mutation operator with `parameter`, registered as "mutation".
    pub fn with_mutation(mut self, parameter: Parameter<C, Arc<dyn Mutation<C>>>) -> Self {
        let parameter = self.register_parameter(parameter.renamed("mutation"));
        self.handler_mut().mutation = Some(parameter);
        self.add_scope(EvolutionStage::MUTATION);
        self
    }

    /// Picks the reinsertion operator with `parameter`, registered as "reinsertion".
    pub fn with_reinsertion(mut self, parameter: Parameter<C, Arc<dyn Reinsertion<C>>>) -> Self {
        let parameter = self.register_parameter(parameter.renamed("reinsertion"));
        self.handler_mut().reinsertion = Some(parameter);
        self.add_scope(EvolutionStage::REINSERTION);
        self
    }
}

impl<C: Chromosome> Default for ScopedMetaHeuristic<C, OperatorOverrides<C>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Chromosome> ScopedHandler<C> for OperatorOverrides<C> {
    fn select(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        selection: &dyn Selection<C>,
        count: usize,
    ) -> Result<Vec<C>> {
        let sub_heuristic = owner.sub_heuristic();
        match &self.selection {
            Some(parameter) => {
                let selection = parameter.get(owner, ctx)?;
                sub_heuristic.select_parent_chromosomes(ctx, selection.as_ref(), count)
            }
            None => sub_heuristic.select_parent_chromosomes(ctx, selection, count),
        }
    }

    fn cross(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        crossover: &dyn Crossover<C>,
        probability: f32,
        parents: &[C],
    ) -> Result<Option<Vec<C>>> {
        let sub_heuristic = owner.sub_heuristic();
        match &self.crossover {
            Some(parameter) => {
                let crossover = parameter.get(owner, ctx)?;
                sub_heuristic.match_parents_and_cross(ctx, crossover.as_ref(), probability, parents)
            }
            None => sub_heuristic.match_parents_and_cross(ctx, crossover, probability, parents),
        }
    }

    fn mutate(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        mutation: &dyn Mutation<C>,
        probability: f32,
        chromosome: &mut C,
    ) -> Result<()> {
        let sub_heuristic = owner.sub_heuristic();
        match &self.mutation {
            Some(parameter) => {
                let mutation = parameter.get(owner, ctx)?;
                sub_heuristic.mutate_chromosome(ctx, mutation.as_ref(), probability, chromosome)
            }
            None => sub_heuristic.mutate_chromosome(ctx, mutation, probability, chromosome),
        }
    }

    fn reinsert(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        reinsertion: &dyn Reinsertion<C>,
        offspring: Vec<C>,
        parents: Vec<C>,
    ) -> Result<Vec<C>> {
        let sub_heuristic = owner.sub_heuristic();
        match &self.reinsertion {
            Some(parameter) => {
                let reinsertion = parameter.get(owner, ctx)?;
                sub_heuristic.reinsert(ctx, reinsertion.as_ref(), offspring, parents)
            }
            None => sub_heuristic.reinsert(ctx, reinsertion, offspring, parents),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching::ParameterCache;
    use crate::chromosome::BinaryChromosome;
    use crate::metaheuristics::{MetaHeuristic, ParamScope};
    use crate::population::SubPopulation;
    use crate::reinsertion::{ElitistReinsertion, PureReinsertion};
    use crate::rng::RngStreams;

    type C = BinaryChromosome;

    fn chromosomes() -> Vec<C> {
        (0..4)
            .map(|ones| {
                let mut genes = vec![false; 4];
                genes[..ones].fill(true);
                let mut chromosome = BinaryChromosome::from_genes(genes);
                chromosome.set_fitness(Some(ones as f64));
                chromosome
            })
            .collect()
    }

    #[test]
    fn test_scope_follows_the_overridden_stages() {
        let heuristic = OperatorsMetaHeuristic::<C>::new().with_reinsertion(Parameter::new(
            "ignored",
            ParamScope::GENERATION,
            |_, _| {
                let reinsertion: Arc<dyn Reinsertion<C>> = Arc::new(ElitistReinsertion);
                Ok(reinsertion)
            },
        ));
        assert_eq!(heuristic.scope(), EvolutionStage::REINSERTION);
        assert!(heuristic
            .parameters()
            .is_some_and(|registry| registry.contains("reinsertion")));
    }

    #[test]
    fn test_overridden_reinsertion_replaces_the_operator() {
        let heuristic = OperatorsMetaHeuristic::<C>::new().with_reinsertion(Parameter::new(
            "reinsertion",
            ParamScope::GENERATION,
            |_, _| {
                let reinsertion: Arc<dyn Reinsertion<C>> = Arc::new(ElitistReinsertion);
                Ok(reinsertion)
            },
        ));
        let population = SubPopulation::new(1, chromosomes());
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(5);
        let ctx = EvolutionContext::new(&population, &cache, &rng)
            .with_stage(EvolutionStage::REINSERTION);

        // Pure reinsertion would keep the single offspring; elitist reinsertion
        // fills up to the population size with the best parents.
        let offspring = vec![chromosomes()[0].clone()];
        let next = heuristic
            .reinsert(&ctx, &PureReinsertion, offspring, chromosomes())
            .unwrap();
        assert_eq!(next.len(), 4);
        assert!(next.iter().any(|c| c.count_ones() == 3));
    }
}
