//! # Container Metaheuristic
//!
//! A [`ContainerMetaHeuristic`] wraps one sub-heuristic, owns the parameters
//! registered on it and decides, through its [`ProbabilityStrategy`], whether the
//! crossover and mutation calls it receives reach the sub-heuristic at all.

use std::sync::Arc;

use crate::chromosome::Chromosome;
use crate::crossover::Crossover;
use crate::error::Result;
use crate::metaheuristics::parameter::{Parameter, ParameterRegistry, ParameterValue};
use crate::metaheuristics::{
    DefaultMetaHeuristic, EvolutionContext, HeuristicId, MetaHeuristic, ProbabilityStrategy,
    SharedHeuristic,
};
use crate::mutation::Mutation;
use crate::reinsertion::Reinsertion;
use crate::selection::Selection;

/// Probabilities at or above this value are treated as certain.
const CERTAIN: f32 = 1.0 - 1e-6;

/// A heuristic delegating every stage to a sub-heuristic, with optional
/// probability gating.
#[derive(Debug)]
pub struct ContainerMetaHeuristic<C: Chromosome> {
    id: HeuristicId,
    sub_heuristic: SharedHeuristic<C>,
    probability_strategy: ProbabilityStrategy,
    static_crossover_probability: f32,
    static_mutation_probability: f32,
    parameters: ParameterRegistry<C>,
}

impl<C: Chromosome> ContainerMetaHeuristic<C> {
    /// Creates a container around a [`DefaultMetaHeuristic`], without gating.
    pub fn new() -> Self {
        Self {
            id: HeuristicId::next(),
            sub_heuristic: Arc::new(DefaultMetaHeuristic::new()),
            probability_strategy: ProbabilityStrategy::NONE,
            static_crossover_probability: 1.0,
            static_mutation_probability: 1.0,
            parameters: ParameterRegistry::new(),
        }
    }

    /// Replaces the sub-heuristic.
    pub fn with_sub_heuristic(mut self, sub_heuristic: SharedHeuristic<C>) -> Self {
        self.sub_heuristic = sub_heuristic;
        self
    }

    /// Sets how incoming probabilities are treated.
    pub fn with_probability_strategy(mut self, strategy: ProbabilityStrategy) -> Self {
        self.probability_strategy = strategy;
        self
    }

    /// Sets the crossover probability used by `OVERWRITE_PROBABILITY`.
    pub fn with_static_crossover_probability(mut self, probability: f32) -> Self {
        self.static_crossover_probability = probability;
        self
    }

    /// Sets the mutation probability used by `OVERWRITE_PROBABILITY`.
    pub fn with_static_mutation_probability(mut self, probability: f32) -> Self {
        self.static_mutation_probability = probability;
        self
    }

    /// Registers a parameter and returns the container.
    pub fn with_parameter<T: ParameterValue>(mut self, parameter: Parameter<C, T>) -> Self {
        self.parameters.register(parameter);
        self
    }

    /// Registers a parameter and returns the shared registered instance.
    pub fn register_parameter<T: ParameterValue>(
        &mut self,
        parameter: Parameter<C, T>,
    ) -> Arc<Parameter<C, T>> {
        self.parameters.register(parameter)
    }

    /// Returns the wrapped heuristic.
    pub fn sub_heuristic(&self) -> &SharedHeuristic<C> {
        &self.sub_heuristic
    }

    /// Returns how incoming probabilities are treated.
    pub fn probability_strategy(&self) -> ProbabilityStrategy {
        self.probability_strategy
    }

    /// Returns the crossover probability used by `OVERWRITE_PROBABILITY`.
    pub fn static_crossover_probability(&self) -> f32 {
        self.static_crossover_probability
    }

    /// Returns the mutation probability used by `OVERWRITE_PROBABILITY`.
    pub fn static_mutation_probability(&self) -> f32 {
        self.static_mutation_probability
    }

    /// Applies the probability strategy to a crossover call.
    ///
    /// # Returns
    ///
    /// `None` when the crossover must be skipped, otherwise the probability to
    /// forward. A passed test forwards 1 so the sub-heuristic crosses for sure.
    pub fn crossover_gate(&self, ctx: &EvolutionContext<'_, C>, probability: f32) -> Option<f32> {
        let probability = self.effective(probability, self.static_crossover_probability);
        if self.probability_strategy.contains(ProbabilityStrategy::TEST_PROBABILITY) {
            return self.draw(ctx, probability).then_some(1.0);
        }
        Some(probability)
    }

    /// Applies the probability strategy to a mutation call.
    ///
    /// # Returns
    ///
    /// `None` when the mutation must be skipped, otherwise the per-gene rate to
    /// forward.
    pub fn mutation_gate(&self, ctx: &EvolutionContext<'_, C>, probability: f32) -> Option<f32> {
        let probability = self.effective(probability, self.static_mutation_probability);
        if self.probability_strategy.contains(ProbabilityStrategy::TEST_PROBABILITY) {
            return self.draw(ctx, probability).then_some(probability);
        }
        Some(probability)
    }

    fn effective(&self, probability: f32, fixed: f32) -> f32 {
        if self
            .probability_strategy
            .contains(ProbabilityStrategy::OVERWRITE_PROBABILITY)
        {
            fixed
        } else {
            probability
        }
    }

    fn draw(&self, ctx: &EvolutionContext<'_, C>, probability: f32) -> bool {
        probability >= CERTAIN
            || ctx.with_rng(|rng| rng.gen_probability() < f64::from(probability))
    }
}

impl<C: Chromosome> Default for ContainerMetaHeuristic<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Chromosome> MetaHeuristic<C> for ContainerMetaHeuristic<C> {
    fn id(&self) -> HeuristicId {
        self.id
    }

    fn parameters(&self) -> Option<&ParameterRegistry<C>> {
        Some(&self.parameters)
    }

    fn select_parent_chromosomes(
        &self,
        ctx: &EvolutionContext<'_, C>,
        selection: &dyn Selection<C>,
        count: usize,
    ) -> Result<Vec<C>> {
        self.sub_heuristic
            .select_parent_chromosomes(ctx, selection, count)
    }

    fn match_parents_and_cross(
        &self,
        ctx: &EvolutionContext<'_, C>,
        crossover: &dyn Crossover<C>,
        probability: f32,
        parents: &[C],
    ) -> Result<Option<Vec<C>>> {
        match self.crossover_gate(ctx, probability) {
            Some(probability) => self
                .sub_heuristic
                .match_parents_and_cross(ctx, crossover, probability, parents),
            None => Ok(None),
        }
    }

    fn mutate_chromosome(
        &self,
        ctx: &EvolutionContext<'_, C>,
        mutation: &dyn Mutation<C>,
        probability: f32,
        chromosome: &mut C,
    ) -> Result<()> {
        match self.mutation_gate(ctx, probability) {
            Some(probability) => self
                .sub_heuristic
                .mutate_chromosome(ctx, mutation, probability, chromosome),
            None => Ok(()),
        }
    }

    fn reinsert(
        &self,
        ctx: &EvolutionContext<'_, C>,
        reinsertion: &dyn Reinsertion<C>,
        offspring: Vec<C>,
        parents: Vec<C>,
    ) -> Result<Vec<C>> {
        self.sub_heuristic.reinsert(ctx, reinsertion, offspring, parents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching::ParameterCache;
    use crate::chromosome::BinaryChromosome;
    use crate::crossover::OnePointCrossover;
    use crate::mutation::UniformMutation;
    use crate::population::SubPopulation;
    use crate::rng::RngStreams;

    type C = BinaryChromosome;

    fn parents() -> Vec<C> {
        vec![
            BinaryChromosome::from_genes(vec![true; 6]),
            BinaryChromosome::from_genes(vec![false; 6]),
        ]
    }

    #[test]
    fn test_overwrite_replaces_caller_probability() {
        let container = ContainerMetaHeuristic::<C>::new()
            .with_probability_strategy(ProbabilityStrategy::OVERWRITE_PROBABILITY)
            .with_static_crossover_probability(1.0);
        let population = SubPopulation::new(1, parents());
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(9);
        let ctx = EvolutionContext::new(&population, &cache, &rng);

        for _ in 0..20 {
            let children = container
                .match_parents_and_cross(&ctx, &OnePointCrossover::new(), 0.0, &parents())
                .unwrap();
            assert!(children.is_some());
        }
    }

    #[test]
    fn test_failed_test_skips_the_operation() {
        let container = ContainerMetaHeuristic::<C>::new()
            .with_probability_strategy(ProbabilityStrategy::TEST_PROBABILITY);
        let population = SubPopulation::new(1, parents());
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(9);
        let ctx = EvolutionContext::new(&population, &cache, &rng);

        assert_eq!(container.crossover_gate(&ctx, 0.0), None);
        assert_eq!(container.mutation_gate(&ctx, 0.0), None);
        assert_eq!(container.crossover_gate(&ctx, 1.0), Some(1.0));
        assert_eq!(container.mutation_gate(&ctx, 1.0), Some(1.0));

        let mut chromosome = BinaryChromosome::from_genes(vec![true; 6]);
        container
            .mutate_chromosome(&ctx, &UniformMutation::new(), 0.0, &mut chromosome)
            .unwrap();
        assert_eq!(chromosome.count_ones(), 6);
    }

    #[test]
    fn test_without_strategy_probability_is_forwarded() {
        let container = ContainerMetaHeuristic::<C>::new();
        let population = SubPopulation::new(1, parents());
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(9);
        let ctx = EvolutionContext::new(&population, &cache, &rng);

        assert_eq!(container.crossover_gate(&ctx, 0.3), Some(0.3));
        assert_eq!(container.mutation_gate(&ctx, 0.2), Some(0.2));
        assert!(container.parameters().is_some_and(|p| p.is_empty()));
    }
}
