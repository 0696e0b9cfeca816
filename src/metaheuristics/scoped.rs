//! # Scoped Metaheuristics
//!
//! A [`ScopedMetaHeuristic`] is a container that takes over some stages of a
//! generation. The stages in its [`EvolutionStage`] mask are handed to a
//! [`ScopedHandler`]; every other stage goes to the container's sub-heuristic
//! untouched. Crossover and mutation are gated by the container's probability
//! strategy before either path is taken.
//!
//! All composite heuristics of the crate are scoped heuristics with a dedicated
//! handler, exposed through type aliases such as
//! [`SwitchMetaHeuristic`](crate::metaheuristics::SwitchMetaHeuristic).

use std::fmt::Debug;
use std::sync::Arc;

use crate::chromosome::Chromosome;
use crate::crossover::Crossover;
use crate::error::{GeneticError, Result};
use crate::metaheuristics::parameter::{Parameter, ParameterRegistry, ParameterValue};
use crate::metaheuristics::{
    ContainerMetaHeuristic, EvolutionContext, EvolutionStage, HeuristicId, MetaHeuristic,
    ProbabilityStrategy, SharedHeuristic,
};
use crate::mutation::Mutation;
use crate::reinsertion::Reinsertion;
use crate::selection::Selection;

/// The stage overrides of a scoped heuristic.
///
/// Each method receives the owning container, which carries the heuristic
/// identity, the registered parameters and the sub-heuristic. A stage a handler
/// does not implement fails with `GeneticError::UnsupportedOperation`.
pub trait ScopedHandler<C: Chromosome>: Debug + Send + Sync {
    fn select(
        &self,
        _owner: &ContainerMetaHeuristic<C>,
        _ctx: &EvolutionContext<'_, C>,
        _selection: &dyn Selection<C>,
        _count: usize,
    ) -> Result<Vec<C>> {
        Err(unsupported::<C, Self>("selection"))
    }

    fn cross(
        &self,
        _owner: &ContainerMetaHeuristic<C>,
        _ctx: &EvolutionContext<'_, C>,
        _crossover: &dyn Crossover<C>,
        _probability: f32,
        _parents: &[C],
    ) -> Result<Option<Vec<C>>> {
        Err(unsupported::<C, Self>("crossover"))
    }

    fn mutate(
        &self,
        _owner: &ContainerMetaHeuristic<C>,
        _ctx: &EvolutionContext<'_, C>,
        _mutation: &dyn Mutation<C>,
        _probability: f32,
        _chromosome: &mut C,
    ) -> Result<()> {
        Err(unsupported::<C, Self>("mutation"))
    }

    fn reinsert(
        &self,
        _owner: &ContainerMetaHeuristic<C>,
        _ctx: &EvolutionContext<'_, C>,
        _reinsertion: &dyn Reinsertion<C>,
        _offspring: Vec<C>,
        _parents: Vec<C>,
    ) -> Result<Vec<C>> {
        Err(unsupported::<C, Self>("reinsertion"))
    }
}

fn unsupported<C: Chromosome, H: ScopedHandler<C> + ?Sized>(stage: &str) -> GeneticError {
    GeneticError::UnsupportedOperation(format!(
        "{} does not implement {}",
        std::any::type_name::<H>(),
        stage
    ))
}

/// A container dispatching the stages of `scope` to a handler.
#[derive(Debug)]
pub struct ScopedMetaHeuristic<C: Chromosome, H: ScopedHandler<C>> {
    base: ContainerMetaHeuristic<C>,
    scope: EvolutionStage,
    handler: H,
}

impl<C: Chromosome, H: ScopedHandler<C>> ScopedMetaHeuristic<C, H> {
    /// Creates a scoped heuristic around a default container.
    pub fn scoped(scope: EvolutionStage, handler: H) -> Self {
        Self::from_parts(ContainerMetaHeuristic::new(), scope, handler)
    }

    /// Creates a scoped heuristic around an existing container.
    pub fn from_parts(base: ContainerMetaHeuristic<C>, scope: EvolutionStage, handler: H) -> Self {
        Self {
            base,
            scope,
            handler,
        }
    }

    /// Returns the stages handled by the handler.
    pub fn scope(&self) -> EvolutionStage {
        self.scope
    }

    /// Replaces the stages handled by the handler.
    pub fn with_scope(mut self, scope: EvolutionStage) -> Self {
        self.scope = scope;
        self
    }

    /// Returns the stage handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub(crate) fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub(crate) fn add_scope(&mut self, stage: EvolutionStage) {
        self.scope |= stage;
    }

    /// Returns the underlying container.
    pub fn container(&self) -> &ContainerMetaHeuristic<C> {
        &self.base
    }

    /// Replaces the sub-heuristic receiving the stages outside the scope.
    pub fn with_sub_heuristic(mut self, sub_heuristic: SharedHeuristic<C>) -> Self {
        self.base = self.base.with_sub_heuristic(sub_heuristic);
        self
    }

    /// See [`ContainerMetaHeuristic::with_probability_strategy`].
    pub fn with_probability_strategy(mut self, strategy: ProbabilityStrategy) -> Self {
        self.base = self.base.with_probability_strategy(strategy);
        self
    }

    /// See [`ContainerMetaHeuristic::with_static_crossover_probability`].
    pub fn with_static_crossover_probability(mut self, probability: f32) -> Self {
        self.base = self.base.with_static_crossover_probability(probability);
        self
    }

    /// See [`ContainerMetaHeuristic::with_static_mutation_probability`].
    pub fn with_static_mutation_probability(mut self, probability: f32) -> Self {
        self.base = self.base.with_static_mutation_probability(probability);
        self
    }

    /// Registers a parameter on the container.
    pub fn with_parameter<T: ParameterValue>(mut self, parameter: Parameter<C, T>) -> Self {
        self.base.register_parameter(parameter);
        self
    }

    /// Registers a parameter on the container and returns the shared instance.
    pub fn register_parameter<T: ParameterValue>(
        &mut self,
        parameter: Parameter<C, T>,
    ) -> Arc<Parameter<C, T>> {
        self.base.register_parameter(parameter)
    }
}

impl<C: Chromosome, H: ScopedHandler<C>> MetaHeuristic<C> for ScopedMetaHeuristic<C, H> {
    fn id(&self) -> HeuristicId {
        self.base.id()
    }

    fn parameters(&self) -> Option<&ParameterRegistry<C>> {
        self.base.parameters()
    }

    fn select_parent_chromosomes(
        &self,
        ctx: &EvolutionContext<'_, C>,
        selection: &dyn Selection<C>,
        count: usize,
    ) -> Result<Vec<C>> {
        if self.scope.contains(EvolutionStage::SELECTION) {
            self.handler.select(&self.base, ctx, selection, count)
        } else {
            self.base
                .sub_heuristic()
                .select_parent_chromosomes(ctx, selection, count)
        }
    }

    fn match_parents_and_cross(
        &self,
        ctx: &EvolutionContext<'_, C>,
        crossover: &dyn Crossover<C>,
        probability: f32,
        parents: &[C],
    ) -> Result<Option<Vec<C>>> {
        let Some(probability) = self.base.crossover_gate(ctx, probability) else {
            return Ok(None);
        };
        if self.scope.contains(EvolutionStage::CROSSOVER) {
            self.handler
                .cross(&self.base, ctx, crossover, probability, parents)
        } else {
            self.base
                .sub_heuristic()
                .match_parents_and_cross(ctx, crossover, probability, parents)
        }
    }

    fn mutate_chromosome(
        &self,
        ctx: &EvolutionContext<'_, C>,
        mutation: &dyn Mutation<C>,
        probability: f32,
        chromosome: &mut C,
    ) -> Result<()> {
        let Some(probability) = self.base.mutation_gate(ctx, probability) else {
            return Ok(());
        };
        if self.scope.contains(EvolutionStage::MUTATION) {
            self.handler
                .mutate(&self.base, ctx, mutation, probability, chromosome)
        } else {
            self.base
                .sub_heuristic()
                .mutate_chromosome(ctx, mutation, probability, chromosome)
        }
    }

    fn reinsert(
        &self,
        ctx: &EvolutionContext<'_, C>,
        reinsertion: &dyn Reinsertion<C>,
        offspring: Vec<C>,
        parents: Vec<C>,
    ) -> Result<Vec<C>> {
        if self.scope.contains(EvolutionStage::REINSERTION) {
            self.handler
                .reinsert(&self.base, ctx, reinsertion, offspring, parents)
        } else {
            self.base
                .sub_heuristic()
                .reinsert(ctx, reinsertion, offspring, parents)
        }
    }
}
