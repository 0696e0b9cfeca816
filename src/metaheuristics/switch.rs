//! # Switch Metaheuristic
//!
//! A [`SwitchMetaHeuristic`] evaluates a phase parameter and hands every stage to
//! the heuristic registered for that phase. Any hashable value can serve as phase
//! key; [`SwitchMetaHeuristic::if_else`] covers the boolean case.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use tracing::trace;

use crate::chromosome::Chromosome;
use crate::crossover::Crossover;
use crate::error::{GeneticError, Result};
use crate::metaheuristics::parameter::{Parameter, ParameterValue};
use crate::metaheuristics::{
    ContainerMetaHeuristic, EvolutionContext, EvolutionStage, ScopedHandler, ScopedMetaHeuristic,
    SharedHeuristic,
};
use crate::mutation::Mutation;
use crate::reinsertion::Reinsertion;
use crate::selection::Selection;

/// Values usable as switch phases.
pub trait PhaseKey: ParameterValue + Eq + Hash + Debug {}

impl<T: ParameterValue + Eq + Hash + Debug> PhaseKey for T {}

/// The phase parameter and the heuristic of every phase.
#[derive(Debug)]
pub struct Switch<C: Chromosome, I: PhaseKey> {
    phase: Arc<Parameter<C, I>>,
    heuristics: HashMap<I, SharedHeuristic<C>>,
}

/// A heuristic dispatching every stage by the value of a phase parameter.
pub type SwitchMetaHeuristic<C, I> = ScopedMetaHeuristic<C, Switch<C, I>>;

impl<C: Chromosome, I: PhaseKey> ScopedMetaHeuristic<C, Switch<C, I>> {
    /// Creates a switch over `phase`, registered as "phase". No phase has a
    /// heuristic yet.
    pub fn new(phase: Parameter<C, I>) -> Self {
        let mut base = ContainerMetaHeuristic::new();
        let phase = base.register_parameter(phase.renamed("phase"));
        Self::from_parts(
            base,
            EvolutionStage::ALL,
            Switch {
                phase,
                heuristics: HashMap::new(),
            },
        )
    }

    /// Registers the heuristic of phase `key`, replacing any previous one.
    pub fn with_phase(mut self, key: I, heuristic: SharedHeuristic<C>) -> Self {
        self.handler_mut().heuristics.insert(key, heuristic);
        self
    }

    /// Returns the number of phases with a heuristic.
    pub fn phases_number(&self) -> usize {
        self.handler().heuristics.len()
    }

    /// Returns the heuristic of the context's phase.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::MissingPhaseHeuristic` if the phase has no heuristic,
    /// or the error of the phase parameter.
    pub fn current_heuristic(&self, ctx: &EvolutionContext<'_, C>) -> Result<SharedHeuristic<C>> {
        self.handler().current(self.container(), ctx)
    }
}

impl<C: Chromosome> ScopedMetaHeuristic<C, Switch<C, bool>> {
    /// Creates a switch running `then` while `condition` holds and `otherwise`
    /// when it does not.
    pub fn if_else(
        condition: Parameter<C, bool>,
        then: SharedHeuristic<C>,
        otherwise: SharedHeuristic<C>,
    ) -> Self {
        Self::new(condition)
            .with_phase(true, then)
            .with_phase(false, otherwise)
    }
}

impl<C: Chromosome, I: PhaseKey> Switch<C, I> {
    fn current(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
    ) -> Result<SharedHeuristic<C>> {
        let key = self.phase.get(owner, ctx)?;
        trace!(phase = ?key, stage = ?ctx.stage(), "switch dispatch");
        self.heuristics
            .get(&key)
            .cloned()
            .ok_or_else(|| GeneticError::MissingPhaseHeuristic(format!("{:?}", key)))
    }
}

impl<C: Chromosome, I: PhaseKey> ScopedHandler<C> for Switch<C, I> {
    fn select(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        selection: &dyn Selection<C>,
        count: usize,
    ) -> Result<Vec<C>> {
        self.current(owner, ctx)?
            .select_parent_chromosomes(ctx, selection, count)
    }

    fn cross(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        crossover: &dyn Crossover<C>,
        probability: f32,
        parents: &[C],
    ) -> Result<Option<Vec<C>>> {
        self.current(owner, ctx)?
            .match_parents_and_cross(ctx, crossover, probability, parents)
    }

    fn mutate(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        mutation: &dyn Mutation<C>,
        probability: f32,
        chromosome: &mut C,
    ) -> Result<()> {
        self.current(owner, ctx)?
            .mutate_chromosome(ctx, mutation, probability, chromosome)
    }

    fn reinsert(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        reinsertion: &dyn Reinsertion<C>,
        offspring: Vec<C>,
        parents: Vec<C>,
    ) -> Result<Vec<C>> {
        self.current(owner, ctx)?
            .reinsert(ctx, reinsertion, offspring, parents)
    }
}
