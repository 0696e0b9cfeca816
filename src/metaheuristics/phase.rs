//! # Phases
//!
//! Phase arithmetic shared by the size-based, island and eukaryote heuristics, and
//! the [`SizeBasedMetaHeuristic`] itself.
//!
//! A [`PhaseSizes`] is an ordered list of phase lengths. An item index (a
//! generation, an individual, a gene) is mapped to a phase by walking the
//! cumulative sizes. [`PhaseSizes::phase_of`] first reduces the index modulo the
//! total with a non-negative remainder, so phases repeat forever and negative
//! indices wrap around; [`PhaseSizes::locate`] does not wrap.

use std::sync::Arc;

use tracing::trace;

use crate::chromosome::Chromosome;
use crate::crossover::Crossover;
use crate::error::{GeneticError, Result};
use crate::metaheuristics::parameter::{ParamScope, Parameter};
use crate::metaheuristics::{
    ContainerMetaHeuristic, EvolutionContext, EvolutionStage, ScopedHandler, ScopedMetaHeuristic,
    SharedHeuristic,
};
use crate::mutation::Mutation;
use crate::reinsertion::Reinsertion;
use crate::selection::Selection;

/// A phase and the position inside it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PhasePosition {
    pub phase: usize,
    pub offset: usize,
}

/// Locates `index` in consecutive ranges of the given lengths.
///
/// # Returns
///
/// The range holding `index` and the offset inside it, or `None` when `index` is
/// past the last range.
pub fn locate_in(counts: &[usize], index: usize) -> Option<PhasePosition> {
    let mut start = 0;
    for (phase, &count) in counts.iter().enumerate() {
        if index < start + count {
            return Some(PhasePosition {
                phase,
                offset: index - start,
            });
        }
        start += count;
    }
    None
}

/// Ordered phase lengths.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSizes {
    sizes: Vec<usize>,
    total: usize,
}

impl PhaseSizes {
    /// Creates phase sizes.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if `sizes` is empty or sums to zero.
    pub fn new(sizes: Vec<usize>) -> Result<Self> {
        if sizes.is_empty() {
            return Err(GeneticError::Configuration(
                "At least one phase size is required".to_string(),
            ));
        }
        let total = sizes.iter().sum();
        if total == 0 {
            return Err(GeneticError::Configuration(
                "Phase sizes must not all be zero".to_string(),
            ));
        }
        Ok(Self { sizes, total })
    }

    /// Creates `count` phases of `size` items each.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if `count` or `size` is zero.
    pub fn uniform(count: usize, size: usize) -> Result<Self> {
        Self::new(vec![size; count])
    }

    /// Returns the phase lengths in order.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Returns the number of phases.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Returns the sum of the phase sizes.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Returns the index of the first item of every phase.
    pub fn offsets(&self) -> Vec<usize> {
        self.sizes
            .iter()
            .scan(0, |start, size| {
                let offset = *start;
                *start += size;
                Some(offset)
            })
            .collect()
    }

    /// Maps an item index to its phase, wrapping around the total.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use metagenalg::metaheuristics::{PhasePosition, PhaseSizes};
    ///
    /// let sizes = PhaseSizes::new(vec![3, 2]).unwrap();
    /// assert_eq!(sizes.phase_of(4), PhasePosition { phase: 1, offset: 1 });
    /// assert_eq!(sizes.phase_of(5), PhasePosition { phase: 0, offset: 0 });
    /// assert_eq!(sizes.phase_of(-1), PhasePosition { phase: 1, offset: 1 });
    /// ```
    pub fn phase_of(&self, item: i64) -> PhasePosition {
        let position = item.rem_euclid(self.total as i64) as usize;
        locate_in(&self.sizes, position).unwrap_or_default()
    }

    /// Maps an item index to its phase without wrapping.
    pub fn locate(&self, item: usize) -> Option<PhasePosition> {
        locate_in(&self.sizes, item)
    }

    /// Splits `total` items across the phases in proportion to their sizes, using
    /// the largest remainder method. The counts sum to `total`.
    pub fn apportion(&self, total: usize) -> Vec<usize> {
        let mut counts: Vec<usize> = self
            .sizes
            .iter()
            .map(|size| total * size / self.total)
            .collect();
        let missing = total - counts.iter().sum::<usize>();

        let mut remainders: Vec<(usize, usize)> = self
            .sizes
            .iter()
            .enumerate()
            .map(|(phase, size)| (phase, total * size % self.total))
            .collect();
        remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        for (phase, _) in remainders.into_iter().take(missing) {
            counts[phase] += 1;
        }
        counts
    }
}

/// Dispatches every stage to the heuristic of the current phase.
#[derive(Debug)]
pub struct SizeBased<C: Chromosome> {
    phase_sizes: PhaseSizes,
    heuristics: Vec<SharedHeuristic<C>>,
    phase: Arc<Parameter<C, PhasePosition>>,
}

/// A heuristic switching between sub-heuristics by the phase of an item index.
///
/// With [`by_generation`](SizeBasedMetaHeuristic::by_generation) the phases are
/// runs of generations; with [`by_population`](SizeBasedMetaHeuristic::by_population)
/// they are runs of individuals inside each generation.
pub type SizeBasedMetaHeuristic<C> = ScopedMetaHeuristic<C, SizeBased<C>>;

impl<C: Chromosome> ScopedMetaHeuristic<C, SizeBased<C>> {
    /// Creates a size-based heuristic.
    ///
    /// # Arguments
    ///
    /// * `scope` - The cache scope of the phase parameter.
    /// * `phase_sizes` - The phase lengths.
    /// * `heuristics` - One heuristic per phase.
    /// * `item_index` - Computes the raw item index from the context.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if the number of heuristics differs from
    /// the number of phases.
    pub fn new<F>(
        scope: ParamScope,
        phase_sizes: PhaseSizes,
        heuristics: Vec<SharedHeuristic<C>>,
        item_index: F,
    ) -> Result<Self>
    where
        F: Fn(&EvolutionContext<'_, C>) -> i64 + Send + Sync + 'static,
    {
        if heuristics.len() != phase_sizes.len() {
            return Err(GeneticError::Configuration(format!(
                "{} phases need {} heuristics, got {}",
                phase_sizes.len(),
                phase_sizes.len(),
                heuristics.len()
            )));
        }

        let sizes = phase_sizes.clone();
        let mut base = ContainerMetaHeuristic::new();
        let phase = base.register_parameter(Parameter::new("phase", scope, move |_, ctx| {
            Ok(sizes.phase_of(item_index(ctx)))
        }));
        Ok(Self::from_parts(
            base,
            EvolutionStage::ALL,
            SizeBased {
                phase_sizes,
                heuristics,
                phase,
            },
        ))
    }

    /// Switches by generation: the first generation is item 0.
    ///
    /// # Errors
    ///
    /// See [`SizeBasedMetaHeuristic::new`].
    pub fn by_generation(
        phase_sizes: PhaseSizes,
        heuristics: Vec<SharedHeuristic<C>>,
    ) -> Result<Self> {
        Self::new(
            ParamScope::GENERATION | ParamScope::META_HEURISTIC,
            phase_sizes,
            heuristics,
            |ctx| ctx.generation_number() as i64 - 1,
        )
    }

    /// Switches by individual inside every generation.
    ///
    /// # Errors
    ///
    /// See [`SizeBasedMetaHeuristic::new`].
    pub fn by_population(
        phase_sizes: PhaseSizes,
        heuristics: Vec<SharedHeuristic<C>>,
    ) -> Result<Self> {
        Self::new(
            ParamScope::GENERATION | ParamScope::META_HEURISTIC | ParamScope::INDIVIDUAL,
            phase_sizes,
            heuristics,
            |ctx| ctx.index() as i64,
        )
    }

    pub fn phase_sizes(&self) -> &PhaseSizes {
        &self.handler().phase_sizes
    }

    /// Returns the phase and offset of the context.
    ///
    /// # Errors
    ///
    /// Returns the error of the phase parameter.
    pub fn phase_position(&self, ctx: &EvolutionContext<'_, C>) -> Result<PhasePosition> {
        self.handler().phase.get(self.container(), ctx)
    }

    /// Returns the heuristic of the context's phase.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::MissingPhaseHeuristic` if the phase has no heuristic.
    pub fn current_heuristic(&self, ctx: &EvolutionContext<'_, C>) -> Result<SharedHeuristic<C>> {
        self.handler().current(self.container(), ctx)
    }
}

impl<C: Chromosome> SizeBased<C> {
    fn current(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
    ) -> Result<SharedHeuristic<C>> {
        let position = self.phase.get(owner, ctx)?;
        trace!(
            phase = position.phase,
            offset = position.offset,
            stage = ?ctx.stage(),
            "size-based dispatch"
        );
        self.heuristics
            .get(position.phase)
            .cloned()
            .ok_or_else(|| GeneticError::MissingPhaseHeuristic(format!("phase {}", position.phase)))
    }
}

impl<C: Chromosome> ScopedHandler<C> for SizeBased<C> {
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
