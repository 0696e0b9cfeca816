//! # Metaheuristics
//!
//! A metaheuristic decides how the four stages of a generation (selection,
//! crossover, mutation and reinsertion) are applied to a population. The
//! [`MetaGeneticAlgorithm`](crate::evolution::MetaGeneticAlgorithm) never calls
//! its operators directly; it hands them to a [`MetaHeuristic`] together with an
//! [`EvolutionContext`], and the metaheuristic chooses which chromosomes the
//! operators see and which sub-heuristic handles them.
//!
//! Metaheuristics compose like a small tree:
//!
//! * [`DefaultMetaHeuristic`] is a leaf applying the operators as a plain genetic
//!   algorithm would.
//! * [`ContainerMetaHeuristic`] wraps a sub-heuristic, owns a parameter registry
//!   and gates crossover and mutation by a [`ProbabilityStrategy`].
//! * [`ScopedMetaHeuristic`] overrides the stages of an [`EvolutionStage`] mask
//!   through a [`ScopedHandler`] and forwards the other stages to its
//!   sub-heuristic. Every composite heuristic of this module is a scoped one:
//!   [`OperatorsMetaHeuristic`], [`SwitchMetaHeuristic`], [`SizeBasedMetaHeuristic`],
//!   [`MatchMetaHeuristic`], [`IslandMetaHeuristic`] and [`EukaryoteMetaHeuristic`].
//!
//! Values a heuristic computes while dispatching (phase indices, roulette wheels,
//! island slices) are [`Parameter`]s cached in the context with a [`ParamScope`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use metagenalg::chromosome::BinaryChromosome;
//! use metagenalg::metaheuristics::{
//!     DefaultMetaHeuristic, MatchMetaHeuristic, MatchingTechnique, PhaseSizes,
//!     SharedHeuristic, SizeBasedMetaHeuristic,
//! };
//!
//! // Alternate every 5 generations between plain crossover and best-mate crossover.
//! let plain: SharedHeuristic<BinaryChromosome> = Arc::new(DefaultMetaHeuristic::new());
//! let elitist: SharedHeuristic<BinaryChromosome> =
//!     Arc::new(MatchMetaHeuristic::<BinaryChromosome>::new(vec![MatchingTechnique::Best]).unwrap());
//!
//! let alternating = SizeBasedMetaHeuristic::by_generation(
//!     PhaseSizes::new(vec![5, 5]).unwrap(),
//!     vec![plain, elitist],
//! )
//! .unwrap();
//! # let _ = alternating;
//! ```

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::chromosome::Chromosome;
use crate::crossover::Crossover;
use crate::error::Result;
use crate::mutation::Mutation;
use crate::reinsertion::Reinsertion;
use crate::selection::Selection;

pub mod container;
pub mod context;
pub mod default;
pub mod eukaryote;
pub mod island;
pub mod matching;
pub mod operators;
pub mod parameter;
pub mod phase;
pub mod scoped;
pub mod switch;

pub use container::ContainerMetaHeuristic;
pub use context::EvolutionContext;
pub use default::DefaultMetaHeuristic;
pub use eukaryote::{EukaryoteMetaHeuristic, Karyotype, SubChromosome};
pub use island::{IslandGeneration, IslandMetaHeuristic, MigrationMode};
pub use matching::{MatchMetaHeuristic, MatchingTechnique};
pub use operators::OperatorsMetaHeuristic;
pub use parameter::{
    generator, Binding, ParamScope, Parameter, ParameterExpression, ParameterGenerator,
    ParameterRegistry, ParameterValue,
};
pub use phase::{PhasePosition, PhaseSizes, SizeBasedMetaHeuristic};
pub use scoped::{ScopedHandler, ScopedMetaHeuristic};
pub use switch::SwitchMetaHeuristic;

flags! {
    /// The stages of a generation, as a bit set.
    pub struct EvolutionStage: u8 {
        const NONE = 0;
        const SELECTION = 1;
        const CROSSOVER = 2;
        const MUTATION = 4;
        const REINSERTION = 8;
        const ALL = 15;
    }
}

flags! {
    /// How a container treats the crossover and mutation probabilities it receives.
    pub struct ProbabilityStrategy: u8 {
        const NONE = 0;
        /// Draw once and skip the operation when the draw fails.
        const TEST_PROBABILITY = 1;
        /// Replace the caller's probability with the container's static one.
        const OVERWRITE_PROBABILITY = 2;
    }
}

/// Process-unique identity of a metaheuristic node, used as a cache dimension.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct HeuristicId(u64);

impl HeuristicId {
    /// The identity of no heuristic, used for masked cache dimensions.
    pub const NONE: Self = Self(0);

    /// Allocates a fresh identity.
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identifier.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HeuristicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A metaheuristic shared by several composite nodes.
pub type SharedHeuristic<C> = Arc<dyn MetaHeuristic<C>>;

/// The four-stage contract the genetic algorithm drives every generation.
///
/// Every method receives the evolution context of the current generation, narrowed
/// to the individual being processed where that applies. Implementations must be
/// callable concurrently from the worker threads of a generation.
pub trait MetaHeuristic<C: Chromosome>: Debug + Send + Sync {
    /// Returns the identity of this node.
    fn id(&self) -> HeuristicId;

    /// Returns the parameters registered on this node, if it has any.
    fn parameters(&self) -> Option<&ParameterRegistry<C>> {
        None
    }

    /// Selects `count` parents from the context population.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection operator or a dispatch step fails.
    fn select_parent_chromosomes(
        &self,
        ctx: &EvolutionContext<'_, C>,
        selection: &dyn Selection<C>,
        count: usize,
    ) -> Result<Vec<C>>;

    /// Matches the parent at `ctx.local_index()` with mates from `parents` and
    /// crosses them.
    ///
    /// # Returns
    ///
    /// The children, or `None` when no crossover took place.
    ///
    /// # Errors
    ///
    /// Returns an error if the crossover operator or a dispatch step fails.
    fn match_parents_and_cross(
        &self,
        ctx: &EvolutionContext<'_, C>,
        crossover: &dyn Crossover<C>,
        probability: f32,
        parents: &[C],
    ) -> Result<Option<Vec<C>>>;

    /// Mutates the offspring at `ctx.local_index()` in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation operator or a dispatch step fails.
    fn mutate_chromosome(
        &self,
        ctx: &EvolutionContext<'_, C>,
        mutation: &dyn Mutation<C>,
        probability: f32,
        chromosome: &mut C,
    ) -> Result<()>;

    /// Selects the chromosomes of the next generation.
    ///
    /// # Errors
    ///
    /// Returns an error if the reinsertion operator or a dispatch step fails, or if
    /// the heuristic does not support reinsertion.
    fn reinsert(
        &self,
        ctx: &EvolutionContext<'_, C>,
        reinsertion: &dyn Reinsertion<C>,
        offspring: Vec<C>,
        parents: Vec<C>,
    ) -> Result<Vec<C>>;
}
