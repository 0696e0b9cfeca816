//! # Evolution Context
//!
//! An [`EvolutionContext`] is the state a metaheuristic sees while it dispatches
//! one generation: the population view, the generation's parameter cache, the
//! per-thread random streams, the run options, the current stage and the current
//! individual.
//!
//! The context is a `Copy` view made of borrows. Narrowing it to an individual,
//! a stage or a sub-population produces a new view sharing the same cache; nothing
//! is copied.
//!
//! Two indices are tracked:
//!
//! * `index` is the global identity of the individual being processed. It is the
//!   dimension used by `INDIVIDUAL`-scoped parameters.
//! * `local_index` is the position of that individual inside the list the current
//!   call receives. Composite heuristics that hand a sub-list to a child rewrite
//!   it; the global index is left alone.
//!
//! Islands own their sub-population and cache, so an island context rewrites
//! both indices to island-local positions.

use std::fmt;
use std::sync::Arc;

use crate::caching::{CacheKey, ParameterCache};
use crate::chromosome::Chromosome;
use crate::error::{GeneticError, Result};
use crate::evolution::EvolutionOptions;
use crate::metaheuristics::parameter::{ParamScope, ParameterValue};
use crate::metaheuristics::{EvolutionStage, HeuristicId, MetaHeuristic};
use crate::population::PopulationView;
use crate::rng::{RandomNumberGenerator, RngStreams};

/// The per-generation state shared by every heuristic of a composition.
pub struct EvolutionContext<'a, C: Chromosome> {
    population: &'a dyn PopulationView<C>,
    cache: &'a ParameterCache,
    rng: &'a RngStreams,
    options: Option<&'a EvolutionOptions>,
    stage: EvolutionStage,
    index: usize,
    local_index: usize,
}

impl<'a, C: Chromosome> EvolutionContext<'a, C> {
    /// Creates a context over `population` for one generation.
    ///
    /// # Arguments
    ///
    /// * `population` - The population being evolved.
    /// * `cache` - The cache of the generation.
    /// * `rng` - The random streams of the run.
    pub fn new(
        population: &'a dyn PopulationView<C>,
        cache: &'a ParameterCache,
        rng: &'a RngStreams,
    ) -> Self {
        Self {
            population,
            cache,
            rng,
            options: None,
            stage: EvolutionStage::NONE,
            index: 0,
            local_index: 0,
        }
    }

    /// Attaches the run options.
    pub fn with_options(mut self, options: &'a EvolutionOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Returns the population view.
    pub fn population(&self) -> &'a dyn PopulationView<C> {
        self.population
    }

    /// Returns the cache of the generation.
    pub fn cache(&self) -> &'a ParameterCache {
        self.cache
    }

    /// Returns the random streams of the run.
    pub fn rng_streams(&self) -> &'a RngStreams {
        self.rng
    }

    /// Returns the run options, when the context is driven by an algorithm.
    pub fn options(&self) -> Option<&'a EvolutionOptions> {
        self.options
    }

    /// Returns the current generation number.
    pub fn generation_number(&self) -> usize {
        self.population.generation_number()
    }

    /// Returns the current stage.
    pub fn stage(&self) -> EvolutionStage {
        self.stage
    }

    /// Returns the global index of the current individual.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the position of the current individual in the list being processed.
    pub fn local_index(&self) -> usize {
        self.local_index
    }

    /// Returns a view of this context at another stage.
    pub fn with_stage(&self, stage: EvolutionStage) -> Self {
        Self { stage, ..*self }
    }

    /// Returns a view of this context on individual `index`, which is both the
    /// global and the local index.
    pub fn individual(&self, index: usize) -> Self {
        Self {
            index,
            local_index: index,
            ..*self
        }
    }

    /// Returns a view of this context with another local index. The global index
    /// is kept.
    pub fn local(&self, local_index: usize) -> Self {
        Self {
            local_index,
            ..*self
        }
    }

    /// Returns a view of this context on a sub-population with its own cache, as
    /// used for islands and karyotype phases. Stage and indices are kept.
    pub fn with_population<'b>(
        &self,
        population: &'b dyn PopulationView<C>,
        cache: &'b ParameterCache,
    ) -> EvolutionContext<'b, C>
    where
        'a: 'b,
    {
        EvolutionContext {
            population,
            cache,
            rng: self.rng,
            options: self.options,
            stage: self.stage,
            index: self.index,
            local_index: self.local_index,
        }
    }

    /// Builds the cache key of parameter `name` for this context.
    pub fn cache_key(
        &self,
        name: impl Into<Arc<str>>,
        scope: ParamScope,
        heuristic: HeuristicId,
    ) -> CacheKey {
        CacheKey::scoped(
            name,
            scope,
            self.generation_number(),
            self.stage,
            heuristic,
            self.index,
        )
    }

    /// Builds the cache key of a value derived from the list `pool`. The address and
    /// length of `pool` join the name, so distinct lists seen in one context never
    /// share a value.
    pub fn pool_cache_key(
        &self,
        name: &str,
        pool: &[C],
        scope: ParamScope,
        heuristic: HeuristicId,
    ) -> CacheKey {
        self.cache_key(
            format!("{}@{:p}+{}", name, pool.as_ptr(), pool.len()),
            scope,
            heuristic,
        )
    }

    /// Returns the value cached under `key`, computing it with `generator` first
    /// if needed. See [`ParameterCache::get_or_add`].
    pub fn get_or_add<T, F>(&self, key: CacheKey, generator: F) -> Result<T>
    where
        T: ParameterValue,
        F: FnOnce() -> Result<T>,
    {
        self.cache.get_or_add(key, generator)
    }

    /// Resolves the parameter `name` registered on `heuristic`.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::UnregisteredParameter` if `heuristic` has no such
    /// parameter, `GeneticError::ParameterType` if it does not produce `T`, or the
    /// error of its generator.
    pub fn get_param<T: ParameterValue>(
        &self,
        heuristic: &dyn MetaHeuristic<C>,
        name: &str,
    ) -> Result<T> {
        let registry = heuristic
            .parameters()
            .ok_or_else(|| GeneticError::UnregisteredParameter(name.to_string()))?;
        registry.get::<T>(name)?.get(heuristic, self)
    }

    /// Runs `f` with the random stream of the calling thread.
    ///
    /// `f` must not resolve parameters of this context.
    pub fn with_rng<R>(&self, f: impl FnOnce(&mut RandomNumberGenerator) -> R) -> R {
        self.rng.with_rng(f)
    }
}

impl<C: Chromosome> Clone for EvolutionContext<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: Chromosome> Copy for EvolutionContext<'_, C> {}

impl<C: Chromosome> fmt::Debug for EvolutionContext<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvolutionContext")
            .field("generation", &self.generation_number())
            .field("stage", &self.stage)
            .field("index", &self.index)
            .field("local_index", &self.local_index)
            .finish()
    }
}
