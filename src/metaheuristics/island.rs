//! # Island Model
//!
//! [`IslandMetaHeuristic`] splits the population into contiguous islands, one per
//! phase size, and evolves each island with its own heuristic. Every
//! `migration_period` generations, individuals migrate between islands according
//! to a [`MigrationMode`].
//!
//! The islands of a generation are built once, the first time a stage needs them,
//! and cached in the generation's context. Each island gets its own
//! [`SubPopulation`] and [`ParameterCache`], so the heuristics running on islands
//! see island-local chromosomes and indices.
//!
//! ## Stage translation
//!
//! * Selection: the requested count is split across islands in proportion to their
//!   sizes and the selected parents are concatenated in island order.
//! * Crossover: the parent list is split the same way; the individual index is
//!   translated to an island and an island-local offset.
//! * Mutation: the offspring index is located with the offspring counts each island
//!   produced during crossover.
//! * Reinsertion: offspring and parents are split per island, reinserted by each
//!   island heuristic and concatenated.
//!
//! Island sizes should be multiples of the crossover's parent count, otherwise the
//! last parents of an island are never crossed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::caching::ParameterCache;
use crate::chromosome::Chromosome;
use crate::crossover::Crossover;
use crate::error::{GeneticError, Result};
use crate::metaheuristics::matching::{pick_individuals, MatchingTechnique};
use crate::metaheuristics::parameter::ParamScope;
use crate::metaheuristics::phase::{locate_in, PhaseSizes};
use crate::metaheuristics::{
    ContainerMetaHeuristic, EvolutionContext, EvolutionStage, MetaHeuristic, ScopedHandler,
    ScopedMetaHeuristic, SharedHeuristic,
};
use crate::mutation::Mutation;
use crate::population::{PopulationView, SubPopulation};
use crate::reinsertion::Reinsertion;
use crate::rng::RandomNumberGenerator;
use crate::selection::Selection;

const ISLANDS_SCOPE: ParamScope = ParamScope::GENERATION.union(ParamScope::META_HEURISTIC);

/// How migration rates between islands are chosen.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MigrationMode {
    /// Islands never exchange individuals.
    #[default]
    None,
    /// Every island sends an even share of the migration rate to every other one.
    Static,
    /// Islands form one random cycle; each sends to its successor.
    RandomRing,
    /// Each island sends to the island a random permutation maps it to.
    RandomPermutation,
    /// Like `Static`.
    Reinforced,
}

/// The migration-rate matrix of `Static` mode: each island keeps `1 - rate` and
/// splits `rate` evenly among the others. A single island keeps everything.
pub fn static_migration_rates(islands: usize, rate: f64) -> Vec<Vec<f64>> {
    if islands == 1 {
        return vec![vec![1.0]];
    }
    let share = rate / (islands - 1) as f64;
    (0..islands)
        .map(|source| {
            (0..islands)
                .map(|target| if source == target { 1.0 - rate } else { share })
                .collect()
        })
        .collect()
}

/// Turns a permutation of island indices into the successor table of a single
/// cycle visiting the islands in that order.
///
/// With two islands or more, no island is its own successor and every island has
/// exactly one predecessor. A single island is its own successor.
///
/// # Errors
///
/// Returns `GeneticError::Configuration` if `order` is not a permutation of
/// `0..order.len()`.
pub fn ring_successors(order: &[usize]) -> Result<Vec<usize>> {
    let n = order.len();
    let mut seen = vec![false; n];
    for &island in order {
        if island >= n || seen[island] {
            return Err(GeneticError::Configuration(format!(
                "{:?} is not a permutation of the island indices",
                order
            )));
        }
        seen[island] = true;
    }

    let mut successors = vec![0; n];
    for (k, &island) in order.iter().enumerate() {
        successors[island] = order[(k + 1) % n];
    }
    Ok(successors)
}

fn targeted_rates(targets: &[usize], rate: f64) -> Vec<Vec<f64>> {
    let n = targets.len();
    targets
        .iter()
        .enumerate()
        .map(|(source, &target)| {
            let mut row = vec![0.0; n];
            row[source] = 1.0 - rate;
            row[target] += rate;
            row
        })
        .collect()
}

/// The islands of one generation, with their caches and the number of offspring
/// each produced.
#[derive(Debug)]
pub struct IslandGeneration<C: Chromosome> {
    islands: Vec<SubPopulation<C>>,
    caches: Vec<ParameterCache>,
    offspring_counts: Vec<AtomicUsize>,
}

impl<C: Chromosome> IslandGeneration<C> {
    fn new(islands: Vec<SubPopulation<C>>) -> Self {
        let caches = islands.iter().map(|_| ParameterCache::new()).collect();
        let offspring_counts = islands.iter().map(|_| AtomicUsize::new(0)).collect();
        Self {
            islands,
            caches,
            offspring_counts,
        }
    }

    /// Returns the islands in order.
    pub fn islands(&self) -> &[SubPopulation<C>] {
        &self.islands
    }

    /// Returns the number of chromosomes over all islands.
    pub fn chromosomes_number(&self) -> usize {
        self.islands.iter().map(SubPopulation::len).sum()
    }

    /// Returns how many offspring each island has produced so far.
    pub fn offspring_counts(&self) -> Vec<usize> {
        self.offspring_counts
            .iter()
            .map(|count| count.load(Ordering::SeqCst))
            .collect()
    }

    /// Narrows `ctx` to island `island`, on the individual at island-local
    /// position `offset`.
    fn context<'b>(
        &'b self,
        ctx: &EvolutionContext<'b, C>,
        island: usize,
        offset: usize,
    ) -> EvolutionContext<'b, C> {
        ctx.with_population(&self.islands[island], &self.caches[island])
            .individual(offset)
    }
}

/// The configuration of an [`IslandMetaHeuristic`].
#[derive(Debug)]
pub struct Islands<C: Chromosome> {
    phase_sizes: PhaseSizes,
    heuristics: Vec<SharedHeuristic<C>>,
    migration_mode: MigrationMode,
    migration_period: usize,
    migration_rate: f64,
    emigrant_picker: MatchingTechnique,
    victim_picker: MatchingTechnique,
}

/// A heuristic evolving islands of the population separately.
pub type IslandMetaHeuristic<C> = ScopedMetaHeuristic<C, Islands<C>>;

impl<C: Chromosome> ScopedMetaHeuristic<C, Islands<C>> {
    /// Creates an island heuristic with one island per phase size.
    ///
    /// # Arguments
    ///
    /// * `phase_sizes` - The island sizes; they must sum to the population size.
    /// * `heuristics` - The heuristic of every island.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if the number of heuristics differs from
    /// the number of islands, or if an island is empty.
    pub fn new(phase_sizes: PhaseSizes, heuristics: Vec<SharedHeuristic<C>>) -> Result<Self> {
        if heuristics.len() != phase_sizes.len() {
            return Err(GeneticError::Configuration(format!(
                "{} islands need {} heuristics, got {}",
                phase_sizes.len(),
                phase_sizes.len(),
                heuristics.len()
            )));
        }
        if phase_sizes.sizes().contains(&0) {
            return Err(GeneticError::Configuration(
                "Every island must hold at least one chromosome".to_string(),
            ));
        }
        Ok(Self::scoped(
            EvolutionStage::ALL,
            Islands {
                phase_sizes,
                heuristics,
                migration_mode: MigrationMode::None,
                migration_period: 10,
                migration_rate: 0.1,
                emigrant_picker: MatchingTechnique::Best,
                victim_picker: MatchingTechnique::Worst,
            },
        ))
    }

    /// Creates `count` islands of `size` chromosomes sharing one heuristic.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if `count` or `size` is zero.
    pub fn uniform(count: usize, size: usize, heuristic: SharedHeuristic<C>) -> Result<Self> {
        Self::new(
            PhaseSizes::uniform(count, size)?,
            vec![heuristic; count],
        )
    }

    /// Sets how migration rates are chosen.
    pub fn with_migration_mode(mut self, mode: MigrationMode) -> Self {
        self.handler_mut().migration_mode = mode;
        self
    }

    /// Sets how many generations separate two migrations.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if `period` is zero.
    pub fn with_migration_period(mut self, period: usize) -> Result<Self> {
        if period == 0 {
            return Err(GeneticError::Configuration(
                "The migration period must be at least 1".to_string(),
            ));
        }
        self.handler_mut().migration_period = period;
        Ok(self)
    }

    /// Sets the share of an island that emigrates at every migration.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if `rate` is not in `[0, 1]`.
    pub fn with_migration_rate(mut self, rate: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(GeneticError::Configuration(format!(
                "The migration rate must be between 0 and 1, got {}",
                rate
            )));
        }
        self.handler_mut().migration_rate = rate;
        Ok(self)
    }

    /// Sets how emigrants are picked in their source island.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::UnsupportedMatching` for `Neighbor`.
    pub fn with_emigrant_picker(mut self, picker: MatchingTechnique) -> Result<Self> {
        check_picker(picker, "picking emigrants")?;
        self.handler_mut().emigrant_picker = picker;
        Ok(self)
    }

    /// Sets how the individuals replaced by immigrants are picked.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::UnsupportedMatching` for `Neighbor`.
    pub fn with_victim_picker(mut self, picker: MatchingTechnique) -> Result<Self> {
        check_picker(picker, "picking migration victims")?;
        self.handler_mut().victim_picker = picker;
        Ok(self)
    }

    /// Returns the number of islands.
    pub fn islands_number(&self) -> usize {
        self.handler().phase_sizes.len()
    }

    pub fn migration_mode(&self) -> MigrationMode {
        self.handler().migration_mode
    }

    pub fn migration_period(&self) -> usize {
        self.handler().migration_period
    }

    pub fn migration_rate(&self) -> f64 {
        self.handler().migration_rate
    }

    /// Returns the islands of the context's generation, building them on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::OutOfRange` if the population size differs from the
    /// total island size.
    pub fn island_generation(
        &self,
        ctx: &EvolutionContext<'_, C>,
    ) -> Result<Arc<IslandGeneration<C>>> {
        self.handler().generation(self.container(), ctx)
    }
}

fn check_picker(picker: MatchingTechnique, usage: &str) -> Result<()> {
    if picker == MatchingTechnique::Neighbor {
        return Err(GeneticError::UnsupportedMatching {
            technique: "Neighbor".to_string(),
            usage: usage.to_string(),
        });
    }
    Ok(())
}

impl<C: Chromosome> Islands<C> {
    fn generation(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
    ) -> Result<Arc<IslandGeneration<C>>> {
        let key = ctx.cache_key("islands", ISLANDS_SCOPE, owner.id());
        ctx.get_or_add(key, || self.build_generation(ctx).map(Arc::new))
    }

    fn build_generation(&self, ctx: &EvolutionContext<'_, C>) -> Result<IslandGeneration<C>> {
        let chromosomes = ctx.population().chromosomes();
        if chromosomes.len() != self.phase_sizes.total() {
            return Err(GeneticError::OutOfRange(format!(
                "The population holds {} chromosomes but the islands hold {}",
                chromosomes.len(),
                self.phase_sizes.total()
            )));
        }

        let generation_number = ctx.generation_number();
        let mut islands: Vec<SubPopulation<C>> = self
            .phase_sizes
            .offsets()
            .into_iter()
            .zip(self.phase_sizes.sizes())
            .map(|(offset, size)| {
                SubPopulation::new(generation_number, chromosomes[offset..offset + size].to_vec())
            })
            .collect();

        if self.migration_mode != MigrationMode::None
            && islands.len() > 1
            && generation_number % self.migration_period == 0
        {
            ctx.with_rng(|rng| {
                let rates = self.migration_rates(islands.len(), rng)?;
                for (island, row) in islands.iter_mut().zip(rates) {
                    island.set_migration_rates(row);
                }
                self.migrate(&mut islands, rng)
            })?;
        }

        Ok(IslandGeneration::new(islands))
    }

    fn migration_rates(
        &self,
        islands: usize,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<Vec<f64>>> {
        let rate = self.migration_rate;
        let rates = match self.migration_mode {
            MigrationMode::None => targeted_rates(&(0..islands).collect::<Vec<_>>(), 0.0),
            MigrationMode::Static | MigrationMode::Reinforced => {
                static_migration_rates(islands, rate)
            }
            MigrationMode::RandomPermutation => targeted_rates(&rng.permutation(islands), rate),
            MigrationMode::RandomRing => {
                targeted_rates(&ring_successors(&rng.permutation(islands))?, rate)
            }
        };
        Ok(rates)
    }

    /// Moves copies of emigrants into target islands in place of victims.
    /// Emigrants are picked among the chromosomes islands held before migration.
    fn migrate(
        &self,
        islands: &mut [SubPopulation<C>],
        rng: &mut RandomNumberGenerator,
    ) -> Result<()> {
        let snapshot: Vec<Vec<C>> = islands
            .iter()
            .map(|island| island.chromosomes().to_vec())
            .collect();

        for source in 0..islands.len() {
            let rates = islands[source].migration_rates().to_vec();
            for (target, rate) in rates.into_iter().enumerate() {
                if target == source || rate <= 0.0 {
                    continue;
                }

                let exact = rate * snapshot[source].len() as f64;
                let mut count = exact.floor() as usize;
                if rng.gen_probability() < exact - exact.floor() {
                    count += 1;
                }
                let count = count
                    .min(snapshot[source].len())
                    .min(islands[target].len());
                if count == 0 {
                    continue;
                }

                let emigrants = pick_individuals(self.emigrant_picker, &snapshot[source], count, rng)?;
                let island = &mut islands[target];
                let mut victims =
                    pick_individuals(self.victim_picker, island.chromosomes(), count, rng)?;
                victims.sort_unstable_by(|a, b| b.cmp(a));
                let chromosomes = island.chromosomes_mut();
                for victim in victims {
                    chromosomes.remove(victim);
                }
                chromosomes.extend(emigrants.iter().map(|&e| snapshot[source][e].clone()));
                island.refresh_best();

                debug!(source, target, migrants = count, "island migration");
            }
        }
        Ok(())
    }

    /// Splits `items` into consecutive runs of the given lengths.
    fn split<T>(items: Vec<T>, counts: &[usize]) -> Vec<Vec<T>> {
        let mut items = items.into_iter();
        counts
            .iter()
            .map(|count| items.by_ref().take(*count).collect())
            .collect()
    }
}

impl<C: Chromosome> ScopedHandler<C> for Islands<C> {
    fn select(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        selection: &dyn Selection<C>,
        count: usize,
    ) -> Result<Vec<C>> {
        let generation = self.generation(owner, ctx)?;
        let counts = self.phase_sizes.apportion(count);

        let mut selected = Vec::with_capacity(count);
        for (island, island_count) in counts.into_iter().enumerate() {
            if island_count == 0 {
                continue;
            }
            let island_ctx = generation.context(ctx, island, 0);
            selected.extend(self.heuristics[island].select_parent_chromosomes(
                &island_ctx,
                selection,
                island_count,
            )?);
        }
        Ok(selected)
    }

    fn cross(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        crossover: &dyn Crossover<C>,
        probability: f32,
        parents: &[C],
    ) -> Result<Option<Vec<C>>> {
        let generation = self.generation(owner, ctx)?;
        let counts = self.phase_sizes.apportion(parents.len());
        let Some(position) = locate_in(&counts, ctx.local_index()) else {
            return Ok(None);
        };

        let start: usize = counts[..position.phase].iter().sum();
        let island_parents = &parents[start..start + counts[position.phase]];
        let island_ctx = generation.context(ctx, position.phase, position.offset);
        let children = self.heuristics[position.phase].match_parents_and_cross(
            &island_ctx,
            crossover,
            probability,
            island_parents,
        )?;

        if let Some(children) = &children {
            generation.offspring_counts[position.phase].fetch_add(children.len(), Ordering::SeqCst);
        }
        Ok(children)
    }

    fn mutate(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        mutation: &dyn Mutation<C>,
        probability: f32,
        chromosome: &mut C,
    ) -> Result<()> {
        let generation = self.generation(owner, ctx)?;
        let counts = generation.offspring_counts();
        let position = locate_in(&counts, ctx.local_index())
            .unwrap_or_else(|| self.phase_sizes.phase_of(ctx.local_index() as i64));

        let island_ctx = generation.context(ctx, position.phase, position.offset);
        self.heuristics[position.phase].mutate_chromosome(&island_ctx, mutation, probability, chromosome)
    }

    fn reinsert(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        reinsertion: &dyn Reinsertion<C>,
        offspring: Vec<C>,
        parents: Vec<C>,
    ) -> Result<Vec<C>> {
        let generation = self.generation(owner, ctx)?;

        let mut offspring_counts = generation.offspring_counts();
        if offspring_counts.iter().sum::<usize>() != offspring.len() {
            offspring_counts = self.phase_sizes.apportion(offspring.len());
        }
        let parent_counts = self.phase_sizes.apportion(parents.len());

        let offspring = Self::split(offspring, &offspring_counts);
        let parents = Self::split(parents, &parent_counts);

        let mut next = Vec::with_capacity(self.phase_sizes.total());
        for (island, (island_offspring, island_parents)) in
            offspring.into_iter().zip(parents).enumerate()
        {
            let island_ctx = generation.context(ctx, island, 0);
            next.extend(self.heuristics[island].reinsert(
                &island_ctx,
                reinsertion,
                island_offspring,
                island_parents,
            )?);
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chromosome::BinaryChromosome;
    use crate::metaheuristics::DefaultMetaHeuristic;
    use crate::rng::RngStreams;
    use crate::selection::EliteSelection;

    type C = BinaryChromosome;

    fn population(generation: usize, size: usize) -> SubPopulation<C> {
        let chromosomes = (0..size)
            .map(|i| {
                let mut c = BinaryChromosome::from_genes(vec![i % 2 == 0; 4]);
                c.set_fitness(Some(i as f64));
                c
            })
            .collect();
        SubPopulation::new(generation, chromosomes)
    }

    fn islands(count: usize, size: usize) -> IslandMetaHeuristic<C> {
        IslandMetaHeuristic::uniform(count, size, Arc::new(DefaultMetaHeuristic::new())).unwrap()
    }

    #[test]
    fn test_ring_successors_for_small_rings() {
        assert_eq!(ring_successors(&[0]).unwrap(), vec![0]);
        assert_eq!(ring_successors(&[1, 0]).unwrap(), vec![1, 0]);
        assert_eq!(ring_successors(&[0, 1]).unwrap(), vec![1, 0]);
        assert!(ring_successors(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_ring_is_a_single_cycle() {
        let successors = ring_successors(&[3, 0, 4, 1, 2]).unwrap();
        let mut visited = vec![false; 5];
        let mut island = 0;
        for _ in 0..5 {
            assert!(!visited[island]);
            visited[island] = true;
            assert_ne!(successors[island], island);
            island = successors[island];
        }
        assert_eq!(island, 0);
    }

    #[test]
    fn test_ring_rejects_non_permutations() {
        assert!(matches!(
            ring_successors(&[0, 0]),
            Err(GeneticError::Configuration(_))
        ));
        assert!(matches!(
            ring_successors(&[2, 0]),
            Err(GeneticError::Configuration(_))
        ));
    }

    #[test]
    fn test_static_rates_rows_sum_to_one() {
        let rates = static_migration_rates(4, 0.3);
        for row in &rates {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
        assert!((rates[0][0] - 0.7).abs() < 1e-12);
        assert_eq!(static_migration_rates(1, 0.3), vec![vec![1.0]]);
    }

    #[test]
    fn test_population_size_must_match() {
        let heuristic = islands(2, 3);
        let pop = population(1, 5);
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(1);
        let ctx = EvolutionContext::new(&pop, &cache, &rng);
        assert!(matches!(
            heuristic.island_generation(&ctx),
            Err(GeneticError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(IslandMetaHeuristic::<C>::new(
            PhaseSizes::new(vec![2, 2]).unwrap(),
            vec![Arc::new(DefaultMetaHeuristic::new())],
        )
        .is_err());
        assert!(islands(2, 2).with_migration_period(0).is_err());
        assert!(islands(2, 2).with_migration_rate(1.5).is_err());
        assert!(matches!(
            islands(2, 2).with_emigrant_picker(MatchingTechnique::Neighbor),
            Err(GeneticError::UnsupportedMatching { .. })
        ));
    }

    #[test]
    fn test_migration_preserves_island_sizes() {
        for mode in [
            MigrationMode::Static,
            MigrationMode::RandomRing,
            MigrationMode::RandomPermutation,
            MigrationMode::Reinforced,
        ] {
            let heuristic = islands(3, 4)
                .with_migration_mode(mode)
                .with_migration_period(2)
                .unwrap()
                .with_migration_rate(0.5)
                .unwrap();
            let pop = population(4, 12);
            let cache = ParameterCache::new();
            let rng = RngStreams::from_seed(13);
            let ctx = EvolutionContext::new(&pop, &cache, &rng);

            let generation = heuristic.island_generation(&ctx).unwrap();
            assert_eq!(generation.chromosomes_number(), 12);
            assert!(generation.islands().iter().all(|island| island.len() == 4));
            for island in generation.islands() {
                let sum: f64 = island.migration_rates().iter().sum();
                assert!((sum - 1.0).abs() < 1e-12, "{:?}", mode);
            }
        }
    }

    #[test]
    fn test_best_emigrants_reach_other_islands() {
        let heuristic = islands(2, 4)
            .with_migration_mode(MigrationMode::Static)
            .with_migration_period(1)
            .unwrap()
            .with_migration_rate(0.5)
            .unwrap();
        let pop = population(1, 8);
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(13);
        let ctx = EvolutionContext::new(&pop, &cache, &rng);

        let generation = heuristic.island_generation(&ctx).unwrap();
        // Island 0 holds fitness 0..4 and receives the two best of island 1.
        let mut first: Vec<f64> = generation.islands()[0]
            .chromosomes()
            .iter()
            .filter_map(|c| c.fitness())
            .collect();
        first.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(first, vec![2.0, 3.0, 6.0, 7.0]);
    }

    #[test]
    fn test_no_migration_off_period() {
        let heuristic = islands(2, 4)
            .with_migration_mode(MigrationMode::Static)
            .with_migration_period(3)
            .unwrap();
        let pop = population(2, 8);
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(13);
        let ctx = EvolutionContext::new(&pop, &cache, &rng);

        let generation = heuristic.island_generation(&ctx).unwrap();
        assert_eq!(
            generation.islands()[0].chromosomes(),
            &pop.chromosomes()[..4]
        );
    }

    #[test]
    fn test_selection_is_split_across_islands() {
        let heuristic = islands(2, 4);
        let pop = population(1, 8);
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(13);
        let ctx = EvolutionContext::new(&pop, &cache, &rng)
            .with_stage(EvolutionStage::SELECTION);

        let selected = heuristic
            .select_parent_chromosomes(&ctx, &EliteSelection::new(), 4)
            .unwrap();
        let fitness: Vec<f64> = selected.iter().filter_map(|c| c.fitness()).collect();
        // The two best of each island, island 0 first
        assert_eq!(fitness, vec![3.0, 2.0, 7.0, 6.0]);
        // Built once for the generation
        assert_eq!(cache.generator_runs(), 1);
    }
}
