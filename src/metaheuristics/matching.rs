//! # Parent Matching
//!
//! [`MatchMetaHeuristic`] decides which parents a crossover sees. The parent at the
//! context's local index is the reference; each further slot the crossover needs
//! is filled by a [`MatchingTechnique`]. The matched parents are then handed to
//! the sub-heuristic, which performs the cross.
//!
//! The same techniques pick migrants and victims for islands through
//! [`pick_individuals`].

use std::sync::Arc;

use tracing::trace;

use crate::chromosome::Chromosome;
use crate::crossover::Crossover;
use crate::error::{GeneticError, Result};
use crate::metaheuristics::parameter::ParamScope;
use crate::metaheuristics::{
    ContainerMetaHeuristic, EvolutionContext, EvolutionStage, MetaHeuristic, ScopedHandler,
    ScopedMetaHeuristic,
};
use crate::population::compare_fitness;
use crate::rng::RandomNumberGenerator;
use crate::selection::roulette::{cumulative_wheel, spin_wheel};

/// Cache scope of the roulette wheel built over a parent pool.
const WHEEL_SCOPE: ParamScope = ParamScope::GENERATION
    .union(ParamScope::STAGE)
    .union(ParamScope::META_HEURISTIC);

/// How a mate (or a migrant) is chosen.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchingTechnique {
    /// The parents following the reference, in order.
    Neighbor,
    /// A uniformly random parent.
    Randomize,
    /// A parent drawn with probability proportional to its fitness.
    RouletteWheel,
    /// The best chromosome tracked by the population.
    Best,
    /// The parent with the lowest fitness.
    Worst,
}

/// The matching configuration of a [`MatchMetaHeuristic`].
#[derive(Debug, Clone)]
pub struct Matcher {
    techniques: Vec<MatchingTechnique>,
    hyperspeed: bool,
}

/// A heuristic choosing the mates of every crossover.
pub type MatchMetaHeuristic<C> = ScopedMetaHeuristic<C, Matcher>;

impl<C: Chromosome> ScopedMetaHeuristic<C, Matcher> {
    /// Creates a matching heuristic. `techniques[k]` fills mate slot `k`; the last
    /// technique fills every further slot.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if `techniques` is empty.
    pub fn new(techniques: Vec<MatchingTechnique>) -> Result<Self> {
        if techniques.is_empty() {
            return Err(GeneticError::Configuration(
                "A matching heuristic needs at least one technique".to_string(),
            ));
        }
        Ok(Self::scoped(
            EvolutionStage::CROSSOVER,
            Matcher {
                techniques,
                hyperspeed: false,
            },
        ))
    }

    /// Skips crosses whose mates all have the reference's fitness.
    pub fn with_hyperspeed(mut self, hyperspeed: bool) -> Self {
        self.handler_mut().hyperspeed = hyperspeed;
        self
    }

    /// Returns the technique of every mate slot.
    pub fn techniques(&self) -> &[MatchingTechnique] {
        &self.handler().techniques
    }
}

impl Matcher {
    fn technique(&self, slot: usize) -> MatchingTechnique {
        let last = self.techniques.len().saturating_sub(1);
        self.techniques
            .get(slot.min(last))
            .copied()
            .unwrap_or(MatchingTechnique::Randomize)
    }

    fn pick_mate<C: Chromosome>(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        parents: &[C],
        reference: usize,
        slot: usize,
    ) -> Result<Option<C>> {
        let mate = match self.technique(slot) {
            MatchingTechnique::Neighbor => parents.get(reference + slot + 1).cloned(),
            MatchingTechnique::Randomize => Some(random_pick(ctx, parents)),
            MatchingTechnique::RouletteWheel => {
                let wheel = roulette_wheel(owner, ctx, parents)?;
                let index = match wheel.as_deref() {
                    Some(wheel) => ctx.with_rng(|rng| spin_wheel(wheel, rng.gen_probability())),
                    None => ctx.with_rng(|rng| rng.gen_range(0..parents.len())),
                };
                parents.get(index).cloned()
            }
            MatchingTechnique::Best => match ctx.population().best_chromosome() {
                Some(best) => Some(best.clone()),
                None => Some(random_pick(ctx, parents)),
            },
            MatchingTechnique::Worst => parents
                .iter()
                .min_by(|a, b| compare_fitness(*a, *b))
                .cloned(),
        };
        Ok(mate)
    }
}

fn random_pick<C: Chromosome>(ctx: &EvolutionContext<'_, C>, parents: &[C]) -> C {
    let index = ctx.with_rng(|rng| rng.gen_range(0..parents.len()));
    parents[index].clone()
}

fn fitness_weights<C: Chromosome>(chromosomes: &[C]) -> Vec<f64> {
    chromosomes
        .iter()
        .map(|c| c.fitness().unwrap_or(0.0))
        .collect()
}

/// Returns the wheel over `parents`, cached once per parent pool, generation,
/// stage and heuristic. `None` means the fitness values cannot form a wheel.
fn roulette_wheel<C: Chromosome>(
    owner: &ContainerMetaHeuristic<C>,
    ctx: &EvolutionContext<'_, C>,
    parents: &[C],
) -> Result<Arc<Option<Vec<f64>>>> {
    let key = ctx.pool_cache_key("roulette_wheel", parents, WHEEL_SCOPE, owner.id());
    ctx.get_or_add(key, || Ok(Arc::new(cumulative_wheel(&fitness_weights(parents)))))
}

impl<C: Chromosome> ScopedHandler<C> for Matcher {
    fn cross(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        crossover: &dyn Crossover<C>,
        probability: f32,
        parents: &[C],
    ) -> Result<Option<Vec<C>>> {
        let reference_index = ctx.local_index();
        let Some(reference) = parents.get(reference_index) else {
            return Ok(None);
        };

        let parents_number = crossover.parents_number();
        let mut matched = Vec::with_capacity(parents_number);
        matched.push(reference.clone());
        for slot in 0..parents_number.saturating_sub(1) {
            if let Some(mate) = self.pick_mate(owner, ctx, parents, reference_index, slot)? {
                matched.push(mate);
            }
        }
        if matched.len() < parents_number {
            return Ok(None);
        }

        if self.hyperspeed && matched.len() > 1 {
            if let Some(fitness) = reference.fitness() {
                if matched[1..].iter().all(|mate| mate.fitness() == Some(fitness)) {
                    trace!(index = ctx.index(), "hyperspeed skips a converged match");
                    return Ok(None);
                }
            }
        }

        owner
            .sub_heuristic()
            .match_parents_and_cross(&ctx.local(0), crossover, probability, &matched)
    }
}

/// Picks `count` distinct individuals of `chromosomes` with `technique`.
///
/// # Returns
///
/// The indices of the picked individuals; fewer than `count` when `chromosomes` is
/// smaller.
///
/// # Errors
///
/// Returns `GeneticError::UnsupportedMatching` for `Neighbor`, which needs a
/// reference individual.
pub fn pick_individuals<C: Chromosome>(
    technique: MatchingTechnique,
    chromosomes: &[C],
    count: usize,
    rng: &mut RandomNumberGenerator,
) -> Result<Vec<usize>> {
    let count = count.min(chromosomes.len());
    let picked = match technique {
        MatchingTechnique::Neighbor => {
            return Err(GeneticError::UnsupportedMatching {
                technique: "Neighbor".to_string(),
                usage: "picking migrants".to_string(),
            });
        }
        MatchingTechnique::Randomize => rng.sample_indices(chromosomes.len(), count),
        MatchingTechnique::Best | MatchingTechnique::Worst => {
            let mut order: Vec<usize> = (0..chromosomes.len()).collect();
            order.sort_by(|a, b| compare_fitness(&chromosomes[*a], &chromosomes[*b]));
            if technique == MatchingTechnique::Best {
                order.reverse();
            }
            order.truncate(count);
            order
        }
        MatchingTechnique::RouletteWheel => {
            let mut remaining: Vec<usize> = (0..chromosomes.len()).collect();
            let mut picked = Vec::with_capacity(count);
            while picked.len() < count {
                let weights: Vec<f64> = remaining
                    .iter()
                    .map(|i| chromosomes[*i].fitness().unwrap_or(0.0))
                    .collect();
                let slot = match cumulative_wheel(&weights) {
                    Some(wheel) => spin_wheel(&wheel, rng.gen_probability()),
                    None => rng.gen_range(0..remaining.len()),
                };
                picked.push(remaining.swap_remove(slot));
            }
            picked
        }
    };
    Ok(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching::ParameterCache;
    use crate::chromosome::BinaryChromosome;
    use crate::population::SubPopulation;
    use crate::rng::RngStreams;

    type C = BinaryChromosome;

    /// Returns the matched parents unchanged, so tests can see the mates.
    #[derive(Debug)]
    struct EchoCrossover;

    impl Crossover<C> for EchoCrossover {
        fn parents_number(&self) -> usize {
            2
        }

        fn children_number(&self) -> usize {
            2
        }

        fn cross(&self, parents: &[C], _rng: &mut RandomNumberGenerator) -> Result<Vec<C>> {
            Ok(parents.to_vec())
        }
    }

    /// Chromosome `i` has `i` leading ones.
    fn pool(fitness: &[f64]) -> Vec<C> {
        fitness
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let mut genes = vec![false; fitness.len()];
                genes[..i].fill(true);
                let mut c = BinaryChromosome::from_genes(genes);
                c.set_fitness(Some(*f));
                c
            })
            .collect()
    }

    fn mate_of(
        heuristic: &MatchMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        parents: &[C],
    ) -> Option<usize> {
        heuristic
            .match_parents_and_cross(ctx, &EchoCrossover, 1.0, parents)
            .unwrap()
            .map(|children| children[1].count_ones())
    }

    #[test]
    fn test_empty_techniques_are_rejected() {
        assert!(matches!(
            MatchMetaHeuristic::<C>::new(vec![]),
            Err(GeneticError::Configuration(_))
        ));
    }

    #[test]
    fn test_neighbor_takes_the_next_parent() {
        let heuristic = MatchMetaHeuristic::<C>::new(vec![MatchingTechnique::Neighbor]).unwrap();
        let parents = pool(&[1.0, 2.0, 3.0]);
        let population = SubPopulation::new(1, parents.clone());
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(8);
        let ctx = EvolutionContext::new(&population, &cache, &rng);

        assert_eq!(mate_of(&heuristic, &ctx.individual(1), &parents), Some(2));
        // No neighbour after the last parent
        assert_eq!(mate_of(&heuristic, &ctx.individual(2), &parents), None);
        // No reference past the end
        assert_eq!(mate_of(&heuristic, &ctx.individual(3), &parents), None);
    }

    #[test]
    fn test_best_and_worst() {
        let parents = pool(&[2.0, 5.0, 1.0, 3.0]);
        let population = SubPopulation::new(1, parents.clone());
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(8);
        let ctx = EvolutionContext::new(&population, &cache, &rng);

        let best = MatchMetaHeuristic::<C>::new(vec![MatchingTechnique::Best]).unwrap();
        assert_eq!(mate_of(&best, &ctx.individual(3), &parents), Some(1));

        let worst = MatchMetaHeuristic::<C>::new(vec![MatchingTechnique::Worst]).unwrap();
        assert_eq!(mate_of(&worst, &ctx.individual(0), &parents), Some(2));
    }

    #[test]
    fn test_best_falls_back_to_random_without_tracked_best() {
        let mut parents = pool(&[0.0, 0.0, 0.0]);
        parents.iter_mut().for_each(|c| c.set_fitness(None));
        let population = SubPopulation::new(1, parents.clone());
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(8);
        let ctx = EvolutionContext::new(&population, &cache, &rng);

        let best = MatchMetaHeuristic::<C>::new(vec![MatchingTechnique::Best]).unwrap();
        assert!(mate_of(&best, &ctx, &parents).is_some());
    }

    #[test]
    fn test_hyperspeed_skips_identical_fitness() {
        let parents = pool(&[1.0, 1.0]);
        let population = SubPopulation::new(1, parents.clone());
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(8);
        let ctx = EvolutionContext::new(&population, &cache, &rng);

        let heuristic = MatchMetaHeuristic::<C>::new(vec![MatchingTechnique::Neighbor])
            .unwrap()
            .with_hyperspeed(true);
        assert_eq!(mate_of(&heuristic, &ctx, &parents), None);

        let heuristic = MatchMetaHeuristic::<C>::new(vec![MatchingTechnique::Neighbor]).unwrap();
        assert_eq!(mate_of(&heuristic, &ctx, &parents), Some(1));
    }

    #[test]
    fn test_roulette_wheel_is_uniform_over_equal_fitness() {
        let heuristic =
            MatchMetaHeuristic::<C>::new(vec![MatchingTechnique::RouletteWheel]).unwrap();
        let parents = pool(&[1.0, 1.0, 1.0, 1.0]);
        let population = SubPopulation::new(1, parents.clone());
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(21);
        let ctx = EvolutionContext::new(&population, &cache, &rng)
            .with_stage(EvolutionStage::CROSSOVER);

        let trials = 4000;
        let mut counts = [0usize; 4];
        for _ in 0..trials {
            let mate = mate_of(&heuristic, &ctx, &parents).unwrap();
            counts[mate] += 1;
        }
        for count in counts {
            assert!((850..=1150).contains(&count), "counts: {:?}", counts);
        }
        // One wheel for the whole generation and stage
        assert_eq!(cache.generator_runs(), 1);
    }

    #[test]
    fn test_roulette_wheel_per_parent_pool() {
        let heuristic =
            MatchMetaHeuristic::<C>::new(vec![MatchingTechnique::RouletteWheel]).unwrap();
        let last_wins = pool(&[0.0, 0.0, 0.0, 1.0]);
        let first_wins = pool(&[1.0, 0.0, 0.0, 0.0]);
        let population = SubPopulation::new(1, last_wins.clone());
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(13);
        let ctx = EvolutionContext::new(&population, &cache, &rng)
            .with_stage(EvolutionStage::CROSSOVER);

        for _ in 0..20 {
            assert_eq!(mate_of(&heuristic, &ctx, &last_wins), Some(3));
            assert_eq!(mate_of(&heuristic, &ctx, &first_wins), Some(0));
        }
        assert_eq!(cache.generator_runs(), 2);
    }

    #[test]
    fn test_pick_individuals() {
        let chromosomes = pool(&[4.0, 1.0, 3.0, 2.0]);
        let mut rng = RandomNumberGenerator::from_seed(5);

        let best = pick_individuals(MatchingTechnique::Best, &chromosomes, 2, &mut rng).unwrap();
        assert_eq!(best, vec![0, 2]);
        let worst = pick_individuals(MatchingTechnique::Worst, &chromosomes, 2, &mut rng).unwrap();
        assert_eq!(worst, vec![1, 3]);

        let mut random =
            pick_individuals(MatchingTechnique::RouletteWheel, &chromosomes, 10, &mut rng).unwrap();
        random.sort_unstable();
        assert_eq!(random, vec![0, 1, 2, 3]);

        assert_eq!(
            pick_individuals(MatchingTechnique::Neighbor, &chromosomes, 1, &mut rng).unwrap_err(),
            GeneticError::UnsupportedMatching {
                technique: "Neighbor".to_string(),
                usage: "picking migrants".to_string(),
            }
        );
    }
}
