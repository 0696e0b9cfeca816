use crate::chromosome::Chromosome;
use crate::crossover::Crossover;
use crate::error::Result;
use crate::metaheuristics::{EvolutionContext, HeuristicId, MetaHeuristic};
use crate::mutation::Mutation;
use crate::reinsertion::Reinsertion;
use crate::selection::Selection;

/// The baseline metaheuristic: applies each operator as a plain genetic algorithm.
///
/// * Selection runs on every chromosome of the context population.
/// * Crossover takes `parents_number()` consecutive parents starting at the
///   context's local index and crosses them when a uniform draw passes the
///   probability. A probability of 1 or more always crosses.
/// * Mutation and reinsertion call their operator directly.
#[derive(Debug)]
pub struct DefaultMetaHeuristic {
    id: HeuristicId,
}

impl DefaultMetaHeuristic {
    /// Creates a default heuristic with a fresh id.
    pub fn new() -> Self {
        Self {
            id: HeuristicId::next(),
        }
    }
}

impl Default for DefaultMetaHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Chromosome> MetaHeuristic<C> for DefaultMetaHeuristic {
    fn id(&self) -> HeuristicId {
        self.id
    }

    fn select_parent_chromosomes(
        &self,
        ctx: &EvolutionContext<'_, C>,
        selection: &dyn Selection<C>,
        count: usize,
    ) -> Result<Vec<C>> {
        let chromosomes = ctx.population().chromosomes();
        ctx.with_rng(|rng| selection.select_chromosomes(count, chromosomes, rng))
    }

    fn match_parents_and_cross(
        &self,
        ctx: &EvolutionContext<'_, C>,
        crossover: &dyn Crossover<C>,
        probability: f32,
        parents: &[C],
    ) -> Result<Option<Vec<C>>> {
        let start = ctx.local_index();
        let end = start + crossover.parents_number();
        if end > parents.len() {
            return Ok(None);
        }

        let crosses = probability >= 1.0
            || ctx.with_rng(|rng| rng.gen_probability() < f64::from(probability));
        if !crosses {
            return Ok(None);
        }

        ctx.with_rng(|rng| crossover.cross(&parents[start..end], rng))
            .map(Some)
    }

    fn mutate_chromosome(
        &self,
        ctx: &EvolutionContext<'_, C>,
        mutation: &dyn Mutation<C>,
        probability: f32,
        chromosome: &mut C,
    ) -> Result<()> {
        ctx.with_rng(|rng| mutation.mutate(chromosome, probability, rng))
    }

    fn reinsert(
        &self,
        ctx: &EvolutionContext<'_, C>,
        reinsertion: &dyn Reinsertion<C>,
        offspring: Vec<C>,
        parents: Vec<C>,
    ) -> Result<Vec<C>> {
        let population = ctx.population();
        ctx.with_rng(|rng| reinsertion.select_chromosomes(population, offspring, parents, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching::ParameterCache;
    use crate::chromosome::BinaryChromosome;
    use crate::crossover::OnePointCrossover;
    use crate::population::SubPopulation;
    use crate::rng::RngStreams;

    fn parents() -> Vec<BinaryChromosome> {
        vec![
            BinaryChromosome::from_genes(vec![true; 4]),
            BinaryChromosome::from_genes(vec![false; 4]),
            BinaryChromosome::from_genes(vec![true; 4]),
        ]
    }

    #[test]
    fn test_crossover_uses_parents_at_local_index() {
        let population = SubPopulation::new(1, parents());
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(3);
        let ctx = EvolutionContext::new(&population, &cache, &rng);
        let heuristic = DefaultMetaHeuristic::new();
        let crossover = OnePointCrossover::with_swap_point(1);

        let children = heuristic
            .match_parents_and_cross(&ctx.individual(1), &crossover, 1.0, &parents())
            .unwrap()
            .unwrap();
        assert_eq!(children[0].genes(), &[false, false, true, true]);

        // Not enough parents left after index 2
        let none = heuristic
            .match_parents_and_cross(&ctx.individual(2), &crossover, 1.0, &parents())
            .unwrap();
        assert!(none.is_none());

        // A zero probability never crosses
        let none = heuristic
            .match_parents_and_cross(&ctx.individual(0), &crossover, 0.0, &parents())
            .unwrap();
        assert!(none.is_none());
    }
}
