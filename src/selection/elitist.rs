use crate::chromosome::Chromosome;
use crate::error::{GeneticError, Result};
use crate::population::compare_fitness;
use crate::rng::RandomNumberGenerator;
use crate::selection::Selection;

/// A selection operator that keeps the fittest chromosomes.
///
/// Chromosomes are ordered by descending fitness and the first `count` are
/// returned. When more chromosomes are requested than available, the ordered list
/// is repeated.
///
/// # Examples
///
/// ```
/// use metagenalg::chromosome::{BinaryChromosome, Chromosome};
/// use metagenalg::rng::RandomNumberGenerator;
/// use metagenalg::selection::{EliteSelection, Selection};
///
/// let chromosomes: Vec<BinaryChromosome> = [0.5, 0.8, 0.3]
///     .iter()
///     .map(|fitness| {
///         let mut c = BinaryChromosome::from_genes(vec![false; 2]);
///         c.set_fitness(Some(*fitness));
///         c
///     })
///     .collect();
///
/// let mut rng = RandomNumberGenerator::from_seed(1);
/// let selected = EliteSelection::default()
///     .select_chromosomes(2, &chromosomes, &mut rng)
///     .unwrap();
/// assert_eq!(selected[0].fitness(), Some(0.8));
/// assert_eq!(selected[1].fitness(), Some(0.5));
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct EliteSelection;

impl EliteSelection {
    pub fn new() -> Self {
        Self
    }
}

impl<C: Chromosome> Selection<C> for EliteSelection {
    fn select_chromosomes(
        &self,
        count: usize,
        chromosomes: &[C],
        _rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<C>> {
        if chromosomes.is_empty() {
            return Err(GeneticError::EmptyPopulation);
        }

        let mut ordered: Vec<&C> = chromosomes.iter().collect();
        ordered.sort_by(|a, b| compare_fitness(*b, *a));

        Ok(ordered.into_iter().cycle().take(count).cloned().collect())
    }
}
