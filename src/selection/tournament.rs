use crate::chromosome::Chromosome;
use crate::error::{GeneticError, Result};
use crate::population::compare_fitness;
use crate::rng::RandomNumberGenerator;
use crate::selection::Selection;

/// A selection operator that selects individuals through tournaments.
///
/// Each pick draws `tournament_size` distinct contestants and keeps the fittest.
/// Smaller tournaments favour exploration, larger ones exploitation.
///
/// Unless `allow_winner_again` is set, a winner leaves the pool of contestants;
/// once every chromosome has won, the pool is refilled.
///
/// # Examples
///
/// ```
/// use metagenalg::chromosome::{BinaryChromosome, Chromosome};
/// use metagenalg::rng::RandomNumberGenerator;
/// use metagenalg::selection::{Selection, TournamentSelection};
///
/// let chromosomes: Vec<BinaryChromosome> = (0..5)
///     .map(|i| {
///         let mut c = BinaryChromosome::from_genes(vec![false; 2]);
///         c.set_fitness(Some(i as f64));
///         c
///     })
///     .collect();
///
/// let mut rng = RandomNumberGenerator::from_seed(1);
/// let selection = TournamentSelection::new(2, false).unwrap();
/// let selected = selection.select_chromosomes(3, &chromosomes, &mut rng).unwrap();
/// assert_eq!(selected.len(), 3);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct TournamentSelection {
    tournament_size: usize,
    allow_winner_again: bool,
}

impl TournamentSelection {
    /// Creates a new tournament selection.
    ///
    /// # Arguments
    ///
    /// * `tournament_size` - The number of contestants of each tournament. A size of
    ///   1 is equivalent to random selection.
    /// * `allow_winner_again` - Whether a winner may compete in the next tournaments.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if `tournament_size` is 0.
    pub fn new(tournament_size: usize, allow_winner_again: bool) -> Result<Self> {
        if tournament_size < 1 {
            return Err(GeneticError::Configuration(
                "Tournament size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            tournament_size,
            allow_winner_again,
        })
    }

    pub fn tournament_size(&self) -> usize {
        self.tournament_size
    }

    fn run_tournament<C: Chromosome>(
        &self,
        chromosomes: &[C],
        eligible: &[usize],
        rng: &mut RandomNumberGenerator,
    ) -> usize {
        rng.sample_indices(eligible.len(), self.tournament_size)
            .into_iter()
            .map(|i| eligible[i])
            .max_by(|a, b| compare_fitness(&chromosomes[*a], &chromosomes[*b]))
            .unwrap_or(eligible[0])
    }
}

impl Default for TournamentSelection {
    fn default() -> Self {
        Self {
            tournament_size: 2,
            allow_winner_again: true,
        }
    }
}

impl<C: Chromosome> Selection<C> for TournamentSelection {
    fn select_chromosomes(
        &self,
        count: usize,
        chromosomes: &[C],
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<C>> {
        if chromosomes.is_empty() {
            return Err(GeneticError::EmptyPopulation);
        }

        let mut eligible: Vec<usize> = (0..chromosomes.len()).collect();
        let mut selected = Vec::with_capacity(count);

        while selected.len() < count {
            if eligible.is_empty() {
                eligible = (0..chromosomes.len()).collect();
            }
            let winner = self.run_tournament(chromosomes, &eligible, rng);
            selected.push(chromosomes[winner].clone());
            if !self.allow_winner_again {
                eligible.retain(|i| *i != winner);
            }
        }

        Ok(selected)
    }
}
