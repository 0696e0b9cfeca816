use crate::chromosome::Chromosome;
use crate::error::{GeneticError, Result};
use crate::rng::RandomNumberGenerator;
use crate::selection::Selection;

/// Builds a cumulative wheel over `weights`, normalised so the last slot is 1.
///
/// # Returns
///
/// `None` when the weights cannot form a wheel: empty, any weight negative or not
/// finite, or a total of zero.
pub fn cumulative_wheel(weights: &[f64]) -> Option<Vec<f64>> {
    if weights.is_empty() || weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return None;
    }
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return None;
    }

    let mut cumulative = 0.0;
    let mut wheel: Vec<f64> = weights
        .iter()
        .map(|w| {
            cumulative += w / sum;
            cumulative
        })
        .collect();

    // Ensure the last probability is exactly 1.0 to avoid floating-point errors
    if let Some(last) = wheel.last_mut() {
        *last = 1.0;
    }
    Some(wheel)
}

/// Returns the slot of `wheel` a pointer at `r` in `[0, 1)` falls into.
pub fn spin_wheel(wheel: &[f64], r: f64) -> usize {
    wheel
        .iter()
        .position(|slot| r < *slot)
        .unwrap_or_else(|| wheel.len().saturating_sub(1))
}

/// A selection operator that selects individuals with probability proportional to
/// their fitness.
///
/// Fitness values must be non-negative; unevaluated chromosomes weigh zero. When
/// every weight is zero the selection is uniform.
///
/// # Examples
///
/// ```
/// use metagenalg::chromosome::{BinaryChromosome, Chromosome};
/// use metagenalg::rng::RandomNumberGenerator;
/// use metagenalg::selection::{RouletteWheelSelection, Selection};
///
/// let chromosomes: Vec<BinaryChromosome> = [0.5, 0.8, 0.3, 0.9, 0.1]
///     .iter()
///     .map(|fitness| {
///         let mut c = BinaryChromosome::from_genes(vec![false; 2]);
///         c.set_fitness(Some(*fitness));
///         c
///     })
///     .collect();
///
/// let mut rng = RandomNumberGenerator::from_seed(3);
/// let selected = RouletteWheelSelection::new()
///     .select_chromosomes(3, &chromosomes, &mut rng)
///     .unwrap();
/// assert_eq!(selected.len(), 3);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct RouletteWheelSelection;

impl RouletteWheelSelection {
    pub fn new() -> Self {
        Self
    }
}

impl<C: Chromosome> Selection<C> for RouletteWheelSelection {
    fn select_chromosomes(
        &self,
        count: usize,
        chromosomes: &[C],
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<C>> {
        if chromosomes.is_empty() {
            return Err(GeneticError::EmptyPopulation);
        }

        let weights: Vec<f64> = chromosomes
            .iter()
            .map(|c| c.fitness().unwrap_or(0.0))
            .collect();
        if weights.iter().any(|w| *w < 0.0) {
            return Err(GeneticError::Configuration(
                "Roulette wheel selection requires non-negative fitness values".to_string(),
            ));
        }

        let selected = match cumulative_wheel(&weights) {
            Some(wheel) => (0..count)
                .map(|_| chromosomes[spin_wheel(&wheel, rng.gen_probability())].clone())
                .collect(),
            None => (0..count)
                .map(|_| chromosomes[rng.gen_range(0..chromosomes.len())].clone())
                .collect(),
        };
        Ok(selected)
    }
}
