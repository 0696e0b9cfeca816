//! # Mutation
//!
//! Mutation operators alter a chromosome in place, given a mutation probability.
//! A mutated chromosome loses its fitness.

use std::fmt::Debug;

use crate::chromosome::Chromosome;
use crate::error::{GeneticError, Result};
use crate::rng::RandomNumberGenerator;

/// Trait for mutation operators.
pub trait Mutation<C: Chromosome>: Debug + Send + Sync {
    /// Mutates `chromosome` with the given probability.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Operator` if the chromosome cannot be mutated by this
    /// operator.
    fn mutate(
        &self,
        chromosome: &mut C,
        probability: f32,
        rng: &mut RandomNumberGenerator,
    ) -> Result<()>;
}

/// Uniform mutation: every mutable gene is regenerated with the given probability.
///
/// By default every gene is mutable; [`UniformMutation::with_indexes`] restricts
/// mutation to a set of positions.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct UniformMutation {
    indexes: Option<Vec<usize>>,
}

impl UniformMutation {
    pub fn new() -> Self {
        Self { indexes: None }
    }

    /// Restricts mutation to the genes at `indexes`.
    pub fn with_indexes(indexes: Vec<usize>) -> Self {
        Self {
            indexes: Some(indexes),
        }
    }
}

impl<C: Chromosome> Mutation<C> for UniformMutation {
    fn mutate(
        &self,
        chromosome: &mut C,
        probability: f32,
        rng: &mut RandomNumberGenerator,
    ) -> Result<()> {
        let length = chromosome.length();
        let positions: Vec<usize> = match &self.indexes {
            Some(indexes) => {
                if let Some(invalid) = indexes.iter().find(|i| **i >= length) {
                    return Err(GeneticError::Operator(format!(
                        "Mutation index {} is outside a chromosome of {} genes",
                        invalid, length
                    )));
                }
                indexes.clone()
            }
            None => (0..length).collect(),
        };

        let mut mutated = false;
        for index in positions {
            if rng.gen_probability() < f64::from(probability) {
                let gene = chromosome.generate_gene(index, rng);
                chromosome.replace_gene(index, gene)?;
                mutated = true;
            }
        }
        if mutated {
            chromosome.set_fitness(None);
        }
        Ok(())
    }
}

/// Twors mutation: with the given probability, swaps two random genes.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct TworsMutation;

impl TworsMutation {
    pub fn new() -> Self {
        Self
    }
}

impl<C: Chromosome> Mutation<C> for TworsMutation {
    fn mutate(
        &self,
        chromosome: &mut C,
        probability: f32,
        rng: &mut RandomNumberGenerator,
    ) -> Result<()> {
        let length = chromosome.length();
        if length < 2 {
            return Err(GeneticError::Operator(
                "Twors mutation needs chromosomes with at least 2 genes".to_string(),
            ));
        }
        if rng.gen_probability() >= f64::from(probability) {
            return Ok(());
        }

        let picked = rng.sample_indices(length, 2);
        let (a, b) = (picked[0], picked[1]);
        let (Some(gene_a), Some(gene_b)) = (chromosome.gene(a).cloned(), chromosome.gene(b).cloned())
        else {
            return Ok(());
        };
        chromosome.replace_gene(a, gene_b)?;
        chromosome.replace_gene(b, gene_a)?;
        chromosome.set_fitness(None);
        Ok(())
    }
}
