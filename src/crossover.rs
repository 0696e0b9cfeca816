//! # Crossover
//!
//! Crossover operators recombine a fixed number of parents into a fixed number of
//! children. Children are always unevaluated.

use std::fmt::Debug;

use crate::chromosome::Chromosome;
use crate::error::{GeneticError, Result};
use crate::rng::RandomNumberGenerator;

/// Trait for crossover operators.
pub trait Crossover<C: Chromosome>: Debug + Send + Sync {
    /// The number of parents a cross consumes.
    fn parents_number(&self) -> usize;

    /// The number of children a cross produces.
    fn children_number(&self) -> usize;

    /// Crosses `parents` into `children_number()` new chromosomes.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Operator` if `parents` does not hold exactly
    /// `parents_number()` chromosomes of equal length.
    fn cross(&self, parents: &[C], rng: &mut RandomNumberGenerator) -> Result<Vec<C>>;
}

fn check_parents<C: Chromosome>(parents: &[C], expected: usize) -> Result<usize> {
    if parents.len() != expected {
        return Err(GeneticError::Operator(format!(
            "Crossover expects {} parents, got {}",
            expected,
            parents.len()
        )));
    }
    let length = parents[0].length();
    if parents.iter().any(|p| p.length() != length) {
        return Err(GeneticError::Operator(
            "Crossover parents must have the same length".to_string(),
        ));
    }
    Ok(length)
}

fn unevaluated<C: Chromosome>(parent: &C) -> C {
    let mut child = parent.clone();
    child.set_fitness(None);
    child
}

/// Uniform crossover: every gene is taken from the first or the second parent
/// according to the mix probability, the second child getting the other gene.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct UniformCrossover {
    mix_probability: f64,
}

impl UniformCrossover {
    /// Creates a uniform crossover.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if `mix_probability` is outside `[0, 1]`.
    pub fn new(mix_probability: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&mix_probability) {
            return Err(GeneticError::Configuration(format!(
                "Mix probability must be in [0, 1], got {}",
                mix_probability
            )));
        }
        Ok(Self { mix_probability })
    }
}

impl Default for UniformCrossover {
    fn default() -> Self {
        Self {
            mix_probability: 0.5,
        }
    }
}

impl<C: Chromosome> Crossover<C> for UniformCrossover {
    fn parents_number(&self) -> usize {
        2
    }

    fn children_number(&self) -> usize {
        2
    }

    fn cross(&self, parents: &[C], rng: &mut RandomNumberGenerator) -> Result<Vec<C>> {
        let length = check_parents(parents, 2)?;
        let mut first = unevaluated(&parents[0]);
        let mut second = unevaluated(&parents[1]);

        for i in 0..length {
            if rng.gen_probability() < self.mix_probability {
                let (Some(a), Some(b)) = (parents[0].gene(i), parents[1].gene(i)) else {
                    continue;
                };
                first.replace_gene(i, b.clone())?;
                second.replace_gene(i, a.clone())?;
            }
        }

        Ok(vec![first, second])
    }
}

/// One-point crossover: genes before the swap point come from one parent, genes
/// after it from the other.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct OnePointCrossover {
    swap_point: Option<usize>,
}

impl OnePointCrossover {
    /// Creates a one-point crossover with a random swap point.
    pub fn new() -> Self {
        Self { swap_point: None }
    }

    /// Creates a one-point crossover swapping after gene `swap_point`.
    pub fn with_swap_point(swap_point: usize) -> Self {
        Self {
            swap_point: Some(swap_point),
        }
    }
}

impl<C: Chromosome> Crossover<C> for OnePointCrossover {
    fn parents_number(&self) -> usize {
        2
    }

    fn children_number(&self) -> usize {
        2
    }

    fn cross(&self, parents: &[C], rng: &mut RandomNumberGenerator) -> Result<Vec<C>> {
        let length = check_parents(parents, 2)?;
        if length < 2 {
            return Err(GeneticError::Operator(
                "One-point crossover needs chromosomes with at least 2 genes".to_string(),
            ));
        }
        let swap_point = match self.swap_point {
            Some(point) if point + 1 < length => point,
            Some(point) => {
                return Err(GeneticError::Operator(format!(
                    "Swap point {} leaves no gene to swap in a chromosome of {} genes",
                    point, length
                )))
            }
            None => rng.gen_range(0..length - 1),
        };

        let split = swap_point + 1;
        let mut first = unevaluated(&parents[0]);
        let mut second = unevaluated(&parents[1]);
        first.replace_genes(split, &parents[1].genes()[split..])?;
        second.replace_genes(split, &parents[0].genes()[split..])?;

        Ok(vec![first, second])
    }
}
