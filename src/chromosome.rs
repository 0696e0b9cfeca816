//! # Chromosome Trait
//!
//! The `Chromosome` trait is the engine's view of an individual: an ordered gene
//! array with an optional fitness. Besides gene access it exposes the handful of
//! structural operations the metaheuristics rely on: creating fresh random
//! individuals, regenerating single genes, and cutting an independent
//! sub-chromosome out of a gene range (used to build karyotypes).
//!
//! Two implementations are provided: [`FloatChromosome`] (bounded real genes) and
//! [`BinaryChromosome`] (bit genes).
//!
//! ## Example
//!
//! ```rust
//! use metagenalg::chromosome::{BinaryChromosome, Chromosome};
//!
//! let mut chromosome = BinaryChromosome::from_genes(vec![true, false, true, false]);
//! chromosome.replace_genes(1, &[true, true]).unwrap();
//! assert_eq!(chromosome.genes(), &[true, true, true, false]);
//!
//! let tail = chromosome.sub_chromosome(2, 2).unwrap();
//! assert_eq!(tail.genes(), &[true, false]);
//! ```

use std::fmt::Debug;

use crate::error::{GeneticError, Result};
use crate::rng::RandomNumberGenerator;

/// Trait for the individuals manipulated by the engine.
///
/// Types implementing this trait must be cheap enough to clone, and `Send + Sync`
/// so generations can be processed by worker threads.
pub trait Chromosome: Clone + Debug + Send + Sync + 'static {
    /// The gene type.
    type Gene: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Returns the genes in order.
    fn genes(&self) -> &[Self::Gene];

    /// Returns the number of genes.
    fn length(&self) -> usize {
        self.genes().len()
    }

    /// Returns the gene at `index`, if any.
    fn gene(&self, index: usize) -> Option<&Self::Gene> {
        self.genes().get(index)
    }

    /// Replaces the gene at `index`.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::OutOfRange` if `index` is not a valid gene position.
    fn replace_gene(&mut self, index: usize, gene: Self::Gene) -> Result<()> {
        self.replace_genes(index, std::slice::from_ref(&gene))
    }

    /// Replaces the genes starting at `start_index` with `genes`.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::OutOfRange` if the replaced range exceeds the chromosome.
    fn replace_genes(&mut self, start_index: usize, genes: &[Self::Gene]) -> Result<()>;

    /// Generates a new random value for the gene at `index`.
    fn generate_gene(&self, index: usize, rng: &mut RandomNumberGenerator) -> Self::Gene;

    /// Returns the fitness, if it has been evaluated.
    fn fitness(&self) -> Option<f64>;

    /// Sets or clears the fitness.
    fn set_fitness(&mut self, fitness: Option<f64>);

    /// Creates a new random chromosome with the same structure as `self`.
    fn create_new(&self, rng: &mut RandomNumberGenerator) -> Self;

    /// Creates an independent chromosome holding a copy of `length` genes starting
    /// at `start`. The copy carries the fitness of `self`.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::OutOfRange` if the range exceeds the chromosome.
    fn sub_chromosome(&self, start: usize, length: usize) -> Result<Self>;
}

/// Copies `genes` into `target` starting at `start`, checking bounds first.
pub(crate) fn replace_range<G: Clone>(target: &mut [G], start: usize, genes: &[G]) -> Result<()> {
    let end = start
        .checked_add(genes.len())
        .filter(|end| *end <= target.len())
        .ok_or_else(|| {
            GeneticError::OutOfRange(format!(
                "cannot write {} genes at position {} of a chromosome with {} genes",
                genes.len(),
                start,
                target.len()
            ))
        })?;
    target[start..end].clone_from_slice(genes);
    Ok(())
}

/// Returns a copy of `genes[start..start + length]`, checking bounds first.
pub(crate) fn copy_range<G: Clone>(genes: &[G], start: usize, length: usize) -> Result<Vec<G>> {
    start
        .checked_add(length)
        .filter(|end| *end <= genes.len())
        .map(|end| genes[start..end].to_vec())
        .ok_or_else(|| {
            GeneticError::OutOfRange(format!(
                "cannot read {} genes at position {} of a chromosome with {} genes",
                length,
                start,
                genes.len()
            ))
        })
}

/// A chromosome of real-valued genes bounded by `[min, max)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatChromosome {
    genes: Vec<f64>,
    min: f64,
    max: f64,
    fitness: Option<f64>,
}

impl FloatChromosome {
    /// Creates a chromosome with `length` random genes in `[min, max)`.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if `min > max` or either bound is not finite.
    pub fn new(length: usize, min: f64, max: f64, rng: &mut RandomNumberGenerator) -> Result<Self> {
        let template = Self::from_genes(Vec::new(), min, max)?;
        let genes = (0..length).map(|i| template.generate_gene(i, rng)).collect();
        Ok(Self { genes, ..template })
    }

    /// Creates a chromosome with the given genes.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if `min > max` or either bound is not finite.
    pub fn from_genes(genes: Vec<f64>, min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(GeneticError::Configuration(format!(
                "Invalid gene bounds [{}, {})",
                min, max
            )));
        }
        Ok(Self {
            genes,
            min,
            max,
            fitness: None,
        })
    }

    /// Returns the gene bounds.
    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

impl Chromosome for FloatChromosome {
    type Gene = f64;

    fn genes(&self) -> &[f64] {
        &self.genes
    }

    fn replace_genes(&mut self, start_index: usize, genes: &[f64]) -> Result<()> {
        replace_range(&mut self.genes, start_index, genes)
    }

    fn generate_gene(&self, _index: usize, rng: &mut RandomNumberGenerator) -> f64 {
        if self.min < self.max {
            rng.gen_range(self.min..self.max)
        } else {
            self.min
        }
    }

    fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: Option<f64>) {
        self.fitness = fitness;
    }

    fn create_new(&self, rng: &mut RandomNumberGenerator) -> Self {
        let genes = (0..self.genes.len())
            .map(|i| self.generate_gene(i, rng))
            .collect();
        Self {
            genes,
            min: self.min,
            max: self.max,
            fitness: None,
        }
    }

    fn sub_chromosome(&self, start: usize, length: usize) -> Result<Self> {
        Ok(Self {
            genes: copy_range(&self.genes, start, length)?,
            min: self.min,
            max: self.max,
            fitness: self.fitness,
        })
    }
}

/// A chromosome of bit genes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryChromosome {
    genes: Vec<bool>,
    fitness: Option<u64>,
}

impl BinaryChromosome {
    /// Creates a chromosome with `length` random bits.
    pub fn new(length: usize, rng: &mut RandomNumberGenerator) -> Self {
        let genes = (0..length).map(|_| rng.gen_bool(0.5)).collect();
        Self {
            genes,
            fitness: None,
        }
    }

    /// Creates a chromosome with the given bits.
    pub fn from_genes(genes: Vec<bool>) -> Self {
        Self {
            genes,
            fitness: None,
        }
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> usize {
        self.genes.iter().filter(|g| **g).count()
    }
}

impl Chromosome for BinaryChromosome {
    type Gene = bool;

    fn genes(&self) -> &[bool] {
        &self.genes
    }

    fn replace_genes(&mut self, start_index: usize, genes: &[bool]) -> Result<()> {
        replace_range(&mut self.genes, start_index, genes)
    }

    fn generate_gene(&self, _index: usize, rng: &mut RandomNumberGenerator) -> bool {
        rng.gen_bool(0.5)
    }

    // Stored as raw bits so the type can stay `Eq`.
    fn fitness(&self) -> Option<f64> {
        self.fitness.map(f64::from_bits)
    }

    fn set_fitness(&mut self, fitness: Option<f64>) {
        self.fitness = fitness.map(f64::to_bits);
    }

    fn create_new(&self, rng: &mut RandomNumberGenerator) -> Self {
        Self::new(self.genes.len(), rng)
    }

    fn sub_chromosome(&self, start: usize, length: usize) -> Result<Self> {
        Ok(Self {
            genes: copy_range(&self.genes, start, length)?,
            fitness: self.fitness,
        })
    }
}
