//! # Fitness
//!
//! The `Fitness` trait scores a chromosome; higher is better. Closures taking a
//! chromosome reference implement it directly.
//!
//! ```rust
//! use metagenalg::chromosome::{BinaryChromosome, Chromosome};
//! use metagenalg::fitness::Fitness;
//!
//! let ones = |c: &BinaryChromosome| c.count_ones() as f64;
//! let chromosome = BinaryChromosome::from_genes(vec![true, false, true]);
//! assert_eq!(ones.evaluate(&chromosome), 2.0);
//! ```

use crate::chromosome::Chromosome;

/// Trait for fitness functions.
pub trait Fitness<C: Chromosome>: Send + Sync {
    /// Scores `chromosome`.
    fn evaluate(&self, chromosome: &C) -> f64;
}

impl<C, F> Fitness<C> for F
where
    C: Chromosome,
    F: Fn(&C) -> f64 + Send + Sync,
{
    fn evaluate(&self, chromosome: &C) -> f64 {
        self(chromosome)
    }
}
