//! # Eukaryote Metaheuristic
//!
//! [`EukaryoteMetaHeuristic`] treats every chromosome as a [`Karyotype`]: a list
//! of contiguous gene ranges, one per phase size. Each range is evolved by its own
//! heuristic on a population made of the same range of every chromosome, and the
//! results are copied back into whole individuals.
//!
//! Reinsertion is not supported: the fitness of recombined individuals cannot be
//! derived from the fitness of their ranges. Restrict the scope with
//! [`with_scope`](crate::metaheuristics::ScopedMetaHeuristic::with_scope) to let
//! the sub-heuristic reinsert.
//!
//! ```rust
//! use metagenalg::chromosome::{Chromosome, FloatChromosome};
//! use metagenalg::metaheuristics::{Karyotype, PhaseSizes};
//!
//! let parent = FloatChromosome::from_genes((0..8).map(f64::from).collect(), 0.0, 10.0).unwrap();
//! let sizes = PhaseSizes::new(vec![3, 5]).unwrap();
//!
//! let karyotype = Karyotype::split(&parent, &sizes).unwrap();
//! assert_eq!(karyotype.segments()[1].chromosome().genes(), &[3.0, 4.0, 5.0, 6.0, 7.0]);
//! assert_eq!(karyotype.merge(&sizes).unwrap().genes(), parent.genes());
//! ```

use std::sync::Arc;

use tracing::trace;

use crate::caching::ParameterCache;
use crate::chromosome::Chromosome;
use crate::crossover::Crossover;
use crate::error::{GeneticError, Result};
use crate::metaheuristics::parameter::ParamScope;
use crate::metaheuristics::phase::PhaseSizes;
use crate::metaheuristics::{
    ContainerMetaHeuristic, EvolutionContext, EvolutionStage, MetaHeuristic, ScopedHandler,
    ScopedMetaHeuristic, SharedHeuristic,
};
use crate::mutation::Mutation;
use crate::population::SubPopulation;
use crate::reinsertion::Reinsertion;
use crate::selection::Selection;

const PHASES_SCOPE: ParamScope = ParamScope::GENERATION.union(ParamScope::META_HEURISTIC);
const PARENTS_SCOPE: ParamScope = ParamScope::GENERATION
    .union(ParamScope::STAGE)
    .union(ParamScope::META_HEURISTIC);

/// A gene range of a chromosome and where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SubChromosome<C: Chromosome> {
    chromosome: C,
    start: usize,
}

impl<C: Chromosome> SubChromosome<C> {
    pub fn chromosome(&self) -> &C {
        &self.chromosome
    }

    /// Returns the index of the first gene of the range in the whole chromosome.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn into_chromosome(self) -> C {
        self.chromosome
    }
}

/// A chromosome split into its gene ranges.
#[derive(Debug, Clone)]
pub struct Karyotype<C: Chromosome> {
    parent: C,
    segments: Vec<SubChromosome<C>>,
}

impl<C: Chromosome> Karyotype<C> {
    /// Splits `parent` into one sub-chromosome per phase.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::KaryotypeLength` if the phases do not cover exactly the
    /// genes of `parent`.
    pub fn split(parent: &C, phase_sizes: &PhaseSizes) -> Result<Self> {
        check_length(parent, phase_sizes)?;
        let segments = phase_sizes
            .offsets()
            .into_iter()
            .zip(phase_sizes.sizes())
            .map(|(start, size)| {
                Ok(SubChromosome {
                    chromosome: parent.sub_chromosome(start, *size)?,
                    start,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            parent: parent.clone(),
            segments,
        })
    }

    /// Builds a new individual from a clone of `parent` whose gene ranges are
    /// replaced by `sub_chromosomes`. The individual is unevaluated.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::KaryotypeLength` if `parent` or a sub-chromosome does not
    /// have the length its phase expects, and `GeneticError::Configuration` if there
    /// is not one sub-chromosome per phase.
    pub fn get_new_individual(
        parent: &C,
        sub_chromosomes: &[C],
        phase_sizes: &PhaseSizes,
    ) -> Result<C> {
        check_length(parent, phase_sizes)?;
        if sub_chromosomes.len() != phase_sizes.len() {
            return Err(GeneticError::Configuration(format!(
                "{} phases need {} sub-chromosomes, got {}",
                phase_sizes.len(),
                phase_sizes.len(),
                sub_chromosomes.len()
            )));
        }

        let mut individual = parent.clone();
        individual.set_fitness(None);
        for ((start, size), sub) in phase_sizes
            .offsets()
            .into_iter()
            .zip(phase_sizes.sizes())
            .zip(sub_chromosomes)
        {
            if sub.length() != *size {
                return Err(GeneticError::KaryotypeLength {
                    expected: *size,
                    actual: sub.length(),
                });
            }
            individual.replace_genes(start, sub.genes())?;
        }
        Ok(individual)
    }

    /// Rebuilds a whole individual from the current segments.
    ///
    /// # Errors
    ///
    /// See [`Karyotype::get_new_individual`].
    pub fn merge(&self, phase_sizes: &PhaseSizes) -> Result<C> {
        let subs: Vec<C> = self
            .segments
            .iter()
            .map(|segment| segment.chromosome.clone())
            .collect();
        Self::get_new_individual(&self.parent, &subs, phase_sizes)
    }

    pub fn parent(&self) -> &C {
        &self.parent
    }

    pub fn segments(&self) -> &[SubChromosome<C>] {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut [SubChromosome<C>] {
        &mut self.segments
    }
}

fn check_length<C: Chromosome>(chromosome: &C, phase_sizes: &PhaseSizes) -> Result<()> {
    if chromosome.length() != phase_sizes.total() {
        return Err(GeneticError::KaryotypeLength {
            expected: phase_sizes.total(),
            actual: chromosome.length(),
        });
    }
    Ok(())
}

/// Splits every chromosome and groups the segments by phase.
fn split_by_phase<C: Chromosome>(chromosomes: &[C], phase_sizes: &PhaseSizes) -> Result<Vec<Vec<C>>> {
    let mut phases: Vec<Vec<C>> = (0..phase_sizes.len())
        .map(|_| Vec::with_capacity(chromosomes.len()))
        .collect();
    for chromosome in chromosomes {
        let karyotype = Karyotype::split(chromosome, phase_sizes)?;
        for (phase, segment) in karyotype.segments.into_iter().enumerate() {
            phases[phase].push(segment.chromosome);
        }
    }
    Ok(phases)
}

/// The per-phase populations of one generation.
#[derive(Debug)]
struct PhaseGeneration<C: Chromosome> {
    populations: Vec<SubPopulation<C>>,
    caches: Vec<ParameterCache>,
}

impl<C: Chromosome> PhaseGeneration<C> {
    fn context<'b>(&'b self, ctx: &EvolutionContext<'b, C>, phase: usize) -> EvolutionContext<'b, C> {
        ctx.with_population(&self.populations[phase], &self.caches[phase])
    }
}

/// The phases of an [`EukaryoteMetaHeuristic`] and their heuristics.
#[derive(Debug)]
pub struct Eukaryote<C: Chromosome> {
    phase_sizes: PhaseSizes,
    heuristics: Vec<SharedHeuristic<C>>,
}

/// A heuristic evolving the gene ranges of chromosomes separately.
pub type EukaryoteMetaHeuristic<C> = ScopedMetaHeuristic<C, Eukaryote<C>>;

impl<C: Chromosome> ScopedMetaHeuristic<C, Eukaryote<C>> {
    /// Creates a eukaryote heuristic with one gene range per phase size.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if the number of heuristics differs from
    /// the number of phases.
    pub fn new(phase_sizes: PhaseSizes, heuristics: Vec<SharedHeuristic<C>>) -> Result<Self> {
        if heuristics.len() != phase_sizes.len() {
            return Err(GeneticError::Configuration(format!(
                "{} gene ranges need {} heuristics, got {}",
                phase_sizes.len(),
                phase_sizes.len(),
                heuristics.len()
            )));
        }
        Ok(Self::scoped(
            EvolutionStage::ALL,
            Eukaryote {
                phase_sizes,
                heuristics,
            },
        ))
    }

    /// Returns the gene range sizes.
    pub fn karyotype_sizes(&self) -> &PhaseSizes {
        &self.handler().phase_sizes
    }
}

impl<C: Chromosome> Eukaryote<C> {
    fn phases(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
    ) -> Result<Arc<PhaseGeneration<C>>> {
        let key = ctx.cache_key("eukaryote_phases", PHASES_SCOPE, owner.id());
        ctx.get_or_add(key, || {
            let generation = ctx.generation_number();
            let phases = split_by_phase(ctx.population().chromosomes(), &self.phase_sizes)?;
            trace!(phases = phases.len(), generation, "eukaryote phases built");
            let caches = phases.iter().map(|_| ParameterCache::new()).collect();
            let populations = phases
                .into_iter()
                .map(|chromosomes| SubPopulation::new(generation, chromosomes))
                .collect();
            Ok(Arc::new(PhaseGeneration {
                populations,
                caches,
            }))
        })
    }

    fn split_parents(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        parents: &[C],
    ) -> Result<Arc<Vec<Vec<C>>>> {
        let key = ctx.pool_cache_key("karyotype_parents", parents, PARENTS_SCOPE, owner.id());
        ctx.get_or_add(key, || split_by_phase(parents, &self.phase_sizes).map(Arc::new))
    }
}

impl<C: Chromosome> ScopedHandler<C> for Eukaryote<C> {
    fn select(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        selection: &dyn Selection<C>,
        count: usize,
    ) -> Result<Vec<C>> {
        let templates = ctx.population().chromosomes();
        if templates.is_empty() {
            return Err(GeneticError::EmptyPopulation);
        }
        let phases = self.phases(owner, ctx)?;

        let mut selected = Vec::with_capacity(self.heuristics.len());
        for (phase, heuristic) in self.heuristics.iter().enumerate() {
            let phase_selected =
                heuristic.select_parent_chromosomes(&phases.context(ctx, phase), selection, count)?;
            if phase_selected.len() < count {
                return Err(GeneticError::Operator(format!(
                    "Selection of gene range {} returned {} chromosomes instead of {}",
                    phase,
                    phase_selected.len(),
                    count
                )));
            }
            selected.push(phase_selected);
        }

        (0..count)
            .map(|i| {
                let subs: Vec<C> = selected.iter().map(|phase| phase[i].clone()).collect();
                Karyotype::get_new_individual(&templates[i % templates.len()], &subs, &self.phase_sizes)
            })
            .collect()
    }

    fn cross(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        crossover: &dyn Crossover<C>,
        probability: f32,
        parents: &[C],
    ) -> Result<Option<Vec<C>>> {
        let local = ctx.local_index();
        let Some(reference) = parents.get(local) else {
            return Ok(None);
        };
        let phases = self.phases(owner, ctx)?;
        let split = self.split_parents(owner, ctx, parents)?;

        let mut phase_children = Vec::with_capacity(self.heuristics.len());
        let mut crossed = false;
        for (phase, heuristic) in self.heuristics.iter().enumerate() {
            let children = heuristic.match_parents_and_cross(
                &phases.context(ctx, phase),
                crossover,
                probability,
                &split[phase],
            )?;
            crossed |= children.is_some();
            phase_children.push(children);
        }
        if !crossed {
            return Ok(None);
        }

        // Ranges that were not crossed keep the parents' genes
        let end = (local + crossover.parents_number()).min(parents.len());
        let phase_children: Vec<Vec<C>> = phase_children
            .into_iter()
            .enumerate()
            .map(|(phase, children)| children.unwrap_or_else(|| split[phase][local..end].to_vec()))
            .collect();

        let count = phase_children.iter().map(Vec::len).min().unwrap_or(0);
        let children = (0..count)
            .map(|k| {
                let subs: Vec<C> = phase_children.iter().map(|phase| phase[k].clone()).collect();
                let template = parents.get(local + k).unwrap_or(reference);
                Karyotype::get_new_individual(template, &subs, &self.phase_sizes)
            })
            .collect::<Result<Vec<C>>>()?;
        Ok(Some(children))
    }

    fn mutate(
        &self,
        owner: &ContainerMetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
        mutation: &dyn Mutation<C>,
        probability: f32,
        chromosome: &mut C,
    ) -> Result<()> {
        let phases = self.phases(owner, ctx)?;
        let mut karyotype = Karyotype::split(chromosome, &self.phase_sizes)?;
        for (phase, segment) in karyotype.segments_mut().iter_mut().enumerate() {
            self.heuristics[phase].mutate_chromosome(
                &phases.context(ctx, phase),
                mutation,
                probability,
                &mut segment.chromosome,
            )?;
        }

        let mutated = karyotype.merge(&self.phase_sizes)?;
        if mutated.genes() != chromosome.genes() {
            *chromosome = mutated;
        }
        Ok(())
    }

    fn reinsert(
        &self,
        _owner: &ContainerMetaHeuristic<C>,
        _ctx: &EvolutionContext<'_, C>,
        _reinsertion: &dyn Reinsertion<C>,
        _offspring: Vec<C>,
        _parents: Vec<C>,
    ) -> Result<Vec<C>> {
        Err(GeneticError::UnsupportedOperation(
            "Eukaryote heuristics cannot reinsert recombined individuals".to_string(),
        ))
    }
}
