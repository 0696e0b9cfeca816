//! Property-based tests for metagenalg
//!
//! Uses proptest to check phase resolution, karyotype splitting and island
//! migration over arbitrary shapes.

use metagenalg::{
    caching::ParameterCache,
    chromosome::{Chromosome, FloatChromosome},
    metaheuristics::{
        island::ring_successors, DefaultMetaHeuristic, EvolutionContext, EvolutionStage,
        IslandMetaHeuristic, Karyotype, MigrationMode, PhaseSizes, SharedHeuristic,
    },
    population::SubPopulation,
    rng::{RandomNumberGenerator, RngStreams},
};
use proptest::prelude::*;
use std::sync::Arc;

fn phase_sizes() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..6, 1..6).prop_filter("at least one non-empty phase", |sizes| {
        sizes.iter().sum::<usize>() > 0
    })
}

fn counting(length: usize, fitness: f64) -> FloatChromosome {
    let mut chromosome =
        FloatChromosome::from_genes((0..length).map(|g| g as f64).collect(), 0.0, 1000.0).unwrap();
    chromosome.set_fitness(Some(fitness));
    chromosome
}

proptest! {
    // ==================== Phase Resolution ====================

    #[test]
    fn phase_of_lands_in_a_non_empty_phase(sizes in phase_sizes(), item in -1000i64..1000) {
        let phases = PhaseSizes::new(sizes.clone()).unwrap();
        let position = phases.phase_of(item);
        prop_assert!(position.phase < sizes.len());
        prop_assert!(position.offset < sizes[position.phase]);
    }

    #[test]
    fn phase_of_repeats_every_total(sizes in phase_sizes(), item in -1000i64..1000, laps in -3i64..3) {
        let phases = PhaseSizes::new(sizes).unwrap();
        let total = phases.total() as i64;
        prop_assert_eq!(phases.phase_of(item), phases.phase_of(item + laps * total));
    }

    #[test]
    fn phase_of_matches_the_cumulative_walk(sizes in phase_sizes(), item in 0usize..200) {
        let phases = PhaseSizes::new(sizes.clone()).unwrap();
        let mut position = item % phases.total();
        let mut expected = 0;
        while position >= sizes[expected] {
            position -= sizes[expected];
            expected += 1;
        }
        prop_assert_eq!(phases.phase_of(item as i64).phase, expected);
        prop_assert_eq!(phases.phase_of(item as i64).offset, position);
    }

    #[test]
    fn apportion_preserves_the_total(sizes in phase_sizes(), total in 0usize..500) {
        let phases = PhaseSizes::new(sizes.clone()).unwrap();
        let counts = phases.apportion(total);
        prop_assert_eq!(counts.len(), sizes.len());
        prop_assert_eq!(counts.iter().sum::<usize>(), total);
        for (count, size) in counts.iter().zip(&sizes) {
            if *size == 0 {
                prop_assert_eq!(*count, 0);
            }
        }
    }

    // ==================== Karyotypes ====================

    #[test]
    fn karyotype_round_trip(sizes in phase_sizes()) {
        let phases = PhaseSizes::new(sizes.clone()).unwrap();
        let parent = counting(phases.total(), 1.0);
        let karyotype = Karyotype::split(&parent, &phases).unwrap();

        prop_assert_eq!(karyotype.segments().len(), sizes.len());
        for (segment, size) in karyotype.segments().iter().zip(&sizes) {
            prop_assert_eq!(segment.chromosome().length(), *size);
            let start = segment.start();
            prop_assert_eq!(segment.chromosome().genes(), &parent.genes()[start..start + size]);
        }

        let merged = karyotype.merge(&phases).unwrap();
        prop_assert_eq!(merged.genes(), parent.genes());
        prop_assert_eq!(merged.fitness(), None);
    }

    #[test]
    fn karyotype_rejects_other_lengths(sizes in phase_sizes(), delta in 1usize..4) {
        let phases = PhaseSizes::new(sizes).unwrap();
        let parent = counting(phases.total() + delta, 1.0);
        prop_assert!(Karyotype::split(&parent, &phases).is_err());
    }

    // ==================== Islands ====================

    #[test]
    fn ring_is_a_single_cycle(n in 2usize..12, seed in any::<u64>()) {
        let mut rng = RandomNumberGenerator::from_seed(seed);
        let order = rng.permutation(n);
        let successors = ring_successors(&order).unwrap();

        let mut visited = vec![false; n];
        let mut island = 0;
        for _ in 0..n {
            prop_assert!(!visited[island]);
            visited[island] = true;
            prop_assert_ne!(successors[island], island);
            island = successors[island];
        }
        prop_assert_eq!(island, 0);
    }

    #[test]
    fn migration_partitions_and_preserves_counts(
        sizes in prop::collection::vec(1usize..6, 2..5),
        mode_index in 0usize..4,
        rate in 0.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        let mode = [
            MigrationMode::Static,
            MigrationMode::RandomRing,
            MigrationMode::RandomPermutation,
            MigrationMode::Reinforced,
        ][mode_index];
        let phases = PhaseSizes::new(sizes.clone()).unwrap();
        let heuristics: Vec<SharedHeuristic<FloatChromosome>> = sizes
            .iter()
            .map(|_| Arc::new(DefaultMetaHeuristic::new()) as SharedHeuristic<FloatChromosome>)
            .collect();
        let heuristic = IslandMetaHeuristic::<FloatChromosome>::new(phases.clone(), heuristics)
            .unwrap()
            .with_migration_mode(mode)
            .with_migration_period(1)
            .unwrap()
            .with_migration_rate(rate)
            .unwrap();

        let chromosomes: Vec<FloatChromosome> = (0..phases.total())
            .map(|i| counting(3, i as f64))
            .collect();
        let population = SubPopulation::new(1, chromosomes);
        let cache = ParameterCache::new();
        let rng = RngStreams::from_seed(seed);
        let ctx = EvolutionContext::new(&population, &cache, &rng)
            .with_stage(EvolutionStage::SELECTION);

        let generation = heuristic.island_generation(&ctx).unwrap();
        prop_assert_eq!(generation.islands().len(), sizes.len());
        prop_assert_eq!(generation.chromosomes_number(), phases.total());
        for (island, size) in generation.islands().iter().zip(&sizes) {
            prop_assert_eq!(island.len(), *size);
        }
    }
}

#[test]
fn karyotype_three_five_scenario() {
    let phases = PhaseSizes::new(vec![3, 5]).unwrap();
    let parent = counting(8, 2.0);
    let karyotype = Karyotype::split(&parent, &phases).unwrap();

    let genes: Vec<&[f64]> = karyotype
        .segments()
        .iter()
        .map(|segment| segment.chromosome().genes())
        .collect();
    assert_eq!(genes, vec![&[0.0, 1.0, 2.0][..], &[3.0, 4.0, 5.0, 6.0, 7.0][..]]);

    let replaced = vec![counting(3, 0.0), counting(5, 0.0)];
    let child = Karyotype::get_new_individual(&parent, &replaced, &phases).unwrap();
    assert_eq!(child.genes(), &[0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
    assert_eq!(child.fitness(), None);
}
