use metagenalg::{
    caching::ParameterCache,
    chromosome::{BinaryChromosome, Chromosome},
    crossover::{Crossover, OnePointCrossover, UniformCrossover},
    error::{GeneticError, Result},
    evolution::{EvolutionOptions, MetaGeneticAlgorithmBuilder},
    metaheuristics::{
        ContainerMetaHeuristic, DefaultMetaHeuristic, EukaryoteMetaHeuristic, EvolutionContext,
        EvolutionStage, HeuristicId, IslandMetaHeuristic, MatchMetaHeuristic, MatchingTechnique,
        MetaHeuristic, MigrationMode, OperatorsMetaHeuristic, ParamScope, Parameter, PhaseSizes,
        ProbabilityStrategy, SharedHeuristic, SizeBasedMetaHeuristic, SwitchMetaHeuristic,
    },
    mutation::{Mutation, TworsMutation, UniformMutation},
    population::{Population, PopulationView, SubPopulation},
    reinsertion::{ElitistReinsertion, PureReinsertion, Reinsertion},
    rng::RngStreams,
    selection::{EliteSelection, Selection, TournamentSelection},
    termination::GenerationNumberTermination,
};
use std::sync::{Arc, Mutex};

type C = BinaryChromosome;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn one_max(chromosome: &C) -> f64 {
    chromosome.count_ones() as f64
}

/// A OneMax run over `size` chromosomes of `length` bits.
fn one_max_run(size: usize, length: usize) -> MetaGeneticAlgorithmBuilder<C> {
    MetaGeneticAlgorithmBuilder::new()
        .with_population(Population::new(size, size, BinaryChromosome::from_genes(vec![false; length])).unwrap())
        .with_fitness(one_max)
        .with_selection(TournamentSelection::new(3, true).unwrap())
        .with_crossover(OnePointCrossover::new())
        .with_mutation(UniformMutation::new())
        .with_reinsertion(ElitistReinsertion)
        .with_options(EvolutionOptions::builder().seed(2024).build())
}

fn plain() -> SharedHeuristic<C> {
    Arc::new(DefaultMetaHeuristic::new())
}

/// Runs `generations` steps and checks the population kept its size.
fn run_with(heuristic: SharedHeuristic<C>, size: usize, length: usize, generations: usize) {
    init_tracing();
    let mut algorithm = one_max_run(size, length)
        .with_metaheuristic(heuristic)
        .with_termination(GenerationNumberTermination::new(generations + 1))
        .build()
        .unwrap();
    let best = algorithm.start().unwrap();

    assert_eq!(algorithm.generation_number(), generations + 1);
    assert_eq!(algorithm.population().chromosomes().len(), size);
    assert!(best.fitness().is_some());
}

/// Forwards to a default heuristic and records the generations it selected in.
#[derive(Debug)]
struct Recording {
    inner: DefaultMetaHeuristic,
    generations: Mutex<Vec<usize>>,
}

impl Recording {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: DefaultMetaHeuristic::new(),
            generations: Mutex::new(Vec::new()),
        })
    }

    fn generations(&self) -> Vec<usize> {
        self.generations.lock().unwrap().clone()
    }
}

impl MetaHeuristic<C> for Recording {
    fn id(&self) -> HeuristicId {
        MetaHeuristic::<C>::id(&self.inner)
    }

    fn select_parent_chromosomes(
        &self,
        ctx: &EvolutionContext<'_, C>,
        selection: &dyn Selection<C>,
        count: usize,
    ) -> Result<Vec<C>> {
        self.generations.lock().unwrap().push(ctx.generation_number());
        self.inner.select_parent_chromosomes(ctx, selection, count)
    }

    fn match_parents_and_cross(
        &self,
        ctx: &EvolutionContext<'_, C>,
        crossover: &dyn Crossover<C>,
        probability: f32,
        parents: &[C],
    ) -> Result<Option<Vec<C>>> {
        self.inner
            .match_parents_and_cross(ctx, crossover, probability, parents)
    }

    fn mutate_chromosome(
        &self,
        ctx: &EvolutionContext<'_, C>,
        mutation: &dyn Mutation<C>,
        probability: f32,
        chromosome: &mut C,
    ) -> Result<()> {
        self.inner
            .mutate_chromosome(ctx, mutation, probability, chromosome)
    }

    fn reinsert(
        &self,
        ctx: &EvolutionContext<'_, C>,
        reinsertion: &dyn Reinsertion<C>,
        offspring: Vec<C>,
        parents: Vec<C>,
    ) -> Result<Vec<C>> {
        self.inner.reinsert(ctx, reinsertion, offspring, parents)
    }
}

#[test]
fn test_generation_phases_three_then_two() {
    init_tracing();
    let first = Recording::new();
    let second = Recording::new();
    let heuristic = SizeBasedMetaHeuristic::by_generation(
        PhaseSizes::new(vec![3, 2]).unwrap(),
        vec![
            Arc::clone(&first) as SharedHeuristic<C>,
            Arc::clone(&second) as SharedHeuristic<C>,
        ],
    )
    .unwrap();

    let mut algorithm = one_max_run(8, 10)
        .with_metaheuristic(Arc::new(heuristic))
        .with_termination(GenerationNumberTermination::new(11))
        .build()
        .unwrap();
    algorithm.start().unwrap();

    assert_eq!(first.generations(), vec![1, 2, 3, 6, 7, 8]);
    assert_eq!(second.generations(), vec![4, 5, 9, 10]);
}

#[test]
fn test_overwritten_probability_drives_crossover() {
    init_tracing();
    let options = EvolutionOptions::builder()
        .crossover_probability(0.0)
        .seed(1)
        .build();
    let base = || {
        MetaGeneticAlgorithmBuilder::new()
            .with_population(Population::new(6, 6, BinaryChromosome::from_genes(vec![false; 6])).unwrap())
            .with_fitness(one_max)
            .with_selection(EliteSelection::new())
            .with_crossover(UniformCrossover::default())
            .with_mutation(UniformMutation::new())
            .with_reinsertion(PureReinsertion)
            .with_options(options.clone())
    };

    // The algorithm's probability of 0 never crosses: no offspring, no generation.
    let mut starved = base().build().unwrap();
    assert!(matches!(
        starved.evolve_one_generation(),
        Err(GeneticError::OutOfRange(_))
    ));
    assert_eq!(starved.generation_number(), 1);

    // The container's static probability of 1 replaces it.
    let overwrite: SharedHeuristic<C> = Arc::new(
        ContainerMetaHeuristic::<C>::new()
            .with_probability_strategy(ProbabilityStrategy::OVERWRITE_PROBABILITY)
            .with_static_crossover_probability(1.0),
    );
    let mut crossed = base().with_metaheuristic(overwrite).build().unwrap();
    crossed.evolve_one_generation().unwrap();
    assert_eq!(crossed.generation_number(), 2);
    assert_eq!(crossed.population().chromosomes().len(), 6);
}

#[test]
fn test_switch_run() {
    let heuristic = SwitchMetaHeuristic::if_else(
        Parameter::new("even", ParamScope::GENERATION, |_, ctx| {
            Ok(ctx.generation_number() % 2 == 0)
        }),
        plain(),
        Arc::new(MatchMetaHeuristic::<C>::new(vec![MatchingTechnique::Best]).unwrap()),
    );
    run_with(Arc::new(heuristic), 10, 12, 6);
}

#[test]
fn test_population_phases_run() {
    let heuristic = SizeBasedMetaHeuristic::by_population(
        PhaseSizes::new(vec![4, 6]).unwrap(),
        vec![
            plain(),
            Arc::new(MatchMetaHeuristic::<C>::new(vec![MatchingTechnique::RouletteWheel]).unwrap()),
        ],
    )
    .unwrap();
    run_with(Arc::new(heuristic), 10, 12, 5);
}

#[test]
fn test_matching_run() {
    let heuristic = MatchMetaHeuristic::<C>::new(vec![
        MatchingTechnique::Randomize,
        MatchingTechnique::Worst,
    ])
    .unwrap()
    .with_hyperspeed(true);
    run_with(Arc::new(heuristic), 10, 12, 5);
}

#[test]
fn test_operators_run() {
    let heuristic = OperatorsMetaHeuristic::<C>::new().with_mutation(Parameter::new(
        "mutation",
        ParamScope::GENERATION,
        |_, ctx| {
            let mutation: Arc<dyn Mutation<C>> = if ctx.generation_number() % 2 == 0 {
                Arc::new(TworsMutation::new())
            } else {
                Arc::new(UniformMutation::new())
            };
            Ok(mutation)
        },
    ));
    assert_eq!(heuristic.scope(), EvolutionStage::MUTATION);
    run_with(Arc::new(heuristic), 10, 12, 5);
}

#[test]
fn test_island_run_with_ring_migration() {
    let heuristic = IslandMetaHeuristic::<C>::uniform(2, 6, plain())
        .unwrap()
        .with_migration_mode(MigrationMode::RandomRing)
        .with_migration_period(2)
        .unwrap()
        .with_migration_rate(0.5)
        .unwrap();
    run_with(Arc::new(heuristic), 12, 10, 6);
}

#[test]
fn test_island_run_with_static_migration() {
    let heuristic = IslandMetaHeuristic::<C>::new(
        PhaseSizes::new(vec![6, 4, 4]).unwrap(),
        vec![
            plain(),
            plain(),
            Arc::new(MatchMetaHeuristic::<C>::new(vec![MatchingTechnique::Best]).unwrap()),
        ],
    )
    .unwrap()
    .with_migration_mode(MigrationMode::Static)
    .with_migration_period(1)
    .unwrap();
    run_with(Arc::new(heuristic), 14, 10, 4);
}

#[test]
fn test_island_heuristics_see_island_local_indices() {
    let never_crosses: SharedHeuristic<C> = Arc::new(
        ContainerMetaHeuristic::<C>::new()
            .with_probability_strategy(ProbabilityStrategy::OVERWRITE_PROBABILITY)
            .with_static_crossover_probability(0.0),
    );
    let per_island: SharedHeuristic<C> = Arc::new(
        SizeBasedMetaHeuristic::by_population(
            PhaseSizes::new(vec![3, 2]).unwrap(),
            vec![plain(), never_crosses],
        )
        .unwrap(),
    );
    let islands = IslandMetaHeuristic::<C>::uniform(2, 4, per_island).unwrap();

    let population = SubPopulation::new(
        1,
        (0..8)
            .map(|i| BinaryChromosome::from_genes(vec![i % 2 == 0; 6]))
            .collect(),
    );
    let parents = population.chromosomes().to_vec();
    let cache = ParameterCache::new();
    let rng = RngStreams::from_seed(5);
    let ctx = EvolutionContext::new(&population, &cache, &rng)
        .with_stage(EvolutionStage::CROSSOVER);
    let crossover = OnePointCrossover::new();

    // Individuals 0 and 4 open their island, 2 and 6 are third: all in the first phase.
    for index in [0, 2, 4, 6] {
        let children = islands
            .match_parents_and_cross(&ctx.individual(index), &crossover, 1.0, &parents)
            .unwrap();
        assert!(children.is_some(), "individual {} did not cross", index);
    }
}

#[test]
fn test_eukaryote_run_with_own_reinsertion() {
    let heuristic = EukaryoteMetaHeuristic::<C>::new(
        PhaseSizes::new(vec![4, 6]).unwrap(),
        vec![plain(), plain()],
    )
    .unwrap()
    .with_scope(EvolutionStage::SELECTION | EvolutionStage::CROSSOVER | EvolutionStage::MUTATION);
    run_with(Arc::new(heuristic), 10, 10, 5);
}

#[test]
fn test_eukaryote_reinsertion_is_rejected() {
    init_tracing();
    let heuristic = EukaryoteMetaHeuristic::<C>::new(
        PhaseSizes::new(vec![4, 6]).unwrap(),
        vec![plain(), plain()],
    )
    .unwrap();
    let mut algorithm = one_max_run(10, 10)
        .with_metaheuristic(Arc::new(heuristic))
        .build()
        .unwrap();

    let result = algorithm.evolve_one_generation();
    assert!(matches!(result, Err(GeneticError::UnsupportedOperation(_))));
    assert_eq!(algorithm.generation_number(), 1);
}

#[test]
fn test_karyotype_length_mismatch_surfaces() {
    init_tracing();
    let heuristic = EukaryoteMetaHeuristic::<C>::new(
        PhaseSizes::new(vec![3, 5]).unwrap(),
        vec![plain(), plain()],
    )
    .unwrap();
    let mut algorithm = one_max_run(10, 10)
        .with_metaheuristic(Arc::new(heuristic))
        .build()
        .unwrap();

    assert_eq!(
        algorithm.evolve_one_generation().unwrap_err(),
        GeneticError::KaryotypeLength {
            expected: 8,
            actual: 10
        }
    );
}

#[test]
fn test_nested_composition_run() {
    let islands: SharedHeuristic<C> = Arc::new(
        IslandMetaHeuristic::<C>::uniform(2, 5, plain())
            .unwrap()
            .with_migration_mode(MigrationMode::RandomPermutation),
    );
    let heuristic = SizeBasedMetaHeuristic::by_generation(
        PhaseSizes::new(vec![2, 2]).unwrap(),
        vec![islands, plain()],
    )
    .unwrap();
    run_with(Arc::new(heuristic), 10, 12, 8);
}
