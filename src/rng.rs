//! # RandomNumberGenerator
//!
//! The `RandomNumberGenerator` struct wraps a seedable `StdRng` and provides the
//! draws the engine and its operators need (ranges, probabilities, permutations,
//! index samples).
//!
//! ## Example
//!
//! ```rust
//! use metagenalg::rng::RandomNumberGenerator;
//!
//! let mut rng = RandomNumberGenerator::from_seed(7);
//! let draw = rng.gen_probability();
//! assert!((0.0..1.0).contains(&draw));
//! ```
//!
//! ## Per-thread streams
//!
//! Evolution contexts are shared by the worker threads of one generation. Instead
//! of a process-wide generator, the engine threads an [`RngStreams`] handle through
//! the context: every worker thread lazily receives its own generator derived from
//! the base seed, so no two threads ever share a stream.
//!
//! ```rust
//! use metagenalg::rng::RngStreams;
//!
//! let streams = RngStreams::from_seed(42);
//! let value: usize = streams.with_rng(|rng| rng.gen_range(0..10));
//! assert!(value < 10);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::{
    distributions::uniform::{SampleRange, SampleUniform},
    rngs::StdRng,
    seq::{index, SliceRandom},
    Rng, SeedableRng,
};
use thread_local::ThreadLocal;

/// Multiplier used to spread stream numbers over the seed space.
const STREAM_SPREAD: u64 = 0x9E37_79B9_7F4A_7C15;

/// A wrapper around the `rand` crate's `StdRng`.
#[derive(Debug, Clone)]
pub struct RandomNumberGenerator {
    pub rng: StdRng,
}

impl RandomNumberGenerator {
    /// Creates a new `RandomNumberGenerator` instance seeded from the system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a new `RandomNumberGenerator` instance with a specific seed.
    ///
    /// This is useful for reproducible tests and benchmarks.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generates a random number in the given range.
    ///
    /// # Panics
    ///
    /// Panics if the range is empty, like `rand::Rng::gen_range`.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rng.gen_range(range)
    }

    /// Draws a uniform value in `[0, 1)`.
    pub fn gen_probability(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Returns `true` with the given probability, clamped to `[0, 1]`.
    pub fn gen_bool(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    /// Shuffles a slice in place.
    pub fn shuffle<T>(&mut self, values: &mut [T]) {
        values.shuffle(&mut self.rng);
    }

    /// Returns a uniformly random permutation of `0..len`.
    pub fn permutation(&mut self, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        self.shuffle(&mut order);
        order
    }

    /// Samples `amount` distinct indices from `0..len`, in random order.
    ///
    /// `amount` is capped at `len`.
    pub fn sample_indices(&mut self, len: usize, amount: usize) -> Vec<usize> {
        index::sample(&mut self.rng, len, amount.min(len)).into_vec()
    }
}

impl Default for RandomNumberGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-thread random streams derived from a single optional seed.
///
/// The first time a thread asks for randomness it is assigned the next stream
/// number; with a seed, stream `n` is seeded with `seed + n * spread`. A
/// single-threaded seeded run is therefore fully reproducible.
pub struct RngStreams {
    seed: Option<u64>,
    spawned: AtomicU64,
    streams: ThreadLocal<RefCell<RandomNumberGenerator>>,
}

impl RngStreams {
    /// Creates streams seeded from the system entropy.
    pub fn new() -> Self {
        Self {
            seed: None,
            spawned: AtomicU64::new(0),
            streams: ThreadLocal::new(),
        }
    }

    /// Creates streams derived from a fixed seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            spawned: AtomicU64::new(0),
            streams: ThreadLocal::new(),
        }
    }

    /// Creates streams from an optional seed.
    pub fn with_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::new(),
        }
    }

    /// Returns the base seed, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Returns how many streams have been handed out so far.
    pub fn streams_spawned(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }

    fn spawn(&self) -> RandomNumberGenerator {
        let stream = self.spawned.fetch_add(1, Ordering::Relaxed);
        match self.seed {
            Some(seed) => {
                RandomNumberGenerator::from_seed(seed.wrapping_add(stream.wrapping_mul(STREAM_SPREAD)))
            }
            None => RandomNumberGenerator::new(),
        }
    }

    /// Runs `f` with the calling thread's generator.
    ///
    /// A re-entrant call on the same thread receives a fresh transient stream
    /// instead of the thread's generator.
    pub fn with_rng<R>(&self, f: impl FnOnce(&mut RandomNumberGenerator) -> R) -> R {
        let cell = self.streams.get_or(|| RefCell::new(self.spawn()));
        match cell.try_borrow_mut() {
            Ok(mut rng) => f(&mut rng),
            Err(_) => {
                let mut transient = self.spawn();
                f(&mut transient)
            }
        }
    }
}

impl Default for RngStreams {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RngStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RngStreams")
            .field("seed", &self.seed)
            .field("spawned", &self.streams_spawned())
            .finish()
    }
}
