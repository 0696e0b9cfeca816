//! # Caching Module
//!
//! This module provides the scoped cache that backs dynamic parameters. One
//! [`ParameterCache`] lives for exactly one generation: the driver creates it with
//! the generation's evolution context and drops it when the generation ends, so
//! values are never evicted while a generation runs.
//!
//! Values are keyed by a [`CacheKey`] whose dimensions (generation, stage,
//! heuristic, individual) are masked according to the owning parameter's
//! [`ParamScope`]: a masked dimension takes a fixed sentinel so that a value with a
//! coarse scope is shared by every finer context.
//!
//! The cache is shared by the worker threads of a generation. [`ParameterCache::get_or_add`]
//! runs the generator of a key at most once and hands the winning value to every
//! concurrent caller. A generator that asks for its own key on the same thread
//! fails with a configuration error instead of waiting on itself.
//!
//! ```rust
//! use metagenalg::caching::{CacheKey, ParameterCache};
//! use metagenalg::metaheuristics::{EvolutionStage, HeuristicId, ParamScope};
//!
//! let cache = ParameterCache::new();
//! let key = CacheKey::scoped("rate", ParamScope::GENERATION, 3, EvolutionStage::MUTATION, HeuristicId::NONE, 7);
//!
//! let first: f64 = cache.get_or_add(key.clone(), || Ok(0.25)).unwrap();
//! let second: f64 = cache.get_or_add(key, || Ok(0.75)).unwrap();
//! assert_eq!(first, second);
//! ```

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thread_local::ThreadLocal;
use tracing::trace;

use crate::error::{GeneticError, Result};
use crate::metaheuristics::{EvolutionStage, HeuristicId, ParamScope};

/// Sentinel of a masked generation or individual dimension.
const MASKED_INDEX: usize = usize::MAX;

type CachedValue = Arc<dyn Any + Send + Sync>;
type Slot = Arc<Mutex<Option<CachedValue>>>;

/// Identifies a cached value: a parameter name plus the scope dimensions that
/// matter to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: Arc<str>,
    generation: usize,
    stage: EvolutionStage,
    heuristic: HeuristicId,
    individual: usize,
}

impl CacheKey {
    /// Builds a key from every dimension, masking those `scope` does not contain.
    ///
    /// # Arguments
    ///
    /// * `name` - The parameter name.
    /// * `scope` - The parameter scope.
    /// * `generation` - The current generation number.
    /// * `stage` - The current evolution stage.
    /// * `heuristic` - The heuristic resolving the parameter.
    /// * `individual` - The global index of the current individual.
    pub fn scoped(
        name: impl Into<Arc<str>>,
        scope: ParamScope,
        generation: usize,
        stage: EvolutionStage,
        heuristic: HeuristicId,
        individual: usize,
    ) -> Self {
        Self {
            name: name.into(),
            generation: if scope.contains(ParamScope::GENERATION) {
                generation
            } else {
                MASKED_INDEX
            },
            stage: if scope.contains(ParamScope::STAGE) {
                stage
            } else {
                EvolutionStage::NONE
            },
            heuristic: if scope.contains(ParamScope::META_HEURISTIC) {
                heuristic
            } else {
                HeuristicId::NONE
            },
            individual: if scope.contains(ParamScope::INDIVIDUAL) {
                individual
            } else {
                MASKED_INDEX
            },
        }
    }

    /// Returns the parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the generation dimension, `None` when masked.
    pub fn generation(&self) -> Option<usize> {
        (self.generation != MASKED_INDEX).then_some(self.generation)
    }

    /// Returns the stage dimension (`EvolutionStage::NONE` when masked).
    pub fn stage(&self) -> EvolutionStage {
        self.stage
    }

    /// Returns the heuristic dimension (`HeuristicId::NONE` when masked).
    pub fn heuristic(&self) -> HeuristicId {
        self.heuristic
    }

    /// Returns the individual dimension, `None` when masked.
    pub fn individual(&self) -> Option<usize> {
        (self.individual != MASKED_INDEX).then_some(self.individual)
    }
}

/// A thread-safe get-or-add store for the values of one generation.
#[derive(Default)]
pub struct ParameterCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    generator_runs: AtomicUsize,
    // Keys whose generator is running on each thread.
    pending: ThreadLocal<RefCell<Vec<CacheKey>>>,
}

impl ParameterCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value cached under `key`, running `generator` to produce it if
    /// the key has no value yet.
    ///
    /// Concurrent callers for the same key wait for the first one; the generator of
    /// a key runs at most once as long as it succeeds. A failed generator leaves
    /// the key empty, so a later call retries it.
    ///
    /// # Errors
    ///
    /// Returns the generator's error, `GeneticError::ParameterType` if the value
    /// cached under `key` is not a `T`, or `GeneticError::Configuration` if the
    /// generator of `key` asks for `key` again.
    pub fn get_or_add<T, F>(&self, key: CacheKey, generator: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T>,
    {
        let pending = self.pending.get_or_default();
        if pending.borrow().contains(&key) {
            return Err(GeneticError::Configuration(format!(
                "Parameter '{}' depends on itself",
                key.name()
            )));
        }

        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let mut value = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = value.as_ref() {
            return Self::downcast(cached, &key);
        }

        trace!(key = ?key, "computing cached value");
        pending.borrow_mut().push(key.clone());
        let computed = generator();
        pending.borrow_mut().retain(|running| running != &key);
        let computed = computed?;
        self.generator_runs.fetch_add(1, Ordering::Relaxed);
        *value = Some(Arc::new(computed.clone()));
        Ok(computed)
    }

    /// Returns the value cached under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::ParameterType` if the cached value is not a `T`.
    pub fn get<T>(&self, key: &CacheKey) -> Result<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            match slots.get(key) {
                Some(slot) => Arc::clone(slot),
                None => return Ok(None),
            }
        };
        let value = slot.lock().unwrap_or_else(PoisonError::into_inner);
        value
            .as_ref()
            .map(|cached| Self::downcast(cached, key))
            .transpose()
    }

    /// Returns the number of keys holding a value.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.values().cloned().collect()
        };
        slots
            .iter()
            .filter(|slot| {
                slot.try_lock()
                    .map(|value| value.is_some())
                    .unwrap_or(false)
            })
            .count()
    }

    /// Returns `true` when no key holds a value.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns how many generators have completed successfully.
    pub fn generator_runs(&self) -> usize {
        self.generator_runs.load(Ordering::Relaxed)
    }

    fn downcast<T: Clone + 'static>(cached: &CachedValue, key: &CacheKey) -> Result<T> {
        cached
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| GeneticError::ParameterType {
                name: key.name().to_string(),
                expected: type_name::<T>(),
            })
    }
}

impl fmt::Debug for ParameterCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterCache")
            .field("generator_runs", &self.generator_runs())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::sync::atomic::AtomicUsize;

    fn key(name: &str, scope: ParamScope, generation: usize, individual: usize) -> CacheKey {
        CacheKey::scoped(
            name,
            scope,
            generation,
            EvolutionStage::CROSSOVER,
            HeuristicId::NONE,
            individual,
        )
    }

    #[test]
    fn test_masking() {
        let coarse = key("p", ParamScope::GENERATION, 4, 1);
        assert_eq!(coarse, key("p", ParamScope::GENERATION, 4, 2));
        assert_ne!(coarse, key("p", ParamScope::GENERATION, 5, 1));
        assert_eq!(coarse.individual(), None);
        assert_eq!(coarse.generation(), Some(4));
        assert_eq!(coarse.stage(), EvolutionStage::NONE);

        let fine = key("p", ParamScope::GENERATION | ParamScope::INDIVIDUAL, 4, 1);
        assert_ne!(fine, key("p", ParamScope::GENERATION | ParamScope::INDIVIDUAL, 4, 2));
        assert_eq!(fine.individual(), Some(1));
    }

    #[test]
    fn test_get_or_add_runs_generator_once() {
        let cache = ParameterCache::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let value: usize = cache
                .get_or_add(key("p", ParamScope::GENERATION, 1, 0), || {
                    Ok(calls.fetch_add(1, Ordering::SeqCst) + 10)
                })
                .unwrap();
            assert_eq!(value, 10);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.generator_runs(), 1);
    }

    #[test]
    fn test_failed_generator_leaves_slot_empty() {
        let cache = ParameterCache::new();
        let k = key("p", ParamScope::GENERATION, 1, 0);
        let failed: Result<u8> =
            cache.get_or_add(k.clone(), || Err(GeneticError::Operator("boom".to_string())));
        assert!(failed.is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.get::<u8>(&k), Ok(None));

        let value: u8 = cache.get_or_add(k.clone(), || Ok(3)).unwrap();
        assert_eq!(value, 3);
        assert_eq!(cache.get::<u8>(&k), Ok(Some(3)));
    }

    #[test]
    fn test_generator_asking_for_its_own_key_fails() {
        let cache = ParameterCache::new();
        let k = key("loop", ParamScope::GENERATION, 1, 0);
        let result: Result<u8> = cache.get_or_add(k.clone(), || {
            cache.get_or_add(k.clone(), || Ok(1_u8)).map(|inner| inner + 1)
        });
        assert!(matches!(
            result,
            Err(GeneticError::Configuration(ref message)) if message.contains("loop")
        ));
        assert!(cache.is_empty());

        // The key is usable again once the cycle is gone
        let value: u8 = cache.get_or_add(k, || Ok(4)).unwrap();
        assert_eq!(value, 4);
    }

    #[test]
    fn test_nested_generators_for_other_keys() {
        let cache = ParameterCache::new();
        let outer = key("outer", ParamScope::GENERATION, 1, 0);
        let inner = key("inner", ParamScope::GENERATION, 1, 0);
        let value: u32 = cache
            .get_or_add(outer, || {
                cache
                    .get_or_add(inner.clone(), || Ok(20_u32))
                    .map(|v| v + 1)
            })
            .unwrap();
        assert_eq!(value, 21);
        assert_eq!(cache.get::<u32>(&inner), Ok(Some(20)));
        assert_eq!(cache.generator_runs(), 2);
    }

    #[test]
    fn test_type_mismatch() {
        let cache = ParameterCache::new();
        let k = key("p", ParamScope::GENERATION, 1, 0);
        let _: u8 = cache.get_or_add(k.clone(), || Ok(3)).unwrap();
        let mismatch: Result<String> = cache.get_or_add(k, || Ok(String::new()));
        assert!(matches!(
            mismatch,
            Err(GeneticError::ParameterType { ref name, .. }) if name == "p"
        ));
    }

    #[test]
    fn test_contended_get_or_add_runs_generator_once() {
        let cache = ParameterCache::new();
        let calls = AtomicUsize::new(0);
        let values: Vec<usize> = (0..256)
            .into_par_iter()
            .map(|i| {
                cache
                    .get_or_add(key("shared", ParamScope::GENERATION, 1, i), || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(i)
                    })
                    .unwrap()
            })
            .collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| *v == values[0]));
    }
}
