//! # Dynamic Parameters
//!
//! A [`Parameter`] is a named value a metaheuristic computes lazily from the
//! evolution context: the phase a generation belongs to, the roulette wheel of a
//! parent pool, the operator to use for an individual. Its [`ParamScope`] tells how
//! widely a computed value is reused:
//!
//! * `NONE`: never cached, computed on every access.
//! * `CONSTANT`: computed once and memoised inside the parameter for its lifetime.
//! * any combination of `GENERATION`, `STAGE`, `META_HEURISTIC` and `INDIVIDUAL`:
//!   cached in the generation's [`ParameterCache`](crate::caching::ParameterCache)
//!   under a key keeping only those dimensions.
//!
//! Parameters are registered on a heuristic's [`ParameterRegistry`] and can be
//! resolved by name with
//! [`EvolutionContext::get_param`](crate::metaheuristics::EvolutionContext::get_param).
//!
//! A parameter is produced either by a plain generator function or by a
//! [`ParameterExpression`], which composes other registered parameters and
//! literals. An expression is compiled against the registry of the heuristic
//! that first resolves it; the compiled generator is then reused. A parameter
//! whose generator resolves the parameter itself fails with
//! `GeneticError::Configuration`.
//!
//! ```rust
//! use metagenalg::chromosome::BinaryChromosome;
//! use metagenalg::metaheuristics::{Binding, ParamScope, Parameter, ParameterExpression};
//!
//! // "phase = generation number modulo period", period being another parameter.
//! let period: Parameter<BinaryChromosome, usize> =
//!     Parameter::new("period", ParamScope::CONSTANT, |_, _| Ok(4));
//! let phase: Parameter<BinaryChromosome, usize> = Parameter::from_expression(
//!     "phase",
//!     ParamScope::GENERATION,
//!     ParameterExpression::contextual(Binding::Parameter("period".to_string()), |ctx, period: usize| {
//!         ctx.generation_number() % period
//!     }),
//! );
//! # let _ = (period, phase);
//! ```

use std::any::{type_name, Any};
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use thread_local::ThreadLocal;

use crate::chromosome::Chromosome;
use crate::error::{GeneticError, Result};
use crate::metaheuristics::{EvolutionContext, MetaHeuristic};

flags! {
    /// The cache dimensions a parameter value depends on.
    pub struct ParamScope: u8 {
        const NONE = 0;
        const CONSTANT = 1;
        const GENERATION = 2;
        const STAGE = 4;
        const META_HEURISTIC = 8;
        const INDIVIDUAL = 16;
    }
}

/// Values a parameter can produce.
pub trait ParameterValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> ParameterValue for T {}

/// A function computing a parameter value for a heuristic in a context.
pub type ParameterGenerator<C, T> =
    Arc<dyn Fn(&dyn MetaHeuristic<C>, &EvolutionContext<'_, C>) -> Result<T> + Send + Sync>;

/// Wraps a closure into a [`ParameterGenerator`].
pub fn generator<C, T, F>(f: F) -> ParameterGenerator<C, T>
where
    C: Chromosome,
    F: Fn(&dyn MetaHeuristic<C>, &EvolutionContext<'_, C>) -> Result<T> + Send + Sync + 'static,
{
    Arc::new(f)
}

enum ParameterSource<C: Chromosome, T> {
    Function(ParameterGenerator<C, T>),
    Expression {
        expression: ParameterExpression<C, T>,
        compiled: RwLock<Option<ParameterGenerator<C, T>>>,
    },
}

/// A named, lazily computed, scope-cached value.
pub struct Parameter<C: Chromosome, T: ParameterValue> {
    name: Arc<str>,
    scope: ParamScope,
    source: ParameterSource<C, T>,
    constant: OnceLock<T>,
    // Set while the calling thread computes an uncached value.
    resolving: ThreadLocal<Cell<bool>>,
}

impl<C: Chromosome, T: ParameterValue> Parameter<C, T> {
    /// Creates a parameter computed by `f`.
    pub fn new<F>(name: impl Into<Arc<str>>, scope: ParamScope, f: F) -> Self
    where
        F: Fn(&dyn MetaHeuristic<C>, &EvolutionContext<'_, C>) -> Result<T>
            + Send
            + Sync
            + 'static,
    {
        Self::from_generator(name, scope, generator(f))
    }

    /// Creates a parameter computed by an existing generator.
    pub fn from_generator(
        name: impl Into<Arc<str>>,
        scope: ParamScope,
        generator: ParameterGenerator<C, T>,
    ) -> Self {
        Self {
            name: name.into(),
            scope,
            source: ParameterSource::Function(generator),
            constant: OnceLock::new(),
            resolving: ThreadLocal::new(),
        }
    }

    /// Creates a parameter computed by an expression over other parameters.
    pub fn from_expression(
        name: impl Into<Arc<str>>,
        scope: ParamScope,
        expression: ParameterExpression<C, T>,
    ) -> Self {
        Self {
            name: name.into(),
            scope,
            source: ParameterSource::Expression {
                expression,
                compiled: RwLock::new(None),
            },
            constant: OnceLock::new(),
            resolving: ThreadLocal::new(),
        }
    }

    /// Creates a constant parameter holding `value`.
    pub fn fixed(name: impl Into<Arc<str>>, value: T) -> Self {
        Self::new(name, ParamScope::CONSTANT, move |_, _| Ok(value.clone()))
    }

    /// Returns the same parameter under another name.
    pub fn renamed(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameter scope.
    pub fn scope(&self) -> ParamScope {
        self.scope
    }

    /// Resolves the value for `heuristic` in `ctx`, honouring the scope.
    ///
    /// # Errors
    ///
    /// Returns the generator's error, an expression binding error, or
    /// `GeneticError::Configuration` if computing the value resolves this
    /// parameter again.
    pub fn get(&self, heuristic: &dyn MetaHeuristic<C>, ctx: &EvolutionContext<'_, C>) -> Result<T> {
        if self.scope.is_empty() {
            return self.compute_uncached(heuristic, ctx);
        }

        if self.scope.contains(ParamScope::CONSTANT) {
            if let Some(value) = self.constant.get() {
                return Ok(value.clone());
            }
            let value = self.compute_uncached(heuristic, ctx)?;
            // A concurrent first use may win the race; every caller returns the winner.
            let _ = self.constant.set(value.clone());
            return Ok(self.constant.get().cloned().unwrap_or(value));
        }

        let key = ctx.cache_key(Arc::clone(&self.name), self.scope, heuristic.id());
        ctx.get_or_add(key, || self.compute(heuristic, ctx))
    }

    fn compute_uncached(
        &self,
        heuristic: &dyn MetaHeuristic<C>,
        ctx: &EvolutionContext<'_, C>,
    ) -> Result<T> {
        let resolving = self.resolving.get_or_default();
        if resolving.replace(true) {
            return Err(GeneticError::Configuration(format!(
                "Parameter '{}' depends on itself",
                self.name
            )));
        }
        let value = self.compute(heuristic, ctx);
        resolving.set(false);
        value
    }

    fn compute(&self, heuristic: &dyn MetaHeuristic<C>, ctx: &EvolutionContext<'_, C>) -> Result<T> {
        match &self.source {
            ParameterSource::Function(generator) => generator(heuristic, ctx),
            ParameterSource::Expression {
                expression,
                compiled,
            } => {
                let generator = Self::compiled(expression, compiled, heuristic)?;
                generator(heuristic, ctx)
            }
        }
    }

    fn compiled(
        expression: &ParameterExpression<C, T>,
        compiled: &RwLock<Option<ParameterGenerator<C, T>>>,
        heuristic: &dyn MetaHeuristic<C>,
    ) -> Result<ParameterGenerator<C, T>> {
        if let Some(generator) = compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(generator));
        }

        let mut slot = compiled.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(generator) = slot.as_ref() {
            return Ok(Arc::clone(generator));
        }
        let generator = expression.compile(heuristic.parameters())?;
        *slot = Some(Arc::clone(&generator));
        Ok(generator)
    }
}

impl<C: Chromosome, T: ParameterValue> fmt::Debug for Parameter<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            ParameterSource::Function(_) => "function",
            ParameterSource::Expression { .. } => "expression",
        };
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("source", &source)
            .field("type", &type_name::<T>())
            .finish()
    }
}

/// The parameters registered on a heuristic, by name.
pub struct ParameterRegistry<C: Chromosome> {
    parameters: HashMap<String, Arc<dyn Any + Send + Sync>>,
    _marker: PhantomData<fn() -> C>,
}

impl<C: Chromosome> ParameterRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            parameters: HashMap::new(),
            _marker: PhantomData,
        }
    }

    /// Registers `parameter` under its name, replacing any previous one.
    ///
    /// # Returns
    ///
    /// The shared registered parameter.
    pub fn register<T: ParameterValue>(&mut self, parameter: Parameter<C, T>) -> Arc<Parameter<C, T>> {
        let parameter = Arc::new(parameter);
        let erased: Arc<dyn Any + Send + Sync> = parameter.clone();
        self.parameters.insert(parameter.name().to_string(), erased);
        parameter
    }

    /// Returns the parameter `name`.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::UnregisteredParameter` if no parameter has that name
    /// and `GeneticError::ParameterType` if it does not produce `T`.
    pub fn get<T: ParameterValue>(&self, name: &str) -> Result<Arc<Parameter<C, T>>> {
        let erased = self
            .parameters
            .get(name)
            .ok_or_else(|| GeneticError::UnregisteredParameter(name.to_string()))?;
        Arc::clone(erased)
            .downcast::<Parameter<C, T>>()
            .map_err(|_| GeneticError::ParameterType {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Returns `true` if a parameter is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// Returns the number of registered parameters.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.parameters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<C: Chromosome> Default for ParameterRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Chromosome> fmt::Debug for ParameterRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// An argument of a [`ParameterExpression`]: a registered parameter looked up by
/// name, or a literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding<U> {
    Parameter(String),
    Literal(U),
}

impl<U: ParameterValue> Binding<U> {
    fn bind<C: Chromosome>(
        &self,
        registry: Option<&ParameterRegistry<C>>,
    ) -> Result<ParameterGenerator<C, U>> {
        match self {
            Binding::Parameter(name) => {
                let parameter = registry
                    .ok_or_else(|| GeneticError::UnregisteredParameter(name.clone()))?
                    .get::<U>(name)?;
                Ok(generator(move |heuristic, ctx| parameter.get(heuristic, ctx)))
            }
            Binding::Literal(value) => {
                let value = value.clone();
                Ok(generator(move |_, _| Ok(value.clone())))
            }
        }
    }
}

type Compiler<C, T> =
    Arc<dyn Fn(Option<&ParameterRegistry<C>>) -> Result<ParameterGenerator<C, T>> + Send + Sync>;

fn compiler<C, T, F>(f: F) -> Compiler<C, T>
where
    C: Chromosome,
    F: Fn(Option<&ParameterRegistry<C>>) -> Result<ParameterGenerator<C, T>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A generator composed from bindings, compiled on first use.
pub struct ParameterExpression<C: Chromosome, T> {
    compile: Compiler<C, T>,
}

impl<C: Chromosome, T: ParameterValue> ParameterExpression<C, T> {
    /// An expression reading only the evolution context.
    pub fn context<F>(f: F) -> Self
    where
        F: Fn(&EvolutionContext<'_, C>) -> T + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self {
            compile: compiler(move |_| {
                let f = Arc::clone(&f);
                Ok(generator(move |_, ctx| Ok(f(ctx))))
            }),
        }
    }

    /// An expression applying `f` to one bound argument.
    pub fn unary<U, F>(argument: Binding<U>, f: F) -> Self
    where
        U: ParameterValue,
        F: Fn(U) -> T + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self {
            compile: compiler(move |registry| {
                let argument = argument.bind(registry)?;
                let f = Arc::clone(&f);
                Ok(generator(move |heuristic, ctx| {
                    Ok(f(argument(heuristic, ctx)?))
                }))
            }),
        }
    }

    /// An expression applying `f` to the context and one bound argument.
    pub fn contextual<U, F>(argument: Binding<U>, f: F) -> Self
    where
        U: ParameterValue,
        F: Fn(&EvolutionContext<'_, C>, U) -> T + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self {
            compile: compiler(move |registry| {
                let argument = argument.bind(registry)?;
                let f = Arc::clone(&f);
                Ok(generator(move |heuristic, ctx| {
                    Ok(f(ctx, argument(heuristic, ctx)?))
                }))
            }),
        }
    }

    /// An expression applying `f` to two bound arguments.
    pub fn binary<U, V, F>(first: Binding<U>, second: Binding<V>, f: F) -> Self
    where
        U: ParameterValue,
        V: ParameterValue,
        F: Fn(U, V) -> T + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self {
            compile: compiler(move |registry| {
                let first = first.bind(registry)?;
                let second = second.bind(registry)?;
                let f = Arc::clone(&f);
                Ok(generator(move |heuristic, ctx| {
                    Ok(f(first(heuristic, ctx)?, second(heuristic, ctx)?))
                }))
            }),
        }
    }

    /// Binds the placeholders against `registry` and returns the generator.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::UnregisteredParameter` or `GeneticError::ParameterType`
    /// if a parameter binding cannot be resolved.
    pub fn compile(
        &self,
        registry: Option<&ParameterRegistry<C>>,
    ) -> Result<ParameterGenerator<C, T>> {
        (self.compile)(registry)
    }
}

impl<C: Chromosome, T> Clone for ParameterExpression<C, T> {
    fn clone(&self) -> Self {
        Self {
            compile: Arc::clone(&self.compile),
        }
    }
}

impl<C: Chromosome, T> fmt::Debug for ParameterExpression<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ParameterExpression")
    }
}
