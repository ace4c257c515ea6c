//! The `min_to_max` aggregate and the trait surface it is exposed through.
//!
//! This crate defines:
//! - the open [`AggregateFunction`] trait and its type-erasing adapter
//! - the host call context handed to every step/final invocation
//! - [`min_to_max`], the streaming `(min, max)` aggregate itself
//!
//! It also provides a small in-memory [`FunctionRegistry`] for resolving
//! aggregates by `(name, num_args)` key with variadic fallback.
#![allow(clippy::unnecessary_literal_bound)]

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

pub mod aggregate;
pub mod context;
pub mod min_to_max;

pub use aggregate::{AggregateAdapter, AggregateFunction};
pub use context::{CallKind, FunctionCallContext};
pub use min_to_max::{
    DEFAULT_SEPARATOR, Extrema, MinToMaxFunc, MinToMaxState, compute_extrema, min_to_max_final,
    min_to_max_step,
};

/// Type-erased aggregate function object used by the registry.
pub type ErasedAggregateFunction = dyn AggregateFunction<State = Box<dyn Any + Send>>;

/// Composite lookup key for functions: `(UPPERCASE name, num_args)`.
///
/// `-1` for `num_args` means variadic (any number of arguments).
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct FunctionKey {
    /// Function name, stored as uppercase ASCII.
    pub name: String,
    /// Expected argument count, or `-1` for variadic.
    pub num_args: i32,
}

impl FunctionKey {
    /// Create a new function key with the name canonicalized to uppercase.
    #[must_use]
    pub fn new(name: &str, num_args: i32) -> Self {
        Self {
            name: canonical_name(name),
            num_args,
        }
    }
}

/// Registry of aggregate functions keyed by `(name, num_args)`.
///
/// Lookup strategy:
/// 1. Exact match on `(UPPERCASE_NAME, num_args)`.
/// 2. Fallback to the variadic version `(UPPERCASE_NAME, -1)`.
/// 3. `None` if neither is found.
#[derive(Default)]
pub struct FunctionRegistry {
    aggregates: HashMap<FunctionKey, Arc<ErasedAggregateFunction>>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an aggregate function using the type-erased adapter.
    ///
    /// Overwrites any existing function with the same `(name, num_args)` key
    /// and returns it.
    pub fn register_aggregate<F>(&mut self, function: F) -> Option<Arc<ErasedAggregateFunction>>
    where
        F: AggregateFunction + 'static,
        F::State: 'static,
    {
        let key = FunctionKey::new(function.name(), function.num_args());
        self.aggregates
            .insert(key, Arc::new(AggregateAdapter::new(function)))
    }

    /// Look up an aggregate function by `(name, num_args)`.
    #[must_use]
    pub fn find_aggregate(
        &self,
        name: &str,
        num_args: i32,
    ) -> Option<Arc<ErasedAggregateFunction>> {
        let canon = canonical_name(name);
        let exact = FunctionKey {
            name: canon.clone(),
            num_args,
        };
        if let Some(f) = self.aggregates.get(&exact) {
            debug!(name = %canon, arity = num_args, hit = "exact", "registry lookup");
            return Some(Arc::clone(f));
        }
        let variadic = FunctionKey {
            name: canon.clone(),
            num_args: -1,
        };
        let result = self.aggregates.get(&variadic).map(Arc::clone);
        debug!(
            name = %canon,
            arity = num_args,
            hit = if result.is_some() { "variadic" } else { "miss" },
            "registry lookup"
        );
        result
    }

    /// Whether any aggregate with this name is registered (any arg count).
    #[must_use]
    pub fn contains_aggregate(&self, name: &str) -> bool {
        let canon = canonical_name(name);
        self.aggregates.keys().any(|k| k.name == canon)
    }
}

/// Register every aggregate this crate provides.
pub fn register_builtins(registry: &mut FunctionRegistry) {
    registry.register_aggregate(MinToMaxFunc);
}

fn canonical_name(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}
