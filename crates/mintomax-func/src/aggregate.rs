//! Aggregate function trait with type-erased state adapter.
//!
//! Aggregate functions accumulate a result across multiple rows. Each
//! aggregation group gets its own state.
//!
//! # Type Erasure
//!
//! The [`FunctionRegistry`](crate::FunctionRegistry) stores aggregates as
//! `Arc<dyn AggregateFunction<State = Box<dyn Any + Send>>>`. Concrete
//! implementations use [`AggregateAdapter`] to wrap their typed state.
#![allow(clippy::unnecessary_literal_bound)]

use std::any::Any;

use mintomax_error::{MinToMaxError, Result};
use mintomax_types::{Datum, TypedArg};

use crate::FunctionCallContext;

/// An aggregate SQL function.
///
/// # State Lifecycle
///
/// 1. [`initial_state`](Self::initial_state) creates a fresh accumulator.
/// 2. [`step`](Self::step) is called once per row.
/// 3. [`finalize`](Self::finalize) consumes the state and returns the result.
///
/// Both `step` and `finalize` receive the host's [`FunctionCallContext`],
/// which identifies the aggregation and the memory regions of the call.
pub trait AggregateFunction: Send + Sync {
    /// The per-group accumulator type.
    type State: Send;

    /// Create a fresh accumulator (zero/identity state).
    fn initial_state(&self) -> Self::State;

    /// Process one row, updating the accumulator.
    fn step(
        &self,
        cx: &FunctionCallContext,
        state: &mut Self::State,
        args: &[TypedArg],
    ) -> Result<()>;

    /// Consume the accumulator and produce the final result.
    fn finalize(&self, cx: &FunctionCallContext, state: Self::State) -> Result<Datum>;

    /// The number of arguments this function accepts (`-1` = variadic).
    fn num_args(&self) -> i32;

    /// The function name, used in error messages.
    fn name(&self) -> &str;
}

/// Type-erased adapter that wraps a concrete [`AggregateFunction`] so the
/// registry can store heterogeneous aggregates behind a single trait object.
pub struct AggregateAdapter<F> {
    inner: F,
}

impl<F> AggregateAdapter<F> {
    /// Wrap a concrete aggregate function for type-erased storage.
    pub const fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F> AggregateFunction for AggregateAdapter<F>
where
    F: AggregateFunction,
    F::State: 'static,
{
    type State = Box<dyn Any + Send>;

    fn initial_state(&self) -> Self::State {
        Box::new(self.inner.initial_state())
    }

    fn step(
        &self,
        cx: &FunctionCallContext,
        state: &mut Self::State,
        args: &[TypedArg],
    ) -> Result<()> {
        let concrete = state
            .downcast_mut::<F::State>()
            .ok_or_else(|| state_mismatch(self.inner.name()))?;
        self.inner.step(cx, concrete, args)
    }

    fn finalize(&self, cx: &FunctionCallContext, state: Self::State) -> Result<Datum> {
        let concrete = state
            .downcast::<F::State>()
            .map_err(|_| state_mismatch(self.inner.name()))?;
        self.inner.finalize(cx, *concrete)
    }

    fn num_args(&self) -> i32 {
        self.inner.num_args()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

fn state_mismatch(name: &str) -> MinToMaxError {
    MinToMaxError::internal(format!("aggregate state type mismatch for {name}"))
}
