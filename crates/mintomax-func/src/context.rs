//! Call context handed to aggregate transition and final functions.
//!
//! The host creates one context per invocation. An aggregate context
//! carries the aggregation region: the long-lived memory region that owns
//! a group's accumulator and is released at the group boundary. Every
//! context also carries a per-call region for temporaries.

use mintomax_error::{MinToMaxError, Result};
use mintomax_types::{MemoryRegion, ScopedRegion};

/// How the current function was invoked by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Plain aggregate evaluation (`GROUP BY` or whole-input).
    Aggregate,
    /// Aggregate evaluated as a window function.
    Window,
    /// Ordinary scalar call; aggregate-only functions must reject it.
    Plain,
}

/// Context for one function invocation.
#[derive(Debug, Clone)]
pub struct FunctionCallContext {
    kind: CallKind,
    agg_region: Option<MemoryRegion>,
    call_region: MemoryRegion,
}

impl FunctionCallContext {
    /// Context for an aggregate call whose group state lives in `agg_region`.
    pub fn aggregate(agg_region: &MemoryRegion) -> Self {
        Self::with_kind(CallKind::Aggregate, Some(agg_region.clone()))
    }

    /// Context for an aggregate evaluated over a window frame.
    pub fn window(agg_region: &MemoryRegion) -> Self {
        Self::with_kind(CallKind::Window, Some(agg_region.clone()))
    }

    /// Context for a call outside any aggregation.
    pub fn plain() -> Self {
        Self::with_kind(CallKind::Plain, None)
    }

    fn with_kind(kind: CallKind, agg_region: Option<MemoryRegion>) -> Self {
        Self {
            kind,
            agg_region,
            call_region: MemoryRegion::new("function call"),
        }
    }

    pub const fn kind(&self) -> CallKind {
        self.kind
    }

    /// Confirm this is an aggregate call and return the aggregation region.
    ///
    /// `function` names the caller for the error message.
    pub fn agg_check_call_context(&self, function: &str) -> Result<&MemoryRegion> {
        match (self.kind, self.agg_region.as_ref()) {
            (CallKind::Aggregate | CallKind::Window, Some(region)) => Ok(region),
            _ => Err(MinToMaxError::not_aggregate_context(function)),
        }
    }

    /// The per-call region temporaries are scoped from.
    pub fn call_region(&self) -> &MemoryRegion {
        &self.call_region
    }

    /// Open a scope for temporaries that must not outlive the current call.
    pub fn working_scope(&self, label: &str) -> ScopedRegion {
        self.call_region.scope(label)
    }
}
