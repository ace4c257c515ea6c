//! Host-side services the `min_to_max` aggregate calls into.
//!
//! - [`kind`]: type tags and the five supported numeric kinds
//! - [`value`]: typed datums plus their canonical text input/output
//! - [`array`]: append-only array building and materialized typed arrays
//! - [`memory`]: id'd, nested memory regions with scoped release

pub mod array;
pub mod kind;
pub mod memory;
pub mod value;

pub use array::{ArrayBuildState, ArrayValue};
pub use kind::{NumericKind, TypeTag};
pub use memory::{MemoryRegion, RegionId, ScopedRegion};
pub use value::{Datum, TypedArg, format_float4, format_float8};
