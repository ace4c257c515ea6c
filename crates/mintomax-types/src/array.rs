//! Typed arrays: incremental building and materialized snapshots.

use std::mem::size_of;

use mintomax_error::{MinToMaxError, Result};
use tracing::trace;

use crate::memory::{MemoryRegion, RegionId};
use crate::{Datum, TypeTag};

/// Append-only working state for building an array one element at a time.
///
/// The element type is pinned by the first present element; until then the
/// declared type given at creation stands in. Appends are permissive: an
/// element whose own tag differs from the pinned type is stored as-is and
/// only surfaces when a consumer inspects the snapshot. Growth of the
/// backing vector is charged to the region the state was created in.
#[derive(Debug, Clone)]
pub struct ArrayBuildState {
    declared_type: TypeTag,
    pinned_type: Option<TypeTag>,
    elements: Vec<Option<Datum>>,
    region: MemoryRegion,
}

impl ArrayBuildState {
    /// Create an empty build state whose storage is owned by `region`.
    pub fn new(declared_type: TypeTag, region: &MemoryRegion) -> Self {
        Self {
            declared_type,
            pinned_type: None,
            elements: Vec::new(),
            region: region.clone(),
        }
    }

    /// Append one element (`None` for NULL).
    pub fn accum(&mut self, value: Option<Datum>) {
        if self.pinned_type.is_none() {
            self.pinned_type = value.as_ref().map(Datum::tag);
        }
        let old_capacity = self.elements.capacity();
        let heap = value.as_ref().map_or(0, Datum::heap_size);
        self.elements.push(value);
        let grown = self.elements.capacity() - old_capacity;
        if grown > 0 || heap > 0 {
            self.region
                .charge(grown * size_of::<Option<Datum>>() + heap);
        }
        trace!(
            region = self.region.id().get(),
            nelems = self.elements.len(),
            grown,
            "array element accumulated"
        );
    }

    /// Tag of the first present element, or the declared type if none is.
    pub fn element_type(&self) -> TypeTag {
        self.pinned_type.unwrap_or(self.declared_type)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The region that owns this state's storage.
    pub fn region_id(&self) -> RegionId {
        self.region.id()
    }

    /// Materialize a snapshot with the given dimensions and lower bounds.
    ///
    /// The product of `dims` must equal the number of accumulated elements.
    /// A zero-element result is the empty array, which has no dimensions.
    /// The build state is left untouched.
    pub fn make_md_array(&self, dims: &[usize], lower_bounds: &[i32]) -> Result<ArrayValue> {
        let nitems: usize = dims.iter().product();
        if dims.len() != lower_bounds.len() || nitems != self.elements.len() {
            return Err(MinToMaxError::ArrayShape {
                dims: dims.to_vec(),
                nelems: self.elements.len(),
            });
        }
        if nitems == 0 {
            return Ok(ArrayValue {
                element_type: self.element_type(),
                dims: Vec::new(),
                lower_bounds: Vec::new(),
                elements: Vec::new(),
            });
        }
        Ok(ArrayValue {
            element_type: self.element_type(),
            dims: dims.to_vec(),
            lower_bounds: lower_bounds.to_vec(),
            elements: self.elements.clone(),
        })
    }
}

/// A fixed, typed array with explicit shape and per-element presence.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    element_type: TypeTag,
    dims: Vec<usize>,
    lower_bounds: Vec<i32>,
    elements: Vec<Option<Datum>>,
}

impl ArrayValue {
    /// Build a one-dimensional array with lower bound 1.
    pub fn construct(element_type: TypeTag, elements: Vec<Option<Datum>>) -> Self {
        if elements.is_empty() {
            return Self {
                element_type,
                dims: Vec::new(),
                lower_bounds: Vec::new(),
                elements,
            };
        }
        Self {
            element_type,
            dims: vec![elements.len()],
            lower_bounds: vec![1],
            elements,
        }
    }

    pub fn element_type(&self) -> TypeTag {
        self.element_type
    }

    /// Number of dimensions (0 for the empty array).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn lower_bounds(&self) -> &[i32] {
        &self.lower_bounds
    }

    /// Total number of elements across all dimensions.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in storage order, `None` marking NULL.
    pub fn elements(&self) -> &[Option<Datum>] {
        &self.elements
    }

    /// Approximate bytes this array occupies.
    pub fn heap_size(&self) -> usize {
        self.elements.capacity() * size_of::<Option<Datum>>()
            + self
                .elements
                .iter()
                .flatten()
                .map(Datum::heap_size)
                .sum::<usize>()
    }

    /// Render non-NULL elements in canonical text form joined by `separator`.
    ///
    /// NULL elements are skipped, so an array with no present elements
    /// renders as the empty string. No brackets or braces are added.
    pub fn to_text(&self, separator: &str) -> String {
        let mut buf = String::new();
        let mut printed = false;
        for value in self.elements.iter().flatten() {
            if printed {
                buf.push_str(separator);
            }
            buf.push_str(&value.to_text());
            printed = true;
        }
        buf
    }
}
