//! `min_to_max(value [, separator])`: the (min, max) of a group as text.
//!
//! The transition function appends every argument, NULLs included, to a
//! per-group array without looking at its type. The final function
//! materializes that array once, resolves its numeric kind, scans for the
//! extrema while skipping NULLs, and renders `"<min><sep><max>"`.
//!
//! Type checking happens only in the final function. A group mixing two
//! numeric kinds, or holding an unsupported type, fails there and never at
//! append time.
//!
//! # Floating-point ordering
//!
//! Comparisons are strict IEEE comparisons, so a NaN never replaces an
//! ordered running minimum or maximum. A NaN can only stand in the result
//! when the group holds no ordered value at all (`NaN->NaN`).

use mintomax_error::{MinToMaxError, Result};
use mintomax_types::{
    ArrayBuildState, ArrayValue, Datum, MemoryRegion, NumericKind, RegionId, TypeTag, TypedArg,
};
use tracing::{debug, debug_span, trace};

use crate::{AggregateFunction, FunctionCallContext};

/// Separator used when a step supplies none.
pub const DEFAULT_SEPARATOR: &str = "->";

const SFUNC_NAME: &str = "min_to_max_sfunc";
const FFUNC_NAME: &str = "min_to_max_ffunc";

/// Per-group state of `min_to_max`.
#[derive(Debug, Clone, Default)]
pub enum MinToMaxState {
    /// No row has been seen for this group.
    #[default]
    Empty,
    /// At least one step ran (possibly with a NULL value).
    Accumulating(Accumulator),
}

impl MinToMaxState {
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The separator the final function will use.
    pub fn separator(&self) -> &str {
        match self {
            Self::Empty => DEFAULT_SEPARATOR,
            Self::Accumulating(acc) => &acc.separator,
        }
    }
}

/// The values of one group plus the separator its last step asked for.
#[derive(Debug, Clone)]
pub struct Accumulator {
    values: ArrayBuildState,
    separator: String,
}

impl Accumulator {
    fn new(element_type: TypeTag, region: &MemoryRegion) -> Self {
        Self {
            values: ArrayBuildState::new(element_type, region),
            separator: DEFAULT_SEPARATOR.to_owned(),
        }
    }

    /// The type of the first non-NULL value, or the declared type of the
    /// first step while the group holds only NULLs.
    pub fn element_type(&self) -> TypeTag {
        self.values.element_type()
    }

    /// Number of steps seen, NULLs included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// The aggregation region that owns this accumulator.
    pub fn region_id(&self) -> RegionId {
        self.values.region_id()
    }

    fn set_separator(&mut self, separator: &str) {
        if self.separator != separator {
            separator.clone_into(&mut self.separator);
        }
    }
}

/// Transition function: append `value` to the group and record the separator.
///
/// The first call creates the accumulator in the context's aggregation
/// region, even when the value is NULL. The group's numeric kind is fixed by
/// the first non-NULL value; the first call's declared type only applies to
/// a group that never sees one. `separator` replaces the group's separator on
/// every call; `None` restores [`DEFAULT_SEPARATOR`].
pub fn min_to_max_step(
    cx: &FunctionCallContext,
    state: &mut MinToMaxState,
    value: TypedArg,
    separator: Option<&str>,
) -> Result<()> {
    let Some(type_tag) = value.type_tag else {
        return Err(MinToMaxError::InvalidParameter { index: 1 });
    };
    let region = cx.agg_check_call_context(SFUNC_NAME)?;

    if state.is_empty() {
        debug!(
            function = SFUNC_NAME,
            region = region.id().get(),
            declared_type = %type_tag,
            "min_to_max accumulator created"
        );
        *state = MinToMaxState::Accumulating(Accumulator::new(type_tag, region));
    }
    let MinToMaxState::Accumulating(acc) = state else {
        return Err(MinToMaxError::internal("min_to_max accumulator missing after creation"));
    };
    if acc.region_id() != region.id() {
        return Err(MinToMaxError::RegionMismatch {
            expected: acc.region_id().get(),
            actual: region.id().get(),
        });
    }

    acc.set_separator(separator.unwrap_or(DEFAULT_SEPARATOR));
    trace!(
        function = SFUNC_NAME,
        is_null = value.is_null(),
        type_tag = %type_tag,
        "min_to_max append"
    );
    acc.values.accum(value.value);
    Ok(())
}

/// Final function: render the group's `(min, max)` as `"<min><sep><max>"`.
///
/// Returns the empty string when the group never stepped or saw only NULLs.
/// The state is only read, so calling this twice yields the same text.
/// Temporaries live in a scope of the call region that is released before
/// returning, whether or not the call succeeds.
pub fn min_to_max_final(cx: &FunctionCallContext, state: &MinToMaxState) -> Result<String> {
    cx.agg_check_call_context(FFUNC_NAME)?;
    let MinToMaxState::Accumulating(acc) = state else {
        debug!(function = FFUNC_NAME, "empty group");
        return Ok(String::new());
    };

    let _span = debug_span!("min_to_max_final", nelems = acc.len()).entered();
    let scope = cx.working_scope(FFUNC_NAME);

    let array = acc.values.make_md_array(&[acc.len()], &[1])?;
    scope.region().charge(array.heap_size());

    let Some(extrema) = compute_extrema(&array)? else {
        debug!(function = FFUNC_NAME, "no non-NULL values");
        return Ok(String::new());
    };
    let pair = extrema.to_array();
    scope.region().charge(pair.heap_size());

    let rendered = pair.to_text(&acc.separator);
    debug!(
        function = FFUNC_NAME,
        kind = %extrema.kind(),
        scratch_bytes = scope.region().peak_bytes(),
        result = %rendered,
        "min_to_max finalized"
    );
    Ok(rendered)
}

/// The minimum and maximum of a group, in the group's numeric kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extrema {
    SmallInt { min: i16, max: i16 },
    Integer { min: i32, max: i32 },
    BigInt { min: i64, max: i64 },
    Real { min: f32, max: f32 },
    Double { min: f64, max: f64 },
}

impl Extrema {
    pub const fn kind(&self) -> NumericKind {
        match self {
            Self::SmallInt { .. } => NumericKind::SmallInt,
            Self::Integer { .. } => NumericKind::Integer,
            Self::BigInt { .. } => NumericKind::BigInt,
            Self::Real { .. } => NumericKind::Real,
            Self::Double { .. } => NumericKind::DoublePrecision,
        }
    }

    pub const fn min(&self) -> Datum {
        match *self {
            Self::SmallInt { min, .. } => Datum::SmallInt(min),
            Self::Integer { min, .. } => Datum::Integer(min),
            Self::BigInt { min, .. } => Datum::BigInt(min),
            Self::Real { min, .. } => Datum::Real(min),
            Self::Double { min, .. } => Datum::Double(min),
        }
    }

    pub const fn max(&self) -> Datum {
        match *self {
            Self::SmallInt { max, .. } => Datum::SmallInt(max),
            Self::Integer { max, .. } => Datum::Integer(max),
            Self::BigInt { max, .. } => Datum::BigInt(max),
            Self::Real { max, .. } => Datum::Real(max),
            Self::Double { max, .. } => Datum::Double(max),
        }
    }

    /// The two-element array `[min, max]`, both present.
    pub fn to_array(&self) -> ArrayValue {
        ArrayValue::construct(self.kind().tag(), vec![Some(self.min()), Some(self.max())])
    }
}

/// Validate a materialized group array and scan it for its extrema.
///
/// Fails if the array is not one-dimensional, if its element type is not one
/// of the five numeric kinds, or if a present element carries a different
/// kind than the array. Returns `None` when no element is present.
pub fn compute_extrema(array: &ArrayValue) -> Result<Option<Extrema>> {
    if array.ndim() > 1 {
        return Err(MinToMaxError::NotOneDimensional {
            ndims: array.ndim(),
        });
    }
    let kind = NumericKind::try_from(array.element_type())?;
    let elements = array.elements();

    let extrema = match kind {
        NumericKind::SmallInt => scan(kind, elements, Datum::as_small_int)?
            .map(|(min, max)| Extrema::SmallInt { min, max }),
        NumericKind::Integer => scan(kind, elements, Datum::as_integer)?
            .map(|(min, max)| Extrema::Integer { min, max }),
        NumericKind::BigInt => scan(kind, elements, Datum::as_big_int)?
            .map(|(min, max)| Extrema::BigInt { min, max }),
        NumericKind::Real => {
            scan(kind, elements, Datum::as_real)?.map(|(min, max)| Extrema::Real { min, max })
        }
        NumericKind::DoublePrecision => scan(kind, elements, Datum::as_double)?
            .map(|(min, max)| Extrema::Double { min, max }),
    };
    Ok(extrema)
}

/// Scalar types the extrema scan can compare.
trait Extremum: Copy + PartialOrd {
    /// NaN for floats; never true for integers.
    fn is_unordered(self) -> bool {
        false
    }
}

impl Extremum for i16 {}
impl Extremum for i32 {}
impl Extremum for i64 {}

impl Extremum for f32 {
    fn is_unordered(self) -> bool {
        self.is_nan()
    }
}

impl Extremum for f64 {
    fn is_unordered(self) -> bool {
        self.is_nan()
    }
}

fn scan<T: Extremum>(
    kind: NumericKind,
    elements: &[Option<Datum>],
    extract: fn(&Datum) -> Option<T>,
) -> Result<Option<(T, T)>> {
    let mut running: Option<(T, T)> = None;
    for (index, datum) in elements.iter().enumerate() {
        let Some(datum) = datum else {
            continue;
        };
        let value = extract(datum).ok_or_else(|| MinToMaxError::MixedDatatypes {
            expected: kind.to_string(),
            actual: datum.tag().to_string(),
            index: index + 1,
        })?;
        running = Some(match running {
            // An unordered seed means every value so far was NaN.
            Some((min, _)) if min.is_unordered() => (value, value),
            Some((min, max)) => (
                if value < min { value } else { min },
                if value > max { value } else { max },
            ),
            None => (value, value),
        });
    }
    Ok(running)
}

/// `min_to_max` as a registrable aggregate taking one or two arguments.
pub struct MinToMaxFunc;

impl AggregateFunction for MinToMaxFunc {
    type State = MinToMaxState;

    fn initial_state(&self) -> Self::State {
        MinToMaxState::Empty
    }

    fn step(
        &self,
        cx: &FunctionCallContext,
        state: &mut Self::State,
        args: &[TypedArg],
    ) -> Result<()> {
        let (value, separator) = match args {
            [value] => (value, None),
            [value, separator] => (value, separator.value.as_ref().map(Datum::to_text)),
            _ => {
                return Err(MinToMaxError::WrongArgumentCount {
                    name: self.name().to_owned(),
                    actual: args.len(),
                });
            }
        };
        min_to_max_step(cx, state, value.clone(), separator.as_deref())
    }

    fn finalize(&self, cx: &FunctionCallContext, state: Self::State) -> Result<Datum> {
        min_to_max_final(cx, &state).map(Datum::Text)
    }

    fn num_args(&self) -> i32 {
        -1
    }

    fn name(&self) -> &str {
        "min_to_max"
    }
}
