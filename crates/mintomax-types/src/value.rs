use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use mintomax_error::{MinToMaxError, Result};

use crate::TypeTag;

/// Largest decimal exponent (exclusive) printed in fixed notation for `float8`.
const DOUBLE_FIXED_EXPONENT_LIMIT: i32 = 15;

/// Largest decimal exponent (exclusive) printed in fixed notation for `float4`.
const REAL_FIXED_EXPONENT_LIMIT: i32 = 6;

/// Smallest decimal exponent printed in fixed notation for either float width.
const FIXED_EXPONENT_FLOOR: i32 = -4;

/// A non-NULL host value together with its representation.
///
/// NULL is not a `Datum`; absent values travel as `Option<Datum>::None`
/// next to a [`TypeTag`] (see [`TypedArg`]).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Datum {
    /// 16-bit signed integer.
    SmallInt(i16),
    /// 32-bit signed integer.
    Integer(i32),
    /// 64-bit signed integer.
    BigInt(i64),
    /// 32-bit IEEE 754 float.
    Real(f32),
    /// 64-bit IEEE 754 float.
    Double(f64),
    /// Arbitrary-precision decimal in canonical text form.
    Numeric(String),
    /// Character string.
    Text(String),
    /// Boolean.
    Boolean(bool),
}

impl Datum {
    /// The representation of this value.
    pub const fn tag(&self) -> TypeTag {
        match self {
            Self::SmallInt(_) => TypeTag::SmallInt,
            Self::Integer(_) => TypeTag::Integer,
            Self::BigInt(_) => TypeTag::BigInt,
            Self::Real(_) => TypeTag::Real,
            Self::Double(_) => TypeTag::DoublePrecision,
            Self::Numeric(_) => TypeTag::Numeric,
            Self::Text(_) => TypeTag::Text,
            Self::Boolean(_) => TypeTag::Boolean,
        }
    }

    pub const fn as_small_int(&self) -> Option<i16> {
        match self {
            Self::SmallInt(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_big_int(&self) -> Option<i64> {
        match self {
            Self::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_real(&self) -> Option<f32> {
        match self {
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Bytes owned outside the inline enum payload.
    pub fn heap_size(&self) -> usize {
        match self {
            Self::Numeric(s) | Self::Text(s) => s.capacity(),
            _ => 0,
        }
    }

    /// Canonical text form, as the host's default output function prints it.
    ///
    /// - integers: plain decimal
    /// - floats: shortest round-trip digits, see [`format_float8`]
    /// - booleans: `t` / `f`
    pub fn to_text(&self) -> String {
        match self {
            Self::SmallInt(v) => v.to_string(),
            Self::Integer(v) => v.to_string(),
            Self::BigInt(v) => v.to_string(),
            Self::Real(v) => format_float4(*v),
            Self::Double(v) => format_float8(*v),
            Self::Numeric(s) | Self::Text(s) => s.clone(),
            Self::Boolean(b) => if *b { "t" } else { "f" }.to_owned(),
        }
    }

    /// Parse text into a value of type `tag`, as the host's input function does.
    ///
    /// Surrounding whitespace is ignored for every type except `text`.
    pub fn parse(tag: TypeTag, input: &str) -> Result<Self> {
        let trimmed = input.trim();
        match tag {
            TypeTag::SmallInt => parse_int(tag, trimmed).map(Self::SmallInt),
            TypeTag::Integer => parse_int(tag, trimmed).map(Self::Integer),
            TypeTag::BigInt => parse_int(tag, trimmed).map(Self::BigInt),
            TypeTag::Real => {
                let v: f32 = parse_float(tag, trimmed)?;
                Ok(Self::Real(v))
            }
            TypeTag::DoublePrecision => {
                let v: f64 = parse_float(tag, trimmed)?;
                Ok(Self::Double(v))
            }
            TypeTag::Numeric => {
                if is_numeric_literal(trimmed) {
                    Ok(Self::Numeric(trimmed.to_owned()))
                } else {
                    Err(invalid_syntax(tag, input))
                }
            }
            TypeTag::Text => Ok(Self::Text(input.to_owned())),
            TypeTag::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "t" | "true" | "y" | "yes" | "on" | "1" => Ok(Self::Boolean(true)),
                "f" | "false" | "n" | "no" | "off" | "0" => Ok(Self::Boolean(false)),
                _ => Err(invalid_syntax(tag, input)),
            },
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<i16> for Datum {
    fn from(v: i16) -> Self {
        Self::SmallInt(v)
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<f32> for Datum {
    fn from(v: f32) -> Self {
        Self::Real(v)
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<bool> for Datum {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// One function argument: its declared type and its value, or NULL.
///
/// The declared type is known even when the value is NULL. `type_tag` is
/// `None` only when the host could not resolve the argument's type at all.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedArg {
    pub type_tag: Option<TypeTag>,
    pub value: Option<Datum>,
}

impl TypedArg {
    /// A non-NULL argument typed by its own value.
    pub fn new(value: impl Into<Datum>) -> Self {
        let value = value.into();
        Self {
            type_tag: Some(value.tag()),
            value: Some(value),
        }
    }

    /// A NULL argument of declared type `tag`.
    pub const fn null(tag: TypeTag) -> Self {
        Self {
            type_tag: Some(tag),
            value: None,
        }
    }

    /// A NULL argument whose type the host failed to resolve.
    pub const fn unresolved() -> Self {
        Self {
            type_tag: None,
            value: None,
        }
    }

    pub const fn is_null(&self) -> bool {
        self.value.is_none()
    }
}

impl From<Datum> for TypedArg {
    fn from(value: Datum) -> Self {
        Self::new(value)
    }
}

/// Format an `f64` the way the host prints `double precision`.
///
/// Uses the shortest digit string that round-trips. Decimal exponents in
/// `[-4, 15)` print in fixed notation without a trailing `.0` (`-1`, `9.25`,
/// `0.0001`); anything else prints as `d.ddde±XX` (`1e+15`, `1e-05`).
/// Non-finite values print as `NaN`, `Infinity` and `-Infinity`.
pub fn format_float8(f: f64) -> String {
    if let Some(special) = non_finite_text(f.is_nan(), f.is_infinite(), f.is_sign_negative()) {
        return special.to_owned();
    }
    shortest_text(&format!("{f}"), &format!("{f:e}"), DOUBLE_FIXED_EXPONENT_LIMIT)
}

/// Format an `f32` the way the host prints `real`.
///
/// Same rules as [`format_float8`], but fixed notation stops at exponent 6
/// (`100000`, `1.234567e+06`).
pub fn format_float4(f: f32) -> String {
    if let Some(special) = non_finite_text(f.is_nan(), f.is_infinite(), f.is_sign_negative()) {
        return special.to_owned();
    }
    shortest_text(&format!("{f}"), &format!("{f:e}"), REAL_FIXED_EXPONENT_LIMIT)
}

const fn non_finite_text(nan: bool, infinite: bool, negative: bool) -> Option<&'static str> {
    if nan {
        Some("NaN")
    } else if infinite {
        if negative { Some("-Infinity") } else { Some("Infinity") }
    } else {
        None
    }
}

/// Pick fixed or scientific notation from Rust's shortest renderings.
fn shortest_text(fixed: &str, scientific: &str, fixed_limit: i32) -> String {
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return fixed.to_owned();
    };
    let exp: i32 = exponent.parse().unwrap_or(0);
    if (FIXED_EXPONENT_FLOOR..fixed_limit).contains(&exp) {
        return fixed.to_owned();
    }
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
}

fn parse_int<T>(tag: TypeTag, input: &str) -> Result<T>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    input.parse::<T>().map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => out_of_range(tag, input),
        _ => invalid_syntax(tag, input),
    })
}

fn parse_float<T>(tag: TypeTag, input: &str) -> Result<T>
where
    T: FromStr + FloatText,
{
    let value = input
        .parse::<T>()
        .map_err(|_| invalid_syntax(tag, input))?;
    // Rust saturates overflowing literals to infinity; the host rejects them.
    if value.is_infinite_value() && !input.to_ascii_lowercase().contains("inf") {
        return Err(out_of_range(tag, input));
    }
    Ok(value)
}

/// Float widths accepted by [`parse_float`].
trait FloatText {
    fn is_infinite_value(&self) -> bool;
}

impl FloatText for f32 {
    fn is_infinite_value(&self) -> bool {
        self.is_infinite()
    }
}

impl FloatText for f64 {
    fn is_infinite_value(&self) -> bool {
        self.is_infinite()
    }
}

/// `[+-]digits[.digits][e[+-]digits]`, `[+-].digits...`, or `NaN`.
fn is_numeric_literal(s: &str) -> bool {
    if s.eq_ignore_ascii_case("nan") {
        return true;
    }
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exponent) = match body.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (body, None),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all_digits = |t: &str| t.bytes().all(|b| b.is_ascii_digit());
    let mantissa_ok = (!int_part.is_empty() || !frac_part.is_empty())
        && all_digits(int_part)
        && all_digits(frac_part);
    let exponent_ok = exponent.is_none_or(|e| {
        let digits = e.strip_prefix(['+', '-']).unwrap_or(e);
        !digits.is_empty() && all_digits(digits)
    });
    mantissa_ok && exponent_ok
}

fn invalid_syntax(tag: TypeTag, input: &str) -> MinToMaxError {
    MinToMaxError::InvalidTextRepresentation {
        type_name: tag.sql_name().to_owned(),
        input: input.to_owned(),
    }
}

fn out_of_range(tag: TypeTag, input: &str) -> MinToMaxError {
    MinToMaxError::OutOfRange {
        type_name: tag.sql_name().to_owned(),
        input: input.to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_output() {
        assert_eq!(Datum::SmallInt(-32768).to_text(), "-32768");
        assert_eq!(Datum::Integer(7).to_text(), "7");
        assert_eq!(Datum::BigInt(i64::MAX).to_text(), "9223372036854775807");
    }

    #[test]
    fn test_double_fixed_notation() {
        assert_eq!(format_float8(-1.0), "-1");
        assert_eq!(format_float8(9.25), "9.25");
        assert_eq!(format_float8(0.1), "0.1");
        assert_eq!(format_float8(0.0001), "0.0001");
        assert_eq!(format_float8(123_456_789_012_345.0), "123456789012345");
        assert_eq!(format_float8(0.0), "0");
        assert_eq!(format_float8(-0.0), "-0");
    }

    #[test]
    fn test_double_scientific_notation() {
        assert_eq!(format_float8(1e15), "1e+15");
        assert_eq!(format_float8(1.5e16), "1.5e+16");
        assert_eq!(format_float8(0.00001), "1e-05");
        assert_eq!(format_float8(-2.5e-10), "-2.5e-10");
        assert_eq!(format_float8(1e300), "1e+300");
        assert_eq!(format_float8(f64::MAX), "1.7976931348623157e+308");
    }

    #[test]
    fn test_real_notation_threshold() {
        assert_eq!(format_float4(100_000.0), "100000");
        assert_eq!(format_float4(1_234_567.0), "1.234567e+06");
        assert_eq!(format_float4(2.5), "2.5");
        assert_eq!(format_float4(0.1), "0.1");
    }

    #[test]
    fn test_non_finite_output() {
        assert_eq!(format_float8(f64::NAN), "NaN");
        assert_eq!(format_float8(f64::INFINITY), "Infinity");
        assert_eq!(format_float4(f32::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_boolean_and_text_output() {
        assert_eq!(Datum::Boolean(true).to_text(), "t");
        assert_eq!(Datum::Boolean(false).to_string(), "f");
        assert_eq!(Datum::from("abc").to_text(), "abc");
    }

    #[test]
    fn test_parse_integers() {
        assert_eq!(
            Datum::parse(TypeTag::SmallInt, " 42 ").unwrap(),
            Datum::SmallInt(42)
        );
        assert_eq!(
            Datum::parse(TypeTag::BigInt, "-9223372036854775808").unwrap(),
            Datum::BigInt(i64::MIN)
        );
        let err = Datum::parse(TypeTag::SmallInt, "40000").unwrap_err();
        assert!(matches!(err, MinToMaxError::OutOfRange { .. }));
        assert_eq!(
            err.to_string(),
            "value \"40000\" is out of range for type smallint"
        );
        let err = Datum::parse(TypeTag::Integer, "12abc").unwrap_err();
        assert!(matches!(err, MinToMaxError::InvalidTextRepresentation { .. }));
    }

    #[test]
    fn test_parse_floats() {
        assert_eq!(
            Datum::parse(TypeTag::DoublePrecision, "9.25").unwrap(),
            Datum::Double(9.25)
        );
        assert_eq!(
            Datum::parse(TypeTag::Real, "-1").unwrap(),
            Datum::Real(-1.0)
        );
        let inf = Datum::parse(TypeTag::DoublePrecision, "-Infinity").unwrap();
        assert_eq!(inf.as_double(), Some(f64::NEG_INFINITY));
        let nan = Datum::parse(TypeTag::Real, "NaN").unwrap();
        assert!(nan.as_real().is_some_and(f32::is_nan));
        let err = Datum::parse(TypeTag::Real, "1e40").unwrap_err();
        assert!(matches!(err, MinToMaxError::OutOfRange { .. }));
        let err = Datum::parse(TypeTag::DoublePrecision, "one").unwrap_err();
        assert!(matches!(err, MinToMaxError::InvalidTextRepresentation { .. }));
    }

    #[test]
    fn test_parse_numeric_and_boolean() {
        assert_eq!(
            Datum::parse(TypeTag::Numeric, "-12.50e3").unwrap(),
            Datum::Numeric("-12.50e3".to_owned())
        );
        assert!(Datum::parse(TypeTag::Numeric, "1.2.3").is_err());
        assert!(Datum::parse(TypeTag::Numeric, "e5").is_err());
        assert_eq!(
            Datum::parse(TypeTag::Boolean, "Yes").unwrap(),
            Datum::Boolean(true)
        );
        assert!(Datum::parse(TypeTag::Boolean, "maybe").is_err());
    }

    #[test]
    fn test_output_reparses_to_same_value() {
        for v in [0.1_f64, -1.0, 1e15, 1e-5, 123.456, f64::MIN_POSITIVE] {
            let text = format_float8(v);
            assert_eq!(
                Datum::parse(TypeTag::DoublePrecision, &text).unwrap(),
                Datum::Double(v),
                "text={text}"
            );
        }
    }

    #[test]
    fn test_typed_arg_constructors() {
        let arg = TypedArg::new(3_i32);
        assert_eq!(arg.type_tag, Some(TypeTag::Integer));
        assert!(!arg.is_null());
        let null = TypedArg::null(TypeTag::Real);
        assert!(null.is_null());
        assert_eq!(null.type_tag, Some(TypeTag::Real));
        assert_eq!(TypedArg::unresolved().type_tag, None);
    }
}
