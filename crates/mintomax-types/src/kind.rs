//! Type tags carried alongside every argument value.

use std::fmt;

use mintomax_error::MinToMaxError;

/// The host type of an argument or array element.
///
/// The aggregate treats a tag as opaque while accumulating; it is only
/// interpreted when the finalizer resolves the [`NumericKind`] of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    /// 16-bit signed integer (`int2`).
    SmallInt,
    /// 32-bit signed integer (`int4`).
    Integer,
    /// 64-bit signed integer (`int8`).
    BigInt,
    /// 32-bit IEEE 754 float (`float4`).
    Real,
    /// 64-bit IEEE 754 float (`float8`).
    DoublePrecision,
    /// Arbitrary-precision decimal, kept in its text form.
    Numeric,
    /// Character string.
    Text,
    /// Boolean.
    Boolean,
}

impl TypeTag {
    /// Resolve a declared type name, accepting the usual PostgreSQL spellings.
    ///
    /// Matching is case-insensitive and collapses internal whitespace, so
    /// `"double  precision"` resolves like `"float8"`.
    pub fn from_sql_name(name: &str) -> Option<Self> {
        let normalized = name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();
        let tag = match normalized.as_str() {
            "int2" | "smallint" => Self::SmallInt,
            "int4" | "int" | "integer" => Self::Integer,
            "int8" | "bigint" => Self::BigInt,
            "float4" | "real" => Self::Real,
            "float8" | "float" | "double" | "double precision" => Self::DoublePrecision,
            "numeric" | "decimal" => Self::Numeric,
            "text" | "varchar" | "character varying" => Self::Text,
            "bool" | "boolean" => Self::Boolean,
            _ => return None,
        };
        Some(tag)
    }

    /// The canonical SQL name of this type.
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::SmallInt => "smallint",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Real => "real",
            Self::DoublePrecision => "double precision",
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Boolean => "boolean",
        }
    }

    /// The supported numeric kind for this tag, if any.
    pub const fn numeric_kind(self) -> Option<NumericKind> {
        match self {
            Self::SmallInt => Some(NumericKind::SmallInt),
            Self::Integer => Some(NumericKind::Integer),
            Self::BigInt => Some(NumericKind::BigInt),
            Self::Real => Some(NumericKind::Real),
            Self::DoublePrecision => Some(NumericKind::DoublePrecision),
            Self::Numeric | Self::Text | Self::Boolean => None,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// One of the five numeric representations `min_to_max` can scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    SmallInt,
    Integer,
    BigInt,
    Real,
    DoublePrecision,
}

impl NumericKind {
    /// Every supported kind, narrowest integer first.
    pub const ALL: [Self; 5] = [
        Self::SmallInt,
        Self::Integer,
        Self::BigInt,
        Self::Real,
        Self::DoublePrecision,
    ];

    /// The type tag values of this kind carry.
    pub const fn tag(self) -> TypeTag {
        match self {
            Self::SmallInt => TypeTag::SmallInt,
            Self::Integer => TypeTag::Integer,
            Self::BigInt => TypeTag::BigInt,
            Self::Real => TypeTag::Real,
            Self::DoublePrecision => TypeTag::DoublePrecision,
        }
    }
}

impl TryFrom<TypeTag> for NumericKind {
    type Error = MinToMaxError;

    fn try_from(tag: TypeTag) -> Result<Self, Self::Error> {
        tag.numeric_kind()
            .ok_or_else(|| MinToMaxError::unsupported_datatype(tag.sql_name()))
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.tag(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_name_aliases() {
        assert_eq!(TypeTag::from_sql_name("INT2"), Some(TypeTag::SmallInt));
        assert_eq!(TypeTag::from_sql_name("int"), Some(TypeTag::Integer));
        assert_eq!(TypeTag::from_sql_name("Bigint"), Some(TypeTag::BigInt));
        assert_eq!(TypeTag::from_sql_name("float4"), Some(TypeTag::Real));
        assert_eq!(
            TypeTag::from_sql_name("  double   PRECISION "),
            Some(TypeTag::DoublePrecision)
        );
        assert_eq!(TypeTag::from_sql_name("decimal"), Some(TypeTag::Numeric));
        assert_eq!(TypeTag::from_sql_name("uuid"), None);
    }

    #[test]
    fn test_sql_name_is_resolvable() {
        for tag in [
            TypeTag::SmallInt,
            TypeTag::Integer,
            TypeTag::BigInt,
            TypeTag::Real,
            TypeTag::DoublePrecision,
            TypeTag::Numeric,
            TypeTag::Text,
            TypeTag::Boolean,
        ] {
            assert_eq!(TypeTag::from_sql_name(tag.sql_name()), Some(tag));
        }
    }

    #[test]
    fn test_only_five_kinds_are_numeric() {
        let supported: Vec<TypeTag> = NumericKind::ALL.iter().map(|k| k.tag()).collect();
        assert_eq!(supported.len(), 5);
        for tag in supported {
            assert!(NumericKind::try_from(tag).is_ok());
        }
        for tag in [TypeTag::Numeric, TypeTag::Text, TypeTag::Boolean] {
            let err = NumericKind::try_from(tag).unwrap_err();
            assert!(matches!(err, MinToMaxError::UnsupportedDatatype { .. }));
        }
    }
}
