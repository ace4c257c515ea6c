use thiserror::Error;

/// Human-readable list of the element types `min_to_max` accepts.
pub const SUPPORTED_DATATYPES: &str = "SMALLINT, INTEGER, BIGINT, REAL, or DOUBLE PRECISION";

/// Primary error type for the `min_to_max` aggregate and its host services.
///
/// Errors fall into two classes: fatal contract violations (the caller broke
/// the calling discipline; see [`MinToMaxError::is_fatal`]) and user-facing,
/// data-driven failures such as an unsupported element type.
#[derive(Error, Debug)]
pub enum MinToMaxError {
    // === Call Context Errors ===
    /// A transition or final function ran outside an aggregate call.
    #[error("{function} called in non-aggregate context")]
    NotAggregateContext { function: String },

    /// The type of an argument could not be resolved.
    #[error("invalid parameter value: type of argument {index} could not be resolved")]
    InvalidParameter { index: usize },

    /// A step for an existing accumulator arrived with a foreign region.
    #[error("accumulator belongs to memory region {expected}, step supplied region {actual}")]
    RegionMismatch { expected: u64, actual: u64 },

    /// The aggregate was invoked with an unusable argument list.
    #[error("function {name} takes 1 or 2 arguments, got {actual}")]
    WrongArgumentCount { name: String, actual: usize },

    // === Array Errors ===
    /// The materialized accumulator snapshot is not one-dimensional.
    #[error("not received one dimensional array: got {ndims} dimensions")]
    NotOneDimensional { ndims: usize },

    /// Requested array dimensions do not cover the accumulated elements.
    #[error("array dimensions {dims:?} do not match {nelems} accumulated elements")]
    ArrayShape { dims: Vec<usize>, nelems: usize },

    // === Type Errors ===
    /// Element type outside the five supported numeric kinds.
    #[error(
        "unsupported datatype {found} for min/max aggregation: supported datatypes are SMALLINT, INTEGER, BIGINT, REAL, or DOUBLE PRECISION"
    )]
    UnsupportedDatatype { found: String },

    /// Two different numeric kinds were accumulated into one group.
    #[error(
        "mixed datatypes in min/max aggregation: expected {expected}, got {actual} at element {index}"
    )]
    MixedDatatypes {
        expected: String,
        actual: String,
        index: usize,
    },

    /// Text could not be parsed as a value of the requested type.
    #[error("invalid input syntax for type {type_name}: \"{input}\"")]
    InvalidTextRepresentation { type_name: String, input: String },

    /// Parsed value does not fit the requested type.
    #[error("value \"{input}\" is out of range for type {type_name}")]
    OutOfRange { type_name: String, input: String },

    /// An input row does not have the expected layout.
    #[error("malformed input at line {line}: {detail}")]
    MalformedRow { line: usize, detail: String },

    // === Environment Errors ===
    /// Configuration file or flag could not be applied.
    #[error("invalid configuration: {detail}")]
    Config { detail: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// PostgreSQL-style SQLSTATE classes reported by [`MinToMaxError::sql_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlState {
    /// `22023`
    InvalidParameterValue,
    /// `42804`
    DatatypeMismatch,
    /// `22P02`
    InvalidTextRepresentation,
    /// `22003`
    NumericValueOutOfRange,
    /// `F0000`
    ConfigFileError,
    /// `58030`
    IoError,
    /// `XX000`
    InternalError,
}

impl SqlState {
    /// The five-character SQLSTATE code.
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidParameterValue => "22023",
            Self::DatatypeMismatch => "42804",
            Self::InvalidTextRepresentation => "22P02",
            Self::NumericValueOutOfRange => "22003",
            Self::ConfigFileError => "F0000",
            Self::IoError => "58030",
            Self::InternalError => "XX000",
        }
    }
}

impl MinToMaxError {
    /// Map this error to its SQLSTATE class.
    pub const fn sql_state(&self) -> SqlState {
        match self {
            Self::InvalidParameter { .. } | Self::WrongArgumentCount { .. } => {
                SqlState::InvalidParameterValue
            }
            Self::UnsupportedDatatype { .. } | Self::MixedDatatypes { .. } => {
                SqlState::DatatypeMismatch
            }
            Self::InvalidTextRepresentation { .. } | Self::MalformedRow { .. } => {
                SqlState::InvalidTextRepresentation
            }
            Self::OutOfRange { .. } => SqlState::NumericValueOutOfRange,
            Self::Config { .. } => SqlState::ConfigFileError,
            Self::Io(_) => SqlState::IoError,
            Self::NotAggregateContext { .. }
            | Self::RegionMismatch { .. }
            | Self::NotOneDimensional { .. }
            | Self::ArrayShape { .. }
            | Self::Internal(_) => SqlState::InternalError,
        }
    }

    /// Whether this error signals a broken calling discipline rather than bad data.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NotAggregateContext { .. }
                | Self::InvalidParameter { .. }
                | Self::RegionMismatch { .. }
                | Self::NotOneDimensional { .. }
                | Self::ArrayShape { .. }
                | Self::Internal(_)
        )
    }

    /// Whether the message is meant for the end user (data-driven failure).
    pub const fn is_user_facing(&self) -> bool {
        !self.is_fatal()
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedDatatype { .. } => {
                Some("Cast the argument to SMALLINT, INTEGER, BIGINT, REAL, or DOUBLE PRECISION")
            }
            Self::MixedDatatypes { .. } => {
                Some("Cast every value of the group to one numeric type")
            }
            Self::InvalidTextRepresentation { .. } | Self::OutOfRange { .. } => {
                Some("Check the input value against the declared element type")
            }
            Self::MalformedRow { .. } => Some("Separate the group key from the value with a TAB"),
            Self::Config { .. } => Some("Check the configuration file and command-line flags"),
            _ => None,
        }
    }

    /// Get the process exit code for this error (for CLI use).
    pub const fn exit_code(&self) -> i32 {
        if self.is_fatal() { 70 } else { 1 }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a non-aggregate-context error for `function`.
    pub fn not_aggregate_context(function: impl Into<String>) -> Self {
        Self::NotAggregateContext {
            function: function.into(),
        }
    }

    /// Create an unsupported-datatype error naming the offending type.
    pub fn unsupported_datatype(found: impl Into<String>) -> Self {
        Self::UnsupportedDatatype {
            found: found.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }
}

/// Result type alias using `MinToMaxError`.
pub type Result<T> = std::result::Result<T, MinToMaxError>;
