use thiserror::Error;

use crate::schema::ColumnType;

/// Errors raised by the field codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A host key fragment is shorter or longer than its packing requires.
    #[error("malformed key fragment: {0}")]
    MalformedKey(String),
    /// The value handed to a codec belongs to a different logical type.
    #[error("type mismatch: column is {expected:?}, value is {found:?}")]
    TypeMismatch {
        /// Logical type of the codec.
        expected: ColumnType,
        /// Logical type of the offered value.
        found: ColumnType,
    },
    /// A stored value has the wrong width for its type.
    #[error("{column_type:?} value must be {expected} bytes, found {found}")]
    InvalidLength {
        /// Logical type being decoded.
        column_type: ColumnType,
        /// Required width.
        expected: usize,
        /// Width of the offered bytes.
        found: usize,
    },
    /// An integer does not fit the column's signedness.
    #[error("{value} does not fit a {column_type:?} column")]
    IntegerOverflow {
        /// Logical type of the column.
        column_type: ColumnType,
        /// The offending value.
        value: u64,
    },
    /// Character data is not valid UTF-8.
    #[error("string value is not valid utf-8")]
    InvalidUtf8,
    /// A date, time or datetime is malformed or out of range.
    #[error("invalid temporal value: {0}")]
    InvalidTemporal(String),
    /// A decimal literal or binary image is malformed or does not fit.
    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),
    /// Precision or scale outside the supported bounds.
    #[error("unsupported decimal precision {precision} and scale {scale}")]
    DecimalBounds {
        /// Requested precision.
        precision: u32,
        /// Requested scale.
        scale: u32,
    },
    /// The host type cannot be mapped to a logical column type.
    #[error("unsupported host type: {0}")]
    UnsupportedHostType(String),
}
