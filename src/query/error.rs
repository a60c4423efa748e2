use thiserror::Error;

use crate::serdes::DecodeError;

/// Errors raised while building, validating or decoding a [`QueryKey`].
///
/// [`QueryKey`]: super::QueryKey
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryKeyError {
    /// The key names an index the table does not have.
    #[error("index `{0}` not found")]
    UnknownIndex(String),
    /// The key constrains a column outside the index.
    #[error("column `{column}` is not part of index `{index}`")]
    UnknownColumn {
        /// Index name.
        index: String,
        /// Offending column.
        column: String,
    },
    /// A later index column is constrained while an earlier one is not.
    #[error("index `{index}` key skips column `{missing}`")]
    PrefixGap {
        /// Index name.
        index: String,
        /// First unconstrained column followed by a constrained one.
        missing: String,
    },
    /// The bytes do not form a query key.
    #[error("malformed query key: {0}")]
    Decode(#[from] DecodeError),
    /// Bytes remained after a complete query key.
    #[error("{0} trailing bytes after query key")]
    TrailingBytes(usize),
}
