use thiserror::Error;

use crate::{codec::CodecError, serdes::DecodeError};

/// Errors raised while building, validating or decoding containers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// The bytes do not form a container.
    #[error("malformed container: {0}")]
    Decode(#[from] DecodeError),
    /// A well-formed version tag names a version this build cannot read.
    #[error("unknown {container} version {found}, supported {supported}")]
    UnknownVersion {
        /// Container kind.
        container: &'static str,
        /// Version found in the bytes.
        found: u8,
        /// Version this build reads.
        supported: u8,
    },
    /// Bytes remained after a complete container.
    #[error("{0} trailing bytes after container")]
    TrailingBytes(usize),
    /// A column descriptor violates its type's constraints.
    #[error("invalid column `{column}`: {reason}")]
    InvalidColumn {
        /// Column name.
        column: String,
        /// Violated constraint.
        reason: String,
    },
    /// An index descriptor is inconsistent with the table.
    #[error("invalid index `{index}`: {reason}")]
    InvalidIndex {
        /// Index name.
        index: String,
        /// Violated constraint.
        reason: String,
    },
    /// A table-level constraint does not hold.
    #[error("invalid table schema: {0}")]
    InvalidTable(String),
    /// An index with this name already exists.
    #[error("index `{0}` already exists")]
    IndexExists(String),
    /// No index with this name exists.
    #[error("index `{0}` not found")]
    IndexNotFound(String),
    /// A row does not line up with the table's columns.
    #[error("row has {found} values, table has {expected} columns")]
    ColumnCount {
        /// Number of table columns.
        expected: usize,
        /// Number of row values.
        found: usize,
    },
    /// A host column could not be described.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
