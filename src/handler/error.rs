use thiserror::Error;

use crate::{
    backend::BackendError, codec::CodecError, query::QueryKeyError, schema::ContainerError,
};

/// Error returned by a [`TableHandler`](super::TableHandler).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// A value or key part could not be converted.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    /// A schema or row container was malformed.
    #[error("container error: {0}")]
    Container(#[from] ContainerError),
    /// A query key could not be built.
    #[error("query key error: {0}")]
    QueryKey(#[from] QueryKeyError),
    /// The backend rejected the call or could not be reached.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    /// A write would duplicate a key of a unique index.
    #[error("duplicate key in unique index `{index}`")]
    DuplicateKey {
        /// The offending index.
        index: String,
    },
    /// `next` was called without an open scan.
    #[error("no scan is active")]
    NoActiveScan,
    /// Update or delete was called before any row was read.
    #[error("no current row")]
    NoCurrentRow,
    /// The handler's table has no index with this name.
    #[error("index `{0}` not found")]
    UnknownIndex(String),
    /// A host row does not have one value per column.
    #[error("host row has {found} values, table has {expected} columns")]
    RowWidth {
        /// Number of table columns.
        expected: usize,
        /// Number of values in the host row.
        found: usize,
    },
    /// NULL was written to a non-nullable column.
    #[error("column `{0}` does not accept NULL")]
    NotNullable(String),
}

/// Result code reported to the host for a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOutcome {
    /// A unique index already holds the key.
    DuplicateKey,
    /// The table does not exist.
    TableNotFound,
    /// The table already exists.
    TableExists,
    /// The index does not exist.
    IndexNotFound,
    /// The addressed row does not exist.
    RowNotFound,
    /// The scan protocol was driven out of order.
    WrongCommand,
    /// Bytes, keys or values violated their format.
    Corrupted,
    /// The backend call itself failed.
    Fatal,
}

impl HandlerError {
    /// Host-visible code of this error.
    pub fn outcome(&self) -> HostOutcome {
        match self {
            HandlerError::DuplicateKey { .. } => HostOutcome::DuplicateKey,
            HandlerError::UnknownIndex(_) => HostOutcome::IndexNotFound,
            HandlerError::NoActiveScan | HandlerError::NoCurrentRow => HostOutcome::WrongCommand,
            HandlerError::Codec(_)
            | HandlerError::Container(_)
            | HandlerError::QueryKey(_)
            | HandlerError::RowWidth { .. }
            | HandlerError::NotNullable(_) => HostOutcome::Corrupted,
            HandlerError::Backend(err) => match err {
                BackendError::TableNotFound(_) => HostOutcome::TableNotFound,
                BackendError::TableExists(_) => HostOutcome::TableExists,
                BackendError::IndexNotFound(_) => HostOutcome::IndexNotFound,
                BackendError::RowNotFound(_) => HostOutcome::RowNotFound,
                BackendError::DuplicateKey(_) => HostOutcome::DuplicateKey,
                BackendError::NoOpenTable | BackendError::NoActiveScan => {
                    HostOutcome::WrongCommand
                }
                BackendError::Container(_) | BackendError::QueryKey(_) => HostOutcome::Corrupted,
                BackendError::Transport(_) => HostOutcome::Fatal,
            },
        }
    }
}
