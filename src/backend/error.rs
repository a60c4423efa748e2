use thiserror::Error;

use crate::{id::RowId, query::QueryKeyError, schema::ContainerError};

/// Errors reported by a [`StorageBackend`](super::StorageBackend).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No table with this name exists.
    #[error("table `{0}` not found")]
    TableNotFound(String),
    /// A table with this name already exists.
    #[error("table `{0}` already exists")]
    TableExists(String),
    /// The session has no open table.
    #[error("no table is open")]
    NoOpenTable,
    /// No index with this name exists.
    #[error("index `{0}` not found")]
    IndexNotFound(String),
    /// No row with this identity exists.
    #[error("row {0} not found")]
    RowNotFound(RowId),
    /// Building a unique index met a duplicate key.
    #[error("duplicate key in unique index `{0}`")]
    DuplicateKey(String),
    /// `get_next_row` was called without a started scan.
    #[error("no scan is active")]
    NoActiveScan,
    /// The backend could not be reached or failed internally.
    #[error("backend transport failure: {0}")]
    Transport(String),
    /// A container handed to the backend was malformed.
    #[error(transparent)]
    Container(#[from] ContainerError),
    /// A query key handed to the backend was malformed.
    #[error(transparent)]
    QueryKey(#[from] QueryKeyError),
}
