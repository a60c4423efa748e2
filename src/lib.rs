#![deny(missing_docs)]
//! Translation layer of a storage-engine adapter.
//!
//! Host rows and key images are converted into canonical, self-describing
//! byte containers ([`Row`], [`QueryKey`], [`TableSchema`]) and handed to a
//! [`StorageBackend`]. A [`TableHandler`] drives the scan protocol on top:
//! table scans, index range scans and point lookups by row identity.

mod logging;
mod option;
mod serdes;

/// Conversion between host field values and canonical bytes.
pub mod codec;

/// Versioned table and index descriptors.
pub mod schema;

/// Index predicates handed to the backend.
pub mod query;

/// Versioned row container.
pub mod row;

/// Row identities.
pub mod id;

/// Storage backend contract and the in-memory implementation.
pub mod backend;

/// Host-facing scan and write protocol.
pub mod handler;

pub use crate::{
    backend::{BackendError, MemoryBackend, MemoryStore, StorageBackend},
    codec::{CodecError, FieldCodec, FieldValue, HostField, HostIndex, HostTable, HostType},
    handler::{HandlerError, HostKey, HostOutcome, HostRow, ReadFlag, ScanState, TableHandler},
    id::RowId,
    logging::LogContext,
    option::HandlerOption,
    query::{QueryKey, QueryType},
    row::Row,
    schema::{ColumnSchema, ColumnType, ContainerError, IndexSchema, TableSchema},
    serdes::DecodeError,
};
