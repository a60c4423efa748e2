//! Self-describing table descriptors exchanged with the backend.
//!
//! A [`TableSchema`] is built once per DDL statement, serialized with a
//! leading version tag and handed to the backend, which returns it verbatim
//! when the table is opened again.

mod column;
mod error;
mod index;
mod table;
pub mod version;

pub use column::{ColumnSchema, ColumnSchemaBuilder, ColumnType};
pub use error::ContainerError;
pub use index::IndexSchema;
pub use table::TableSchema;
