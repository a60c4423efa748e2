//! The storage backend seam.
//!
//! The handler talks to its backend exclusively through serialized
//! containers: table schemas, index descriptors, rows and query keys go in as
//! bytes and rows come back as bytes. Production backends live out of tree;
//! [`MemoryStore`] keeps everything in process.

mod error;
mod keys;
mod memory;
mod range;

pub use error::BackendError;
pub use memory::{MemoryBackend, MemoryStore};

use bytes::Bytes;

use crate::id::RowId;

/// One session against a storage backend.
///
/// A session has at most one open table and at most one active scan; every
/// row and scan operation applies to the open table.
pub trait StorageBackend {
    /// Create table `name` from a serialized [`TableSchema`].
    ///
    /// [`TableSchema`]: crate::schema::TableSchema
    fn create_table(
        &mut self,
        name: &str,
        schema: &[u8],
        initial_auto_increment: u64,
    ) -> Result<(), BackendError>;

    /// Open table `name`, returning its serialized schema.
    fn open_table(&mut self, name: &str) -> Result<Bytes, BackendError>;

    /// Close the open table, ending any active scan.
    fn close_table(&mut self) -> Result<(), BackendError>;

    /// Drop table `name` and all of its rows.
    fn drop_table(&mut self, name: &str) -> Result<(), BackendError>;

    /// Rename table `from` to `to`.
    fn rename_table(&mut self, from: &str, to: &str) -> Result<(), BackendError>;

    /// Add index `name` from a serialized [`IndexSchema`], indexing existing
    /// rows.
    ///
    /// [`IndexSchema`]: crate::schema::IndexSchema
    fn add_index(&mut self, name: &str, index: &[u8]) -> Result<(), BackendError>;

    /// Drop index `name`.
    fn drop_index(&mut self, name: &str) -> Result<(), BackendError>;

    /// Store a serialized row.
    fn insert_row(&mut self, row: &[u8]) -> Result<(), BackendError>;

    /// Replace serialized row `old` by `new`; both carry the same identity.
    fn update_row(&mut self, old: &[u8], new: &[u8]) -> Result<(), BackendError>;

    /// Delete the row with identity `id`.
    fn delete_row(&mut self, id: RowId) -> Result<(), BackendError>;

    /// Delete every row, keeping the auto-increment counter.
    fn delete_all_rows(&mut self) -> Result<(), BackendError>;

    /// Delete every row and reset the auto-increment counter.
    fn truncate(&mut self) -> Result<(), BackendError>;

    /// Start iterating over every row of the table.
    fn start_table_scan(&mut self) -> Result<(), BackendError>;

    /// Start iterating over an index as described by a serialized
    /// [`QueryKey`].
    ///
    /// [`QueryKey`]: crate::query::QueryKey
    fn start_index_scan(&mut self, key: &[u8]) -> Result<(), BackendError>;

    /// Next serialized row of the active scan, `None` once exhausted.
    fn get_next_row(&mut self) -> Result<Option<Bytes>, BackendError>;

    /// Release the active scan. Ending without an active scan is a no-op.
    fn end_scan(&mut self) -> Result<(), BackendError>;

    /// Serialized row with identity `id`, if any.
    fn get_row_by_identity(&mut self, id: RowId) -> Result<Option<Bytes>, BackendError>;

    /// Whether index `index` already holds the key of a serialized
    /// [`QueryKey`]. Keys containing NULL never collide.
    ///
    /// [`QueryKey`]: crate::query::QueryKey
    fn index_contains_duplicate(&mut self, index: &str, key: &[u8]) -> Result<bool, BackendError>;

    /// Number of rows in the table.
    fn get_row_count(&mut self) -> Result<u64, BackendError>;

    /// Next auto-increment value.
    fn get_autoincrement(&mut self) -> Result<u64, BackendError>;

    /// Overwrite the next auto-increment value.
    fn set_autoincrement(&mut self, value: u64) -> Result<(), BackendError>;

    /// Advance the counter by `amount`, returning the value before the
    /// increment.
    fn increment_autoincrement(&mut self, amount: u64) -> Result<u64, BackendError>;
}
