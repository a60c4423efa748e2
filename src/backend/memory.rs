//! In-process [`StorageBackend`] over lock-free skip lists.

use std::{
    collections::{BTreeMap, HashMap},
    ops::Bound,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use bytes::Bytes;
use crossbeam_skiplist::SkipMap;

use super::{
    keys::{encode_prefix, entry_key},
    range::KeyRange,
    BackendError, StorageBackend,
};
use crate::{
    id::RowId,
    logging::bridge_log,
    query::{QueryKey, QueryKeyError},
    row::Row,
    schema::{IndexSchema, TableSchema},
};

type IndexEntries = SkipMap<Vec<u8>, RowId>;

fn poisoned() -> BackendError {
    BackendError::Transport("memory store lock poisoned".to_string())
}

#[derive(Debug)]
struct MemoryTable {
    schema: RwLock<TableSchema>,
    rows: SkipMap<RowId, Bytes>,
    indices: RwLock<BTreeMap<String, Arc<IndexEntries>>>,
    initial_auto_increment: u64,
    auto_increment: AtomicU64,
}

impl MemoryTable {
    fn new(schema: TableSchema, initial_auto_increment: u64) -> Self {
        let indices = schema
            .indices()
            .map(|(name, _)| (name.to_string(), Arc::new(IndexEntries::new())))
            .collect();
        Self {
            schema: RwLock::new(schema),
            rows: SkipMap::new(),
            indices: RwLock::new(indices),
            initial_auto_increment,
            auto_increment: AtomicU64::new(initial_auto_increment),
        }
    }

    fn schema(&self) -> Result<RwLockReadGuard<'_, TableSchema>, BackendError> {
        self.schema.read().map_err(|_| poisoned())
    }

    fn schema_mut(&self) -> Result<RwLockWriteGuard<'_, TableSchema>, BackendError> {
        self.schema.write().map_err(|_| poisoned())
    }

    fn entries(&self, index: &str) -> Result<Arc<IndexEntries>, BackendError> {
        self.indices
            .read()
            .map_err(|_| poisoned())?
            .get(index)
            .cloned()
            .ok_or_else(|| BackendError::IndexNotFound(index.to_string()))
    }

    fn index_prefix(schema: &TableSchema, index: &IndexSchema, row: &Row) -> Vec<u8> {
        encode_prefix(schema, index, |column| {
            schema.column_position(column).map(|position| row.value(position))
        })
    }

    fn insert(&self, row: &Row, bytes: Bytes) -> Result<(), BackendError> {
        let schema = self.schema()?;
        row.check_columns(&schema)?;
        for (name, index) in schema.indices() {
            let prefix = Self::index_prefix(&schema, index, row);
            self.entries(name)?.insert(entry_key(prefix, row.id()), row.id());
        }
        self.rows.insert(row.id(), bytes);
        Ok(())
    }

    fn remove(&self, id: RowId) -> Result<bool, BackendError> {
        let Some(entry) = self.rows.remove(&id) else {
            return Ok(false);
        };
        let row = Row::deserialize(entry.value())?;
        let schema = self.schema()?;
        for (name, index) in schema.indices() {
            let prefix = Self::index_prefix(&schema, index, &row);
            self.entries(name)?.remove(&entry_key(prefix, id));
        }
        Ok(true)
    }

    fn clear(&self) -> Result<(), BackendError> {
        self.rows.clear();
        for entries in self.indices.read().map_err(|_| poisoned())?.values() {
            entries.clear();
        }
        Ok(())
    }

    fn add_index(&self, name: &str, index: IndexSchema) -> Result<(), BackendError> {
        let mut schema = self.schema_mut()?;
        schema.add_index(name, index.clone())?;

        let entries = IndexEntries::new();
        for stored in self.rows.iter() {
            let row = Row::deserialize(stored.value())?;
            let prefix = Self::index_prefix(&schema, &index, &row);
            let has_null = index.columns().iter().any(|column| {
                schema
                    .column_position(column)
                    .map_or(true, |position| row.value(position).is_none())
            });
            if index.is_unique() && !has_null && contains_prefix(&entries, &prefix) {
                schema.remove_index(name)?;
                return Err(BackendError::DuplicateKey(name.to_string()));
            }
            entries.insert(entry_key(prefix, row.id()), row.id());
        }
        self.indices
            .write()
            .map_err(|_| poisoned())?
            .insert(name.to_string(), Arc::new(entries));
        Ok(())
    }

    fn drop_index(&self, name: &str) -> Result<(), BackendError> {
        let mut schema = self.schema_mut()?;
        schema
            .remove_index(name)
            .map_err(|_| BackendError::IndexNotFound(name.to_string()))?;
        self.indices.write().map_err(|_| poisoned())?.remove(name);
        Ok(())
    }
}

fn contains_prefix(entries: &IndexEntries, prefix: &[u8]) -> bool {
    entries
        .lower_bound(Bound::Included(prefix))
        .map_or(false, |entry| entry.key().starts_with(prefix))
}

fn unknown_index(err: QueryKeyError) -> BackendError {
    match err {
        QueryKeyError::UnknownIndex(index) => BackendError::IndexNotFound(index),
        other => BackendError::QueryKey(other),
    }
}

/// Tables shared by every [`MemoryBackend`] session created from it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<String, Arc<MemoryTable>>>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A new session with no open table.
    pub fn session(&self) -> MemoryBackend {
        MemoryBackend {
            store: self.clone(),
            open: None,
            cursor: None,
        }
    }

    /// Names of all tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .lock()
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn tables(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<MemoryTable>>>, BackendError> {
        self.tables.lock().map_err(|_| poisoned())
    }
}

#[derive(Debug)]
struct OpenTable {
    name: String,
    table: Arc<MemoryTable>,
}

#[derive(Debug)]
enum Cursor {
    Table {
        last: Option<RowId>,
    },
    Index {
        entries: Arc<IndexEntries>,
        range: KeyRange,
        descending: bool,
        last: Option<Vec<u8>>,
    },
}

/// A session on a [`MemoryStore`].
///
/// Cursors remember the last key they returned and seek past it on every
/// call, so rows written or deleted by other sessions during a scan are
/// observed without invalidating the scan.
#[derive(Debug)]
pub struct MemoryBackend {
    store: MemoryStore,
    open: Option<OpenTable>,
    cursor: Option<Cursor>,
}

impl MemoryBackend {
    fn table(&self) -> Result<Arc<MemoryTable>, BackendError> {
        self.open
            .as_ref()
            .map(|open| open.table.clone())
            .ok_or(BackendError::NoOpenTable)
    }
}

impl StorageBackend for MemoryBackend {
    fn create_table(
        &mut self,
        name: &str,
        schema: &[u8],
        initial_auto_increment: u64,
    ) -> Result<(), BackendError> {
        let schema = TableSchema::deserialize(schema)?;
        let mut tables = self.store.tables()?;
        if tables.contains_key(name) {
            return Err(BackendError::TableExists(name.to_string()));
        }
        tables.insert(
            name.to_string(),
            Arc::new(MemoryTable::new(schema, initial_auto_increment)),
        );
        bridge_log!(log::Level::Debug, "memory_table_created", "table={}", name);
        Ok(())
    }

    fn open_table(&mut self, name: &str) -> Result<Bytes, BackendError> {
        let table = self
            .store
            .tables()?
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::TableNotFound(name.to_string()))?;
        let schema = table.schema()?.serialize();
        self.cursor = None;
        self.open = Some(OpenTable {
            name: name.to_string(),
            table,
        });
        Ok(schema)
    }

    fn close_table(&mut self) -> Result<(), BackendError> {
        self.cursor = None;
        self.open = None;
        Ok(())
    }

    fn drop_table(&mut self, name: &str) -> Result<(), BackendError> {
        self.store
            .tables()?
            .remove(name)
            .ok_or_else(|| BackendError::TableNotFound(name.to_string()))?;
        if self.open.as_ref().is_some_and(|open| open.name == name) {
            self.close_table()?;
        }
        bridge_log!(log::Level::Debug, "memory_table_dropped", "table={}", name);
        Ok(())
    }

    fn rename_table(&mut self, from: &str, to: &str) -> Result<(), BackendError> {
        let mut tables = self.store.tables()?;
        if tables.contains_key(to) {
            return Err(BackendError::TableExists(to.to_string()));
        }
        let table = tables
            .remove(from)
            .ok_or_else(|| BackendError::TableNotFound(from.to_string()))?;
        tables.insert(to.to_string(), table);
        if let Some(open) = self.open.as_mut().filter(|open| open.name == from) {
            open.name = to.to_string();
        }
        Ok(())
    }

    fn add_index(&mut self, name: &str, index: &[u8]) -> Result<(), BackendError> {
        let index = IndexSchema::deserialize(index)?;
        self.table()?.add_index(name, index)
    }

    fn drop_index(&mut self, name: &str) -> Result<(), BackendError> {
        self.table()?.drop_index(name)
    }

    fn insert_row(&mut self, row: &[u8]) -> Result<(), BackendError> {
        let table = self.table()?;
        let decoded = Row::deserialize(row)?;
        table.remove(decoded.id())?;
        table.insert(&decoded, Bytes::copy_from_slice(row))
    }

    fn update_row(&mut self, old: &[u8], new: &[u8]) -> Result<(), BackendError> {
        let table = self.table()?;
        let old = Row::deserialize(old)?;
        let decoded = Row::deserialize(new)?;
        if !table.remove(old.id())? {
            return Err(BackendError::RowNotFound(old.id()));
        }
        table.insert(&decoded, Bytes::copy_from_slice(new))
    }

    fn delete_row(&mut self, id: RowId) -> Result<(), BackendError> {
        if !self.table()?.remove(id)? {
            return Err(BackendError::RowNotFound(id));
        }
        Ok(())
    }

    fn delete_all_rows(&mut self) -> Result<(), BackendError> {
        self.table()?.clear()
    }

    fn truncate(&mut self) -> Result<(), BackendError> {
        let table = self.table()?;
        table.clear()?;
        table
            .auto_increment
            .store(table.initial_auto_increment, Ordering::SeqCst);
        Ok(())
    }

    fn start_table_scan(&mut self) -> Result<(), BackendError> {
        self.table()?;
        self.cursor = Some(Cursor::Table { last: None });
        Ok(())
    }

    fn start_index_scan(&mut self, key: &[u8]) -> Result<(), BackendError> {
        let table = self.table()?;
        let key = QueryKey::deserialize(key)?;
        let schema = table.schema()?;
        schema.validate_query_key(&key).map_err(unknown_index)?;
        let index = schema
            .index(key.index_name())
            .ok_or_else(|| BackendError::IndexNotFound(key.index_name().to_string()))?;

        let prefix = encode_prefix(&schema, index, |column| key.key(column));
        self.cursor = Some(Cursor::Index {
            entries: table.entries(key.index_name())?,
            range: KeyRange::for_query(key.query_type(), prefix),
            descending: key.query_type().is_descending(),
            last: None,
        });
        Ok(())
    }

    fn get_next_row(&mut self) -> Result<Option<Bytes>, BackendError> {
        let table = self.table()?;
        let cursor = self.cursor.as_mut().ok_or(BackendError::NoActiveScan)?;
        match cursor {
            Cursor::Table { last } => {
                let entry = match last {
                    None => table.rows.front(),
                    Some(id) => table.rows.lower_bound(Bound::Excluded(&*id)),
                };
                Ok(entry.map(|entry| {
                    *last = Some(*entry.key());
                    entry.value().clone()
                }))
            }
            Cursor::Index {
                entries,
                range,
                descending,
                last,
            } => loop {
                let entry = match (last.as_ref(), *descending) {
                    (None, false) => entries.lower_bound(range.start_bound()),
                    (None, true) => entries.upper_bound(range.end_bound()),
                    (Some(key), false) => entries.lower_bound(Bound::Excluded(key)),
                    (Some(key), true) => entries.upper_bound(Bound::Excluded(key)),
                };
                let Some(entry) = entry.filter(|entry| range.contains(entry.key())) else {
                    return Ok(None);
                };
                *last = Some(entry.key().clone());
                // Entries may briefly outlive rows deleted by another session.
                if let Some(row) = table.rows.get(entry.value()) {
                    return Ok(Some(row.value().clone()));
                }
            },
        }
    }

    fn end_scan(&mut self) -> Result<(), BackendError> {
        self.cursor = None;
        Ok(())
    }

    fn get_row_by_identity(&mut self, id: RowId) -> Result<Option<Bytes>, BackendError> {
        Ok(self
            .table()?
            .rows
            .get(&id)
            .map(|entry| entry.value().clone()))
    }

    fn index_contains_duplicate(&mut self, index: &str, key: &[u8]) -> Result<bool, BackendError> {
        let table = self.table()?;
        let key = QueryKey::deserialize(key)?;
        if key.keys().values().any(Option::is_none) {
            return Ok(false);
        }
        let schema = table.schema()?;
        let index_schema = schema
            .index(index)
            .ok_or_else(|| BackendError::IndexNotFound(index.to_string()))?;
        key.validate(index_schema)?;

        let prefix = encode_prefix(&schema, index_schema, |column| key.key(column));
        let entries = table.entries(index)?;
        Ok(contains_prefix(&entries, &prefix))
    }

    fn get_row_count(&mut self) -> Result<u64, BackendError> {
        Ok(self.table()?.rows.len() as u64)
    }

    fn get_autoincrement(&mut self) -> Result<u64, BackendError> {
        Ok(self.table()?.auto_increment.load(Ordering::SeqCst))
    }

    fn set_autoincrement(&mut self, value: u64) -> Result<(), BackendError> {
        self.table()?.auto_increment.store(value, Ordering::SeqCst);
        Ok(())
    }

    fn increment_autoincrement(&mut self, amount: u64) -> Result<u64, BackendError> {
        Ok(self
            .table()?
            .auto_increment
            .fetch_add(amount, Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        query::QueryType,
        schema::{ColumnSchema, ColumnType},
    };

    fn schema() -> TableSchema {
        let mut indices = BTreeMap::new();
        indices.insert("by_k".to_string(), IndexSchema::new(["k"], true));
        TableSchema::new(
            [
                ("k", ColumnSchema::builder(ColumnType::ULong).build("k").unwrap()),
                (
                    "v",
                    ColumnSchema::builder(ColumnType::String)
                        .max_length(8)
                        .build("v")
                        .unwrap(),
                ),
            ],
            indices,
        )
        .unwrap()
    }

    fn row(id: u8, k: Option<u64>, v: &str) -> Row {
        Row::new(
            RowId::from_bytes([id; 16]),
            vec![
                k.map(|k| Bytes::copy_from_slice(&k.to_be_bytes())),
                Some(Bytes::copy_from_slice(v.as_bytes())),
            ],
        )
    }

    fn key(query_type: QueryType, k: Option<u64>) -> Bytes {
        let mut keys = BTreeMap::new();
        if let Some(k) = k {
            keys.insert("k".to_string(), Some(Bytes::copy_from_slice(&k.to_be_bytes())));
        }
        QueryKey::new("by_k", query_type, keys).serialize()
    }

    fn drain(session: &mut MemoryBackend) -> Vec<Row> {
        let mut rows = Vec::new();
        while let Some(bytes) = session.get_next_row().unwrap() {
            rows.push(Row::deserialize(&bytes).unwrap());
        }
        rows
    }

    fn populated() -> MemoryBackend {
        let store = MemoryStore::new();
        let mut session = store.session();
        session.create_table("t", &schema().serialize(), 1).unwrap();
        session.open_table("t").unwrap();
        for (id, k) in [(3, 30), (1, 10), (2, 20)] {
            session
                .insert_row(&row(id, Some(k), "x").serialize())
                .unwrap();
        }
        session
    }

    #[test]
    fn index_scans_follow_query_type() {
        let mut session = populated();
        let ks = |rows: Vec<Row>| -> Vec<u8> {
            rows.iter().map(|row| row.id().as_bytes()[0]).collect()
        };

        session.start_index_scan(&key(QueryType::ExactKey, Some(20))).unwrap();
        assert_eq!(ks(drain(&mut session)), [2]);

        session.start_index_scan(&key(QueryType::AfterKey, Some(10))).unwrap();
        assert_eq!(ks(drain(&mut session)), [2, 3]);

        session.start_index_scan(&key(QueryType::KeyOrNext, Some(15))).unwrap();
        assert_eq!(ks(drain(&mut session)), [2, 3]);

        session
            .start_index_scan(&key(QueryType::KeyOrPrevious, Some(20)))
            .unwrap();
        assert_eq!(ks(drain(&mut session)), [2, 1]);

        session.start_index_scan(&key(QueryType::BeforeKey, Some(20))).unwrap();
        assert_eq!(ks(drain(&mut session)), [1]);

        session.start_index_scan(&key(QueryType::IndexLast, None)).unwrap();
        assert_eq!(ks(drain(&mut session)), [3, 2, 1]);
    }

    #[test]
    fn duplicates_ignore_nulls() {
        let mut session = populated();
        assert!(session
            .index_contains_duplicate("by_k", &key(QueryType::ExactKey, Some(10)))
            .unwrap());
        assert!(!session
            .index_contains_duplicate("by_k", &key(QueryType::ExactKey, Some(11)))
            .unwrap());

        let mut keys = BTreeMap::new();
        keys.insert("k".to_string(), None);
        let null_key = QueryKey::new("by_k", QueryType::ExactKey, keys).serialize();
        session.insert_row(&row(9, None, "n").serialize()).unwrap();
        assert!(!session.index_contains_duplicate("by_k", &null_key).unwrap());
    }

    #[test]
    fn deletes_maintain_indices_and_counts() {
        let mut session = populated();
        session.delete_row(RowId::from_bytes([2; 16])).unwrap();
        assert_eq!(session.get_row_count().unwrap(), 2);
        assert_eq!(
            session.delete_row(RowId::from_bytes([2; 16])),
            Err(BackendError::RowNotFound(RowId::from_bytes([2; 16])))
        );
        session.start_index_scan(&key(QueryType::IndexFirst, None)).unwrap();
        assert_eq!(drain(&mut session).len(), 2);

        session.increment_autoincrement(5).unwrap();
        session.delete_all_rows().unwrap();
        assert_eq!(session.get_row_count().unwrap(), 0);
        assert_eq!(session.get_autoincrement().unwrap(), 6);
        session.truncate().unwrap();
        assert_eq!(session.get_autoincrement().unwrap(), 1);
    }

    #[test]
    fn update_moves_index_entries() {
        let mut session = populated();
        let old = row(1, Some(10), "x");
        let new = row(1, Some(40), "y");
        session.update_row(&old.serialize(), &new.serialize()).unwrap();

        session.start_index_scan(&key(QueryType::ExactKey, Some(10))).unwrap();
        assert!(drain(&mut session).is_empty());
        session.start_index_scan(&key(QueryType::ExactKey, Some(40))).unwrap();
        assert_eq!(drain(&mut session), vec![new]);
    }

    #[test]
    fn unique_index_build_rejects_existing_duplicates() {
        let mut session = populated();
        session.insert_row(&row(4, Some(40), "x").serialize()).unwrap();
        let err = session
            .add_index("by_v", &IndexSchema::new(["v"], true).serialize())
            .unwrap_err();
        assert_eq!(err, BackendError::DuplicateKey("by_v".to_string()));

        session
            .add_index("by_v", &IndexSchema::new(["v"], false).serialize())
            .unwrap();
        let reopened = IndexSchema::new(["v"], false);
        let schema = TableSchema::deserialize(&session.open_table("t").unwrap()).unwrap();
        assert_eq!(schema.index("by_v"), Some(&reopened));
    }

    #[test]
    fn tables_are_shared_between_sessions() {
        let store = MemoryStore::new();
        let mut first = store.session();
        first.create_table("t", &schema().serialize(), 1).unwrap();
        assert_eq!(
            first.create_table("t", &schema().serialize(), 1),
            Err(BackendError::TableExists("t".to_string()))
        );

        let mut second = store.session();
        second.open_table("t").unwrap();
        second.insert_row(&row(1, Some(1), "a").serialize()).unwrap();

        first.rename_table("t", "u").unwrap();
        assert_eq!(store.table_names(), ["u"]);
        first.open_table("u").unwrap();
        assert_eq!(first.get_row_count().unwrap(), 1);
        assert!(matches!(
            first.open_table("t"),
            Err(BackendError::TableNotFound(_))
        ));
        assert_eq!(second.get_next_row(), Err(BackendError::NoActiveScan));
    }
}
