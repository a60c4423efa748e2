use std::{collections::BTreeMap, mem::size_of};

use bytes::{Bytes, BytesMut};

use super::{
    version::{encode_version, expect_version, TABLE_SCHEMA_VERSION},
    ColumnSchema, ContainerError, IndexSchema,
};
use crate::{
    codec::HostTable,
    query::{QueryKey, QueryKeyError},
    serdes::{Decode, Encode},
};

/// Versioned descriptor of a table: its columns in row order and its indices.
///
/// Two schemas are equal when they describe the same columns and indices,
/// regardless of declaration order.
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    columns: Vec<(String, ColumnSchema)>,
    indices: BTreeMap<String, IndexSchema>,
}

impl TableSchema {
    /// Build and validate a schema.
    pub fn new<C, N>(
        columns: C,
        indices: BTreeMap<String, IndexSchema>,
    ) -> Result<Self, ContainerError>
    where
        C: IntoIterator<Item = (N, ColumnSchema)>,
        N: Into<String>,
    {
        let schema = Self {
            columns: columns
                .into_iter()
                .map(|(name, column)| (name.into(), column))
                .collect(),
            indices,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Describe a host table.
    pub fn from_host(table: &HostTable) -> Result<Self, ContainerError> {
        let columns = table
            .fields
            .iter()
            .map(|field| Ok((field.name.clone(), ColumnSchema::from_host(field)?)))
            .collect::<Result<Vec<_>, ContainerError>>()?;
        let indices = table
            .indices
            .iter()
            .map(|index| {
                (
                    index.name.clone(),
                    IndexSchema::new(index.columns.iter().cloned(), index.unique),
                )
            })
            .collect();
        Self::new(columns, indices)
    }

    /// Version written by [`TableSchema::serialize`].
    pub fn version(&self) -> u8 {
        TABLE_SCHEMA_VERSION
    }

    /// Columns in row order.
    pub fn columns(&self) -> impl ExactSizeIterator<Item = (&str, &ColumnSchema)> {
        self.columns
            .iter()
            .map(|(name, column)| (name.as_str(), column))
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Descriptor of column `name`.
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, column)| column)
    }

    /// Row position of column `name`.
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(column, _)| column == name)
    }

    /// Indices sorted by name.
    pub fn indices(&self) -> impl ExactSizeIterator<Item = (&str, &IndexSchema)> {
        self.indices
            .iter()
            .map(|(name, index)| (name.as_str(), index))
    }

    /// Descriptor of index `name`.
    pub fn index(&self, name: &str) -> Option<&IndexSchema> {
        self.indices.get(name)
    }

    /// Whether any index exists.
    pub fn has_indices(&self) -> bool {
        !self.indices.is_empty()
    }

    /// Whether any index rejects duplicates.
    pub fn has_unique_indices(&self) -> bool {
        self.indices.values().any(IndexSchema::is_unique)
    }

    /// Name of the auto-increment column.
    pub fn auto_increment_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|(_, column)| column.is_auto_increment())
            .map(|(name, _)| name.as_str())
    }

    /// Add an index after validating it against the columns.
    pub fn add_index(
        &mut self,
        name: impl Into<String>,
        index: IndexSchema,
    ) -> Result<(), ContainerError> {
        let name = name.into();
        if self.indices.contains_key(&name) {
            return Err(ContainerError::IndexExists(name));
        }
        index.validate(&name, |column| self.column(column).is_some())?;
        self.indices.insert(name, index);
        Ok(())
    }

    /// Remove index `name`, returning its descriptor.
    pub fn remove_index(&mut self, name: &str) -> Result<IndexSchema, ContainerError> {
        self.indices
            .remove(name)
            .ok_or_else(|| ContainerError::IndexNotFound(name.to_string()))
    }

    /// Check that `key` names an index of this table and constrains a
    /// prefix of its columns.
    pub fn validate_query_key(&self, key: &QueryKey) -> Result<(), QueryKeyError> {
        let index = self
            .index(key.index_name())
            .ok_or_else(|| QueryKeyError::UnknownIndex(key.index_name().to_string()))?;
        key.validate(index)
    }

    /// Drop all columns and indices, keeping allocations.
    pub fn reset(&mut self) {
        self.columns.clear();
        self.indices.clear();
    }

    /// Versioned byte form.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_size());
        buf.extend_from_slice(&[encode_version(TABLE_SCHEMA_VERSION)]);
        (self.columns.len() as u32).encode(&mut buf);
        for (name, column) in &self.columns {
            name.encode(&mut buf);
            column.encode(&mut buf);
        }
        self.indices.encode(&mut buf);
        buf.freeze()
    }

    fn encoded_size(&self) -> usize {
        1 + size_of::<u32>()
            + self
                .columns
                .iter()
                .map(|(name, column)| name.size() + column.size())
                .sum::<usize>()
            + self.indices.size()
    }

    /// Parse and validate a serialized schema.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, ContainerError> {
        let mut buf = bytes;
        expect_version(&mut buf, "table schema", TABLE_SCHEMA_VERSION)?;

        let count = u32::decode(&mut buf)? as usize;
        let mut columns = Vec::with_capacity(count.min(buf.len()));
        for _ in 0..count {
            let name = String::decode(&mut buf)?;
            let column = ColumnSchema::decode(&mut buf)?;
            columns.push((name, column));
        }
        let indices = BTreeMap::decode(&mut buf)?;
        if !buf.is_empty() {
            return Err(ContainerError::TrailingBytes(buf.len()));
        }

        let schema = Self { columns, indices };
        schema.validate()?;
        Ok(schema)
    }

    fn validate(&self) -> Result<(), ContainerError> {
        if self.columns.is_empty() {
            return Err(ContainerError::InvalidTable(
                "table must have at least one column".to_string(),
            ));
        }
        for (position, (name, column)) in self.columns.iter().enumerate() {
            column.validate(name)?;
            if self.columns[..position].iter().any(|(other, _)| other == name) {
                return Err(ContainerError::InvalidTable(format!(
                    "column `{name}` declared twice"
                )));
            }
        }
        let auto_increment = self
            .columns
            .iter()
            .filter(|(_, column)| column.is_auto_increment())
            .count();
        if auto_increment > 1 {
            return Err(ContainerError::InvalidTable(
                "at most one auto increment column is allowed".to_string(),
            ));
        }
        for (name, index) in &self.indices {
            index.validate(name, |column| self.column(column).is_some())?;
        }
        Ok(())
    }
}

impl PartialEq for TableSchema {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .all(|(name, column)| other.column(name) == Some(column))
            && self.indices == other.indices
    }
}

impl Eq for TableSchema {}
