//! Versioned row container: identity plus one nullable value per column.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    id::{RowId, ROW_ID_WIDTH},
    schema::{
        version::{encode_version, expect_version, ROW_VERSION},
        ContainerError, IndexSchema, TableSchema,
    },
    serdes::{ensure_remaining, Decode, DecodeError, Encode},
};

impl Encode for RowId {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(self.as_bytes())
    }

    fn size(&self) -> usize {
        ROW_ID_WIDTH
    }
}

impl Decode for RowId {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        ensure_remaining(buf, ROW_ID_WIDTH)?;
        let mut bytes = [0u8; ROW_ID_WIDTH];
        buf.copy_to_slice(&mut bytes);
        Ok(RowId::from_bytes(bytes))
    }
}

/// A stored row: its identity and canonical column values in table order.
///
/// `None` is SQL NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    id: RowId,
    values: Vec<Option<Bytes>>,
}

impl Row {
    /// Row with identity `id` and `values` in column order.
    pub fn new(id: RowId, values: Vec<Option<Bytes>>) -> Self {
        Self { id, values }
    }

    /// Empty row with room for `columns` values.
    pub fn with_capacity(columns: usize) -> Self {
        Self {
            id: RowId::NIL,
            values: Vec::with_capacity(columns),
        }
    }

    /// Version written by [`Row::serialize`].
    pub fn version(&self) -> u8 {
        ROW_VERSION
    }

    /// Row identity.
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Replace the row identity.
    pub fn set_id(&mut self, id: RowId) {
        self.id = id;
    }

    /// Values in column order.
    pub fn values(&self) -> &[Option<Bytes>] {
        &self.values
    }

    /// Value at column `position`; `None` when out of range or NULL.
    pub fn value(&self, position: usize) -> Option<&Bytes> {
        self.values.get(position).and_then(Option::as_ref)
    }

    /// Append the next column value.
    pub fn push(&mut self, value: Option<Bytes>) {
        self.values.push(value);
    }

    /// Replace the value of `column`.
    pub fn update_column(
        &mut self,
        schema: &TableSchema,
        column: &str,
        value: Option<Bytes>,
    ) -> Result<(), ContainerError> {
        let position = schema
            .column_position(column)
            .ok_or_else(|| ContainerError::InvalidColumn {
                column: column.to_string(),
                reason: "no such column".to_string(),
            })?;
        self.check_columns(schema)?;
        self.values[position] = value;
        Ok(())
    }

    /// Non-null values keyed by column name.
    pub fn records<'a>(
        &'a self,
        schema: &'a TableSchema,
    ) -> impl Iterator<Item = (&'a str, &'a Bytes)> + 'a {
        schema
            .columns()
            .zip(self.values.iter())
            .filter_map(|((name, _), value)| value.as_ref().map(|value| (name, value)))
    }

    /// Require one value per column of `schema`.
    pub fn check_columns(&self, schema: &TableSchema) -> Result<(), ContainerError> {
        if self.values.len() != schema.column_count() {
            return Err(ContainerError::ColumnCount {
                expected: schema.column_count(),
                found: self.values.len(),
            });
        }
        Ok(())
    }

    /// Clear identity and values, keeping the value buffer's capacity.
    pub fn reset(&mut self) {
        self.id = RowId::NIL;
        self.values.clear();
    }

    /// Versioned byte form.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + ROW_ID_WIDTH + self.values.size());
        buf.put_u8(encode_version(ROW_VERSION));
        self.id.encode(&mut buf);
        self.values.encode(&mut buf);
        buf.freeze()
    }

    /// Parse a serialized row.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, ContainerError> {
        let mut row = Row::default();
        row.deserialize_into(bytes)?;
        Ok(row)
    }

    /// Parse a serialized row into `self`, reusing its value buffer.
    ///
    /// On error `self` is left reset.
    pub fn deserialize_into(&mut self, bytes: &[u8]) -> Result<(), ContainerError> {
        self.reset();
        let result = self.read_from(bytes);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn read_from(&mut self, bytes: &[u8]) -> Result<(), ContainerError> {
        let mut buf = bytes;
        expect_version(&mut buf, "row", ROW_VERSION)?;
        self.id = RowId::decode(&mut buf)?;

        let count = u32::decode(&mut buf)? as usize;
        self.values.reserve(count.min(buf.len()));
        for _ in 0..count {
            self.values.push(Option::<Bytes>::decode(&mut buf)?);
        }
        if !buf.is_empty() {
            return Err(ContainerError::TrailingBytes(buf.len()));
        }
        Ok(())
    }

    /// Bring a serialized row up to the current version.
    ///
    /// Version 0 is the only version, so this validates the row and returns
    /// its bytes unchanged.
    pub fn upgrade_serialized(bytes: &[u8]) -> Result<Bytes, ContainerError> {
        Row::deserialize(bytes)?;
        Ok(Bytes::copy_from_slice(bytes))
    }
}

/// Indices of `schema` whose key columns differ between `old` and `new`.
pub fn changed_indices<'a>(
    schema: &'a TableSchema,
    old: &'a Row,
    new: &'a Row,
) -> impl Iterator<Item = (&'a str, &'a IndexSchema)> + 'a {
    schema.indices().filter(move |(_, index)| {
        index.columns().iter().any(|column| {
            schema
                .column_position(column)
                .map_or(false, |position| old.values.get(position) != new.values.get(position))
        })
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::schema::{ColumnSchema, ColumnType};

    fn schema() -> TableSchema {
        let mut indices = BTreeMap::new();
        indices.insert("by_a".to_string(), IndexSchema::new(["a"], true));
        indices.insert("by_b".to_string(), IndexSchema::new(["b"], false));
        let long = ColumnSchema::builder(ColumnType::Long).build("c").unwrap();
        TableSchema::new([("a", long.clone()), ("b", long)], indices).unwrap()
    }

    fn row(a: &'static [u8], b: Option<&'static [u8]>) -> Row {
        Row::new(
            RowId::from_bytes([7; ROW_ID_WIDTH]),
            vec![Some(Bytes::from_static(a)), b.map(Bytes::from_static)],
        )
    }

    #[test]
    fn deserialize_into_reuses_buffer() {
        let source = row(b"1", None);
        let bytes = source.serialize();

        let mut scratch = Row::with_capacity(8);
        let capacity = scratch.values.capacity();
        scratch.deserialize_into(&bytes).unwrap();
        assert_eq!(scratch, source);
        assert!(scratch.values.capacity() >= capacity);

        scratch.reset();
        assert!(scratch.values().is_empty());
        assert!(scratch.id().is_nil());
        assert!(scratch.values.capacity() >= capacity);
    }

    #[test]
    fn failed_decode_leaves_row_reset() {
        let mut scratch = row(b"1", Some(&b"2"[..]));
        let bytes = scratch.serialize();
        assert!(scratch.deserialize_into(&bytes[..bytes.len() - 1]).is_err());
        assert_eq!(scratch, Row::default());
    }

    #[test]
    fn unknown_version_differs_from_malformed() {
        let mut bytes = row(b"1", None).serialize().to_vec();
        bytes[0] = encode_version(5);
        assert!(matches!(
            Row::deserialize(&bytes),
            Err(ContainerError::UnknownVersion { found: 5, .. })
        ));
        bytes[0] = 0x03;
        assert!(matches!(
            Row::deserialize(&bytes),
            Err(ContainerError::Decode(_))
        ));
        assert!(Row::upgrade_serialized(&bytes).is_err());
    }

    #[test]
    fn records_skip_nulls() {
        let schema = schema();
        let mut row = row(b"1", None);
        assert_eq!(row.records(&schema).map(|(name, _)| name).collect::<Vec<_>>(), ["a"]);

        row.update_column(&schema, "b", Some(Bytes::from_static(b"9")))
            .unwrap();
        assert_eq!(row.value(1), Some(&Bytes::from_static(b"9")));
        assert!(row.update_column(&schema, "zz", None).is_err());
    }

    #[test]
    fn changed_indices_follow_changed_columns() {
        let schema = schema();
        let old = row(b"1", Some(&b"2"[..]));
        let new = row(b"1", Some(&b"3"[..]));
        let changed: Vec<_> = changed_indices(&schema, &old, &new)
            .map(|(name, _)| name)
            .collect();
        assert_eq!(changed, ["by_b"]);
        assert_eq!(changed_indices(&schema, &old, &old).count(), 0);
    }
}
