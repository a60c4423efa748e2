use bytes::{Buf, BufMut, Bytes};

use super::ContainerError;
use crate::serdes::{Decode, DecodeError, Encode};

/// Descriptor of a secondary index: its ordered key columns and uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexSchema {
    columns: Vec<String>,
    unique: bool,
}

impl IndexSchema {
    /// Describe an index over `columns`, in key order.
    pub fn new<I, S>(columns: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            unique,
        }
    }

    /// Key columns in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether the index rejects duplicate keys.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Whether `column` is one of the key columns.
    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Drop the key columns and uniqueness, keeping the column buffer.
    pub fn reset(&mut self) {
        self.columns.clear();
        self.unique = false;
    }

    /// Byte form handed to the backend when the index is added.
    pub fn serialize(&self) -> Bytes {
        self.encode_to_bytes()
    }

    /// Parse a serialized index descriptor.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, ContainerError> {
        let mut buf = bytes;
        let index = Self::decode(&mut buf)?;
        if !buf.is_empty() {
            return Err(ContainerError::TrailingBytes(buf.len()));
        }
        Ok(index)
    }

    pub(crate) fn validate(
        &self,
        name: &str,
        has_column: impl Fn(&str) -> bool,
    ) -> Result<(), ContainerError> {
        let invalid = |reason: String| ContainerError::InvalidIndex {
            index: name.to_string(),
            reason,
        };
        if name.is_empty() {
            return Err(invalid("index name is empty".to_string()));
        }
        if self.columns.is_empty() {
            return Err(invalid("index has no columns".to_string()));
        }
        for (position, column) in self.columns.iter().enumerate() {
            if !has_column(column) {
                return Err(invalid(format!("unknown column `{column}`")));
            }
            if self.columns[..position].contains(column) {
                return Err(invalid(format!("column `{column}` repeated")));
            }
        }
        Ok(())
    }
}

impl Encode for IndexSchema {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.columns.encode(buf);
        self.unique.encode(buf);
    }

    fn size(&self) -> usize {
        self.columns.size() + self.unique.size()
    }
}

impl Decode for IndexSchema {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        Ok(Self {
            columns: Vec::decode(buf)?,
            unique: bool::decode(buf)?,
        })
    }
}
