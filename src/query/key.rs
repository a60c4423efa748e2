use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes};

use super::QueryKeyError;
use crate::{
    schema::IndexSchema,
    serdes::{ensure_remaining, Decode, DecodeError, Encode},
};

/// Positioning requested by an index scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    /// Rows whose key equals the given prefix.
    ExactKey,
    /// Rows strictly after the given prefix, ascending.
    AfterKey,
    /// Rows at or after the given prefix, ascending.
    KeyOrNext,
    /// Rows at or before the given prefix, descending.
    KeyOrPrevious,
    /// Rows strictly before the given prefix, descending.
    BeforeKey,
    /// Every row, ascending from the first key.
    IndexFirst,
    /// Every row, descending from the last key.
    IndexLast,
}

impl QueryType {
    const ALL: [QueryType; 7] = [
        QueryType::ExactKey,
        QueryType::AfterKey,
        QueryType::KeyOrNext,
        QueryType::KeyOrPrevious,
        QueryType::BeforeKey,
        QueryType::IndexFirst,
        QueryType::IndexLast,
    ];

    /// Whether rows are returned in descending key order.
    pub fn is_descending(&self) -> bool {
        matches!(
            self,
            QueryType::KeyOrPrevious | QueryType::BeforeKey | QueryType::IndexLast
        )
    }
}

impl Encode for QueryType {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(*self as u8)
    }

    fn size(&self) -> usize {
        1
    }
}

impl Decode for QueryType {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        ensure_remaining(buf, 1)?;
        let tag = buf.get_u8();
        QueryType::ALL
            .get(usize::from(tag))
            .copied()
            .ok_or(DecodeError::InvalidTag {
                what: "query type",
                tag,
            })
    }
}

/// Index predicate: the index to scan, how to position and the key prefix.
///
/// A column missing from `keys` is unconstrained; a column mapped to `None`
/// is constrained to SQL NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryKey {
    index_name: String,
    query_type: QueryType,
    keys: BTreeMap<String, Option<Bytes>>,
}

impl QueryKey {
    /// Assemble a key without checking it against an index.
    pub fn new(
        index_name: impl Into<String>,
        query_type: QueryType,
        keys: BTreeMap<String, Option<Bytes>>,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            query_type,
            keys,
        }
    }

    /// Start a key over `index` that rejects non-prefix column sets.
    pub fn builder<'a>(
        index_name: impl Into<String>,
        index: &'a IndexSchema,
        query_type: QueryType,
    ) -> QueryKeyBuilder<'a> {
        QueryKeyBuilder {
            key: QueryKey::new(index_name, query_type, BTreeMap::new()),
            index,
        }
    }

    /// Index the predicate applies to.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Requested positioning.
    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    /// Constrained columns and their canonical values.
    pub fn keys(&self) -> &BTreeMap<String, Option<Bytes>> {
        &self.keys
    }

    /// Constraint on `column`: `None` when unconstrained.
    pub fn key(&self, column: &str) -> Option<Option<&Bytes>> {
        self.keys.get(column).map(Option::as_ref)
    }

    /// Check that the constrained columns form a prefix of `index`.
    pub fn validate(&self, index: &IndexSchema) -> Result<(), QueryKeyError> {
        if let Some(column) = self.keys.keys().find(|column| !index.contains(column)) {
            return Err(QueryKeyError::UnknownColumn {
                index: self.index_name.clone(),
                column: column.clone(),
            });
        }
        let constrained = index
            .columns()
            .iter()
            .take_while(|column| self.keys.contains_key(*column))
            .count();
        if constrained < self.keys.len() {
            return Err(QueryKeyError::PrefixGap {
                index: self.index_name.clone(),
                missing: index.columns()[constrained].clone(),
            });
        }
        Ok(())
    }

    /// Clear the key for reuse.
    pub fn reset(&mut self) {
        self.index_name.clear();
        self.query_type = QueryType::ExactKey;
        self.keys.clear();
    }

    /// Byte form sent to the backend.
    pub fn serialize(&self) -> Bytes {
        self.encode_to_bytes()
    }

    /// Parse a serialized key.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, QueryKeyError> {
        let mut buf = bytes;
        let key = Self::decode(&mut buf)?;
        if !buf.is_empty() {
            return Err(QueryKeyError::TrailingBytes(buf.len()));
        }
        Ok(key)
    }
}

impl Encode for QueryKey {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.index_name.encode(buf);
        self.query_type.encode(buf);
        self.keys.encode(buf);
    }

    fn size(&self) -> usize {
        self.index_name.size() + self.query_type.size() + self.keys.size()
    }
}

impl Decode for QueryKey {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        Ok(Self {
            index_name: String::decode(buf)?,
            query_type: QueryType::decode(buf)?,
            keys: BTreeMap::decode(buf)?,
        })
    }
}

/// Builder returned by [`QueryKey::builder`].
#[derive(Debug)]
pub struct QueryKeyBuilder<'a> {
    key: QueryKey,
    index: &'a IndexSchema,
}

impl QueryKeyBuilder<'_> {
    /// Constrain `column` to `value`, `None` meaning SQL NULL.
    pub fn key(mut self, column: impl Into<String>, value: Option<Bytes>) -> Self {
        self.key.keys.insert(column.into(), value);
        self
    }

    /// Finish, rejecting keys that are not a prefix of the index.
    pub fn build(self) -> Result<QueryKey, QueryKeyError> {
        self.key.validate(self.index)?;
        Ok(self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> IndexSchema {
        IndexSchema::new(["a", "b", "c"], false)
    }

    #[test]
    fn prefix_keys_are_accepted() {
        let index = index();
        let key = QueryKey::builder("abc", &index, QueryType::KeyOrNext)
            .key("a", Some(Bytes::from_static(b"1")))
            .key("b", None)
            .build()
            .unwrap();
        assert_eq!(key.key("a"), Some(Some(&Bytes::from_static(b"1"))));
        assert_eq!(key.key("b"), Some(None));
        assert_eq!(key.key("c"), None);

        let decoded = QueryKey::deserialize(&key.serialize()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn gaps_are_rejected() {
        let index = index();
        let err = QueryKey::builder("abc", &index, QueryType::ExactKey)
            .key("a", Some(Bytes::from_static(b"1")))
            .key("c", Some(Bytes::from_static(b"3")))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            QueryKeyError::PrefixGap {
                index: "abc".to_string(),
                missing: "b".to_string()
            }
        );

        let err = QueryKey::builder("abc", &index, QueryType::ExactKey)
            .key("z", None)
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryKeyError::UnknownColumn { .. }));
    }

    #[test]
    fn unconstrained_key_is_a_valid_prefix() {
        let index = index();
        let key = QueryKey::builder("abc", &index, QueryType::IndexFirst)
            .build()
            .unwrap();
        assert!(key.keys().is_empty());
        assert!(!key.query_type().is_descending());
        assert!(QueryType::IndexLast.is_descending());
    }

    #[test]
    fn unknown_query_type_is_malformed() {
        let mut bytes = QueryKey::new("i", QueryType::ExactKey, BTreeMap::new())
            .serialize()
            .to_vec();
        bytes[5] = 7;
        assert_eq!(
            QueryKey::deserialize(&bytes).unwrap_err(),
            QueryKeyError::Decode(DecodeError::InvalidTag {
                what: "query type",
                tag: 7
            })
        );
    }
}
