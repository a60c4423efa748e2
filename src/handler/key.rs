//! Host key images and read flags.

use bytes::Bytes;

use super::HandlerError;
use crate::{
    codec::{CodecError, FieldCodec, HostField},
    query::{QueryKey, QueryKeyError, QueryType},
    schema::{IndexSchema, TableSchema},
};

/// Packed key image as the host hands it over for an index read.
///
/// Parts follow the index column order. Part `n` is present when bit `n` of
/// `keypart_map` is set; a part of a nullable column is preceded by a flag
/// byte that is non-zero for NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostKey {
    /// Concatenated key parts.
    pub data: Vec<u8>,
    /// Bitmap of the parts present in `data`.
    pub keypart_map: u64,
}

impl HostKey {
    /// Key image `data` holding the parts set in `keypart_map`.
    pub fn new(data: impl Into<Vec<u8>>, keypart_map: u64) -> Self {
        Self {
            data: data.into(),
            keypart_map,
        }
    }

    /// Empty key, for whole-index reads.
    pub fn empty() -> Self {
        Self::default()
    }

    fn parts(&self) -> usize {
        self.keypart_map.trailing_ones() as usize
    }
}

/// Host read flag of an index read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadFlag {
    /// Rows equal to the key.
    KeyExact,
    /// First row at or after the key.
    KeyOrNext,
    /// Last row at or before the key.
    KeyOrPrev,
    /// First row after the key.
    AfterKey,
    /// Last row before the key.
    BeforeKey,
    /// Last row whose prefix is at or before the key.
    PrefixLastOrPrev,
}

impl ReadFlag {
    /// Positioning the backend is asked for.
    pub fn query_type(self) -> QueryType {
        match self {
            ReadFlag::KeyExact => QueryType::ExactKey,
            ReadFlag::KeyOrNext => QueryType::KeyOrNext,
            ReadFlag::KeyOrPrev | ReadFlag::PrefixLastOrPrev => QueryType::KeyOrPrevious,
            ReadFlag::AfterKey => QueryType::AfterKey,
            ReadFlag::BeforeKey => QueryType::BeforeKey,
        }
    }
}

/// Translate a host key image over `index` into a [`QueryKey`].
pub(crate) fn build_query_key(
    index_name: &str,
    index: &IndexSchema,
    schema: &TableSchema,
    fields: &[HostField],
    codecs: &[FieldCodec],
    key: &HostKey,
    flag: ReadFlag,
) -> Result<QueryKey, HandlerError> {
    let parts = key.parts().min(index.columns().len());
    let trailing = key.keypart_map.checked_shr(parts as u32).unwrap_or(0);
    if parts < index.columns().len() && trailing != 0 {
        return Err(QueryKeyError::PrefixGap {
            index: index_name.to_string(),
            missing: index.columns()[parts].clone(),
        }
        .into());
    }

    let mut values = Vec::with_capacity(parts);
    let mut offset = 0;
    let mut last_null = false;
    for column in &index.columns()[..parts] {
        let position = schema
            .column_position(column)
            .ok_or_else(|| QueryKeyError::UnknownColumn {
                index: index_name.to_string(),
                column: column.clone(),
            })?;
        let (field, codec) = (&fields[position], &codecs[position]);
        let width = field.host_type.key_length();

        last_null = false;
        if field.nullable {
            let null_flag = *key.data.get(offset).ok_or_else(|| {
                CodecError::MalformedKey(format!("missing null flag of key part `{column}`"))
            })?;
            offset += 1;
            if null_flag != 0 {
                values.push((column.clone(), None));
                offset += width;
                last_null = true;
                continue;
            }
        }
        let (encoded, _) = codec.encode_for_key(key.data.get(offset..).unwrap_or_default(), width)?;
        values.push((column.clone(), Some(Bytes::from(encoded))));
        offset += width;
    }

    let query_type = match flag {
        ReadFlag::AfterKey if last_null => QueryType::IndexFirst,
        flag => flag.query_type(),
    };
    let builder = values
        .into_iter()
        .fold(QueryKey::builder(index_name, index, query_type), |builder, (column, value)| {
            builder.key(column, value)
        });
    Ok(builder.build()?)
}
