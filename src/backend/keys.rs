//! Order-preserving index entry keys.
//!
//! An entry key concatenates one component per index column followed by the
//! row identity. A component is `0x00` for NULL, or `0x01` and the column's
//! canonical bytes. Fixed-width encodings are copied as is; variable-width
//! ones escape `0x00` as `0x00 0x01` and end with `0x00 0x00`, so every
//! component is self-delimiting and byte order follows value order.

use bytes::Bytes;

use crate::{
    id::RowId,
    schema::{ColumnType, IndexSchema, TableSchema},
};

const NULL_MARKER: u8 = 0x00;
const VALUE_MARKER: u8 = 0x01;
const SIGN_BIT: u64 = 1 << 63;

/// Encode the key components of the columns of `index`.
///
/// `value_of` yields the canonical value of a column, `None` for NULL.
/// Encoding stops at the first column `value_of` reports as absent.
pub(crate) fn encode_prefix<'a, F>(
    schema: &TableSchema,
    index: &IndexSchema,
    mut value_of: F,
) -> Vec<u8>
where
    F: FnMut(&str) -> Option<Option<&'a Bytes>>,
{
    let mut key = Vec::new();
    for column in index.columns() {
        let Some(value) = value_of(column) else {
            break;
        };
        let column_type = schema
            .column(column)
            .map_or(ColumnType::Binary, |column| column.column_type());
        encode_component(&mut key, column_type, value.map(Bytes::as_ref));
    }
    key
}

/// Entry key of a stored row: its index components then its identity.
pub(crate) fn entry_key(prefix: Vec<u8>, id: RowId) -> Vec<u8> {
    let mut key = prefix;
    key.extend_from_slice(id.as_bytes());
    key
}

fn encode_component(key: &mut Vec<u8>, column_type: ColumnType, value: Option<&[u8]>) {
    let Some(value) = value else {
        key.push(NULL_MARKER);
        return;
    };
    key.push(VALUE_MARKER);
    match column_type {
        ColumnType::ULong | ColumnType::Long | ColumnType::Time | ColumnType::Decimal => {
            key.extend_from_slice(value)
        }
        ColumnType::Double => match <[u8; 8]>::try_from(value) {
            Ok(bits) => key.extend_from_slice(&order_double(u64::from_be_bytes(bits))),
            Err(_) => escape_into(key, value),
        },
        ColumnType::String | ColumnType::Binary | ColumnType::Date | ColumnType::DateTime => {
            escape_into(key, value)
        }
    }
}

fn order_double(bits: u64) -> [u8; 8] {
    let ordered = if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits ^ SIGN_BIT
    };
    ordered.to_be_bytes()
}

fn escape_into(key: &mut Vec<u8>, value: &[u8]) {
    key.reserve(value.len() + 2);
    for &byte in value {
        key.push(byte);
        if byte == 0x00 {
            key.push(0x01);
        }
    }
    key.extend_from_slice(&[0x00, 0x00]);
}
