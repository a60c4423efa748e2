//! Type-directed conversion between host field values and canonical bytes.
//!
//! Every logical column type has one storage encoding. Values arrive either
//! as native [`FieldValue`]s taken from a host row, or as fragments of a packed
//! host key image; both paths produce the same canonical bytes so that rows
//! and index predicates compare consistently in the backend.

pub mod decimal;
mod error;
pub mod host;
pub(crate) mod temporal;
pub mod value;

pub use decimal::Decimal;
pub use error::CodecError;
pub use host::{HostField, HostIndex, HostTable, HostType};
pub use value::{FieldValue, Time};

use crate::schema::ColumnType;

const SIGN_BIT: u64 = 1 << 63;

/// Per-column codec, one variant per logical column type.
///
/// Variants carry the physical host type needed to unpack key images. Storage
/// encoding and decoding depend on the logical type alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCodec {
    /// Character data.
    String(HostType),
    /// Raw bytes.
    Binary(HostType),
    /// Unsigned integers, YEAR and ENUM ordinals.
    UnsignedInt(HostType),
    /// Signed integers.
    SignedInt(HostType),
    /// FLOAT and DOUBLE.
    Double(HostType),
    /// Fixed-point numbers.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Number of fractional digits.
        scale: u8,
    },
    /// Signed durations.
    Time(HostType),
    /// Calendar dates.
    Date(HostType),
    /// Dates with time of day.
    DateTime(HostType),
}

impl FieldCodec {
    /// Codec for a host column.
    pub fn for_host(field: &HostField) -> Result<Self, CodecError> {
        field.validate()?;
        let host_type = field.host_type;
        Ok(match field.column_type() {
            ColumnType::String => FieldCodec::String(host_type),
            ColumnType::Binary => FieldCodec::Binary(host_type),
            ColumnType::ULong => FieldCodec::UnsignedInt(host_type),
            ColumnType::Long => FieldCodec::SignedInt(host_type),
            ColumnType::Double => FieldCodec::Double(host_type),
            ColumnType::Decimal => match host_type {
                HostType::NewDecimal { precision, scale } => {
                    FieldCodec::Decimal { precision, scale }
                }
                other => {
                    return Err(CodecError::UnsupportedHostType(format!(
                        "{other:?} as decimal"
                    )))
                }
            },
            ColumnType::Time => FieldCodec::Time(host_type),
            ColumnType::Date => FieldCodec::Date(host_type),
            ColumnType::DateTime => FieldCodec::DateTime(host_type),
        })
    }

    /// Logical type handled by this codec.
    pub fn column_type(&self) -> ColumnType {
        match self {
            FieldCodec::String(_) => ColumnType::String,
            FieldCodec::Binary(_) => ColumnType::Binary,
            FieldCodec::UnsignedInt(_) => ColumnType::ULong,
            FieldCodec::SignedInt(_) => ColumnType::Long,
            FieldCodec::Double(_) => ColumnType::Double,
            FieldCodec::Decimal { .. } => ColumnType::Decimal,
            FieldCodec::Time(_) => ColumnType::Time,
            FieldCodec::Date(_) => ColumnType::Date,
            FieldCodec::DateTime(_) => ColumnType::DateTime,
        }
    }

    /// Physical host type of key images.
    pub fn host_type(&self) -> HostType {
        match *self {
            FieldCodec::String(host_type)
            | FieldCodec::Binary(host_type)
            | FieldCodec::UnsignedInt(host_type)
            | FieldCodec::SignedInt(host_type)
            | FieldCodec::Double(host_type)
            | FieldCodec::Time(host_type)
            | FieldCodec::Date(host_type)
            | FieldCodec::DateTime(host_type) => host_type,
            FieldCodec::Decimal { precision, scale } => HostType::NewDecimal { precision, scale },
        }
    }

    /// Canonical storage bytes of a native value.
    pub fn encode_for_storage(&self, value: &FieldValue) -> Result<Vec<u8>, CodecError> {
        match (self, value) {
            (FieldCodec::String(_), FieldValue::Text(text)) => Ok(text.as_bytes().to_vec()),
            (FieldCodec::Binary(_), FieldValue::Binary(bytes)) => Ok(bytes.clone()),
            (FieldCodec::UnsignedInt(_), FieldValue::Unsigned(v)) => Ok(v.to_be_bytes().to_vec()),
            (FieldCodec::SignedInt(_), FieldValue::Signed(v)) => Ok(encode_signed(*v)),
            (FieldCodec::Double(_), FieldValue::Double(v)) => {
                Ok(v.to_bits().to_be_bytes().to_vec())
            }
            (FieldCodec::Decimal { precision, scale }, FieldValue::Decimal(v)) => {
                v.to_bin(u32::from(*precision), u32::from(*scale))
            }
            (FieldCodec::Time(_), FieldValue::Time(v)) => Ok(encode_signed(v.to_packed())),
            (FieldCodec::Date(_), FieldValue::Date(v)) => {
                Ok(temporal::format_date(v)?.into_bytes())
            }
            (FieldCodec::DateTime(_), FieldValue::DateTime(v)) => {
                Ok(temporal::format_datetime(v)?.into_bytes())
            }
            (codec, value) => Err(CodecError::TypeMismatch {
                expected: codec.column_type(),
                found: value.column_type(),
            }),
        }
    }

    /// Canonical storage bytes of one part of a packed host key image.
    ///
    /// `raw_key` starts at the part (after any null flag byte) and
    /// `declared_length` is the part's width in the image. Returns the
    /// canonical bytes together with their length.
    pub fn encode_for_key(
        &self,
        raw_key: &[u8],
        declared_length: usize,
    ) -> Result<(Vec<u8>, usize), CodecError> {
        if declared_length > raw_key.len() {
            return Err(CodecError::MalformedKey(format!(
                "declared length {declared_length} exceeds the {} bytes available",
                raw_key.len()
            )));
        }
        let fragment = &raw_key[..declared_length];

        let encoded = match self {
            FieldCodec::String(host_type) | FieldCodec::Binary(host_type) => {
                let text = matches!(self, FieldCodec::String(_));
                string_fragment(fragment, host_type, text)?.to_vec()
            }
            FieldCodec::Decimal { precision, scale } => {
                let width = decimal::bin_size(u32::from(*precision), u32::from(*scale));
                fixed(fragment, width)?.to_vec()
            }
            _ => {
                let value = self.unpack_key_value(fragment)?;
                self.encode_for_storage(&value)?
            }
        };
        let length = encoded.len();
        Ok((encoded, length))
    }

    fn unpack_key_value(&self, fragment: &[u8]) -> Result<FieldValue, CodecError> {
        let host_type = self.host_type();
        let width = host_type.key_length();
        let value = match (self, host_type) {
            (FieldCodec::UnsignedInt(_), HostType::Year) => {
                let year = fixed(fragment, 1)?[0];
                FieldValue::Unsigned(if year == 0 { 0 } else { u64::from(year) + 1900 })
            }
            (
                FieldCodec::UnsignedInt(_),
                HostType::Tiny
                | HostType::Short
                | HostType::Int24
                | HostType::Long
                | HostType::LongLong
                | HostType::Enum { .. },
            ) => FieldValue::Unsigned(read_le(fixed(fragment, width)?)),
            (
                FieldCodec::SignedInt(_),
                HostType::Tiny
                | HostType::Short
                | HostType::Int24
                | HostType::Long
                | HostType::LongLong,
            ) => FieldValue::Signed(read_le_signed(fixed(fragment, width)?)),
            (FieldCodec::Double(_), HostType::Float) => {
                let bytes = fixed(fragment, 4)?;
                let value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                FieldValue::Double(f64::from(value))
            }
            (FieldCodec::Double(_), HostType::Double) => {
                FieldValue::Double(f64::from_bits(read_le(fixed(fragment, 8)?)))
            }
            (FieldCodec::Time(_), HostType::Time) => {
                FieldValue::Time(Time::from_packed(read_le_signed(fixed(fragment, 3)?))?)
            }
            (FieldCodec::Time(_), HostType::Time2) => {
                FieldValue::Time(temporal::unpack_time2(read_be(fixed(fragment, 3)?) as u32)?)
            }
            (FieldCodec::Date(_), HostType::NewDate) => {
                FieldValue::Date(temporal::unpack_newdate(read_le(fixed(fragment, 3)?) as u32)?)
            }
            (FieldCodec::Date(_), HostType::Date) => FieldValue::Date(
                temporal::unpack_legacy_date(read_le(fixed(fragment, 4)?) as u32)?,
            ),
            (FieldCodec::DateTime(_), HostType::DateTime) => FieldValue::DateTime(
                temporal::unpack_legacy_datetime(read_le(fixed(fragment, 8)?))?,
            ),
            (FieldCodec::DateTime(_), HostType::DateTime2) => {
                FieldValue::DateTime(temporal::unpack_datetime2(read_be(fixed(fragment, 5)?))?)
            }
            (FieldCodec::DateTime(_), HostType::Timestamp) => FieldValue::DateTime(
                temporal::unpack_timestamp(read_le(fixed(fragment, 4)?) as u32)?,
            ),
            (codec, host_type) => {
                return Err(CodecError::UnsupportedHostType(format!(
                    "{host_type:?} key part for {:?} column",
                    codec.column_type()
                )))
            }
        };
        Ok(value)
    }

    /// Native value of canonical storage bytes.
    pub fn decode_into_field(&self, bytes: &[u8]) -> Result<FieldValue, CodecError> {
        let column_type = self.column_type();
        let exact = |expected: usize| -> Result<[u8; 8], CodecError> {
            if bytes.len() != expected {
                return Err(CodecError::InvalidLength {
                    column_type,
                    expected,
                    found: bytes.len(),
                });
            }
            let mut word = [0u8; 8];
            word.copy_from_slice(bytes);
            Ok(word)
        };
        let text = || std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8);

        match self {
            FieldCodec::String(_) => Ok(FieldValue::Text(text()?.to_string())),
            FieldCodec::Binary(_) => Ok(FieldValue::Binary(bytes.to_vec())),
            FieldCodec::UnsignedInt(_) => Ok(FieldValue::Unsigned(u64::from_be_bytes(exact(8)?))),
            FieldCodec::SignedInt(_) => Ok(FieldValue::Signed(decode_signed(exact(8)?))),
            FieldCodec::Double(_) => Ok(FieldValue::Double(f64::from_bits(u64::from_be_bytes(
                exact(8)?,
            )))),
            FieldCodec::Decimal { precision, scale } => Ok(FieldValue::Decimal(
                Decimal::from_bin(bytes, u32::from(*precision), u32::from(*scale))?,
            )),
            FieldCodec::Time(_) => Ok(FieldValue::Time(Time::from_packed(decode_signed(
                exact(8)?,
            ))?)),
            FieldCodec::Date(_) => Ok(FieldValue::Date(temporal::parse_date(text()?)?)),
            FieldCodec::DateTime(_) => Ok(FieldValue::DateTime(temporal::parse_datetime(text()?)?)),
        }
    }
}

fn encode_signed(value: i64) -> Vec<u8> {
    ((value as u64) ^ SIGN_BIT).to_be_bytes().to_vec()
}

fn decode_signed(word: [u8; 8]) -> i64 {
    (u64::from_be_bytes(word) ^ SIGN_BIT) as i64
}

fn fixed(fragment: &[u8], width: usize) -> Result<&[u8], CodecError> {
    if fragment.len() != width {
        return Err(CodecError::MalformedKey(format!(
            "expected a {width}-byte fragment, found {}",
            fragment.len()
        )));
    }
    Ok(fragment)
}

fn string_fragment<'a>(
    fragment: &'a [u8],
    host_type: &HostType,
    text: bool,
) -> Result<&'a [u8], CodecError> {
    match host_type {
        HostType::Varchar { .. } | HostType::Blob { .. } => {
            if fragment.len() < 2 {
                return Err(CodecError::MalformedKey(
                    "variable-length key part without a length prefix".to_string(),
                ));
            }
            let length = usize::from(u16::from_le_bytes([fragment[0], fragment[1]]));
            fragment.get(2..2 + length).ok_or_else(|| {
                CodecError::MalformedKey(format!(
                    "length prefix {length} exceeds the {}-byte fragment",
                    fragment.len() - 2
                ))
            })
        }
        HostType::Char { .. } if text => {
            let end = fragment
                .iter()
                .rposition(|b| *b != b' ')
                .map_or(0, |position| position + 1);
            Ok(&fragment[..end])
        }
        HostType::Char { .. } => Ok(fragment),
        other => Err(CodecError::UnsupportedHostType(format!(
            "{other:?} key part for string column"
        ))),
    }
}

fn read_le(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}

fn read_le_signed(bytes: &[u8]) -> i64 {
    let shift = 64 - 8 * bytes.len() as u32;
    ((read_le(bytes) << shift) as i64) >> shift
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}
