//! Physical field descriptions as the host reports them.

use super::{decimal, CodecError};
use crate::schema::ColumnType;

/// Physical storage type of a host field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostType {
    /// 1-byte integer.
    Tiny,
    /// 2-byte integer.
    Short,
    /// 3-byte integer.
    Int24,
    /// 4-byte integer.
    Long,
    /// 8-byte integer.
    LongLong,
    /// 1-byte year offset from 1900.
    Year,
    /// Enumeration stored as a 1 or 2 byte ordinal.
    Enum {
        /// Width of the ordinal in bytes.
        pack_length: u8,
    },
    /// 4-byte IEEE-754 float.
    Float,
    /// 8-byte IEEE-754 double.
    Double,
    /// Fixed-point number in the binary decimal layout.
    NewDecimal {
        /// Total number of digits.
        precision: u8,
        /// Number of fractional digits.
        scale: u8,
    },
    /// Legacy 4-byte `YYYYMMDD` date.
    Date,
    /// 3-byte packed date.
    NewDate,
    /// Legacy 3-byte `HHMMSS` time.
    Time,
    /// 3-byte packed time.
    Time2,
    /// Legacy 8-byte `YYYYMMDDHHMMSS` datetime.
    DateTime,
    /// 5-byte packed datetime.
    DateTime2,
    /// 4-byte seconds since the epoch.
    Timestamp,
    /// Variable-length character or byte string.
    Varchar {
        /// Maximum length in bytes.
        max_length: u32,
        /// Whether the column holds bytes rather than text.
        binary: bool,
    },
    /// Fixed-length string, space padded when textual.
    Char {
        /// Declared length in bytes.
        length: u32,
        /// Whether the column holds bytes rather than text.
        binary: bool,
    },
    /// Large object.
    Blob {
        /// Maximum length in bytes.
        max_length: u32,
        /// Whether the column holds bytes rather than text.
        binary: bool,
    },
}

impl HostType {
    /// Width of a key part image, excluding the null flag byte.
    pub fn key_length(&self) -> usize {
        match self {
            HostType::Tiny | HostType::Year => 1,
            HostType::Short => 2,
            HostType::Int24 | HostType::NewDate | HostType::Time | HostType::Time2 => 3,
            HostType::Long | HostType::Float | HostType::Date | HostType::Timestamp => 4,
            HostType::DateTime2 => 5,
            HostType::LongLong | HostType::Double | HostType::DateTime => 8,
            HostType::Enum { pack_length } => usize::from(*pack_length),
            HostType::NewDecimal { precision, scale } => {
                decimal::bin_size(u32::from(*precision), u32::from(*scale))
            }
            HostType::Varchar { max_length, .. } | HostType::Blob { max_length, .. } => {
                2 + *max_length as usize
            }
            HostType::Char { length, .. } => *length as usize,
        }
    }
}

/// A host column: name, physical type and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostField {
    /// Column name.
    pub name: String,
    /// Physical type.
    pub host_type: HostType,
    /// Whether integer values are unsigned.
    pub unsigned: bool,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether the column is the table's auto-increment column.
    pub auto_increment: bool,
}

impl HostField {
    /// A non-null, signed field.
    pub fn new(name: impl Into<String>, host_type: HostType) -> Self {
        Self {
            name: name.into(),
            host_type,
            unsigned: false,
            nullable: false,
            auto_increment: false,
        }
    }

    /// Mark integer values unsigned.
    pub fn unsigned(self) -> Self {
        Self {
            unsigned: true,
            ..self
        }
    }

    /// Allow NULL values.
    pub fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    /// Mark as the auto-increment column.
    pub fn auto_increment(self) -> Self {
        Self {
            auto_increment: true,
            ..self
        }
    }

    /// Logical column type the physical type maps to.
    pub fn column_type(&self) -> ColumnType {
        match self.host_type {
            HostType::Tiny
            | HostType::Short
            | HostType::Int24
            | HostType::Long
            | HostType::LongLong => {
                if self.unsigned {
                    ColumnType::ULong
                } else {
                    ColumnType::Long
                }
            }
            HostType::Year | HostType::Enum { .. } => ColumnType::ULong,
            HostType::Float | HostType::Double => ColumnType::Double,
            HostType::NewDecimal { .. } => ColumnType::Decimal,
            HostType::Date | HostType::NewDate => ColumnType::Date,
            HostType::Time | HostType::Time2 => ColumnType::Time,
            HostType::DateTime | HostType::DateTime2 | HostType::Timestamp => ColumnType::DateTime,
            HostType::Varchar { binary, .. }
            | HostType::Char { binary, .. }
            | HostType::Blob { binary, .. } => {
                if binary {
                    ColumnType::Binary
                } else {
                    ColumnType::String
                }
            }
        }
    }

    /// Declared maximum length of string and binary columns.
    pub fn max_length(&self) -> Option<u32> {
        match self.host_type {
            HostType::Varchar { max_length, .. } | HostType::Blob { max_length, .. } => {
                Some(max_length)
            }
            HostType::Char { length, .. } => Some(length),
            _ => None,
        }
    }

    /// `(precision, scale)` of decimal columns.
    pub fn precision_scale(&self) -> Option<(u32, u32)> {
        match self.host_type {
            HostType::NewDecimal { precision, scale } => {
                Some((u32::from(precision), u32::from(scale)))
            }
            _ => None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), CodecError> {
        match self.host_type {
            HostType::Enum { pack_length } if !(1..=2).contains(&pack_length) => Err(
                CodecError::UnsupportedHostType(format!(
                    "enum `{}` with {pack_length}-byte ordinal",
                    self.name
                )),
            ),
            HostType::NewDecimal { precision, scale } => {
                decimal::check_bounds(u32::from(precision), u32::from(scale))
            }
            _ => Ok(()),
        }
    }
}

/// A host index: its name, ordered key columns and uniqueness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIndex {
    /// Index name.
    pub name: String,
    /// Key columns in order.
    pub columns: Vec<String>,
    /// Whether duplicate keys are rejected.
    pub unique: bool,
}

impl HostIndex {
    /// Describe an index over `columns`.
    pub fn new<I, S>(name: impl Into<String>, columns: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique,
        }
    }
}

/// Host table metadata handed over at create and open time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostTable {
    /// Columns in row order.
    pub fields: Vec<HostField>,
    /// Secondary indices.
    pub indices: Vec<HostIndex>,
}

impl HostTable {
    /// Table with `fields` and no indices.
    pub fn new(fields: Vec<HostField>) -> Self {
        Self {
            fields,
            indices: Vec::new(),
        }
    }

    /// Add an index.
    pub fn with_index(mut self, index: HostIndex) -> Self {
        self.indices.push(index);
        self
    }

    /// Field named `name`.
    pub fn field(&self, name: &str) -> Option<&HostField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Index named `name`.
    pub fn index(&self, name: &str) -> Option<&HostIndex> {
        self.indices.iter().find(|index| index.name == name)
    }
}
