use bytes::{Buf, BufMut};

use super::ContainerError;
use crate::{
    codec::{decimal, HostField},
    serdes::{ensure_remaining, Decode, DecodeError, Encode},
};

/// Logical type of a stored column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnType {
    /// Character data.
    String,
    /// Raw bytes.
    Binary,
    /// Unsigned integer.
    ULong,
    /// Signed integer.
    Long,
    /// Floating point number.
    Double,
    /// Fixed-point number.
    Decimal,
    /// Signed duration.
    Time,
    /// Calendar date.
    Date,
    /// Date with time of day.
    DateTime,
}

impl ColumnType {
    /// All types, in tag order.
    pub const ALL: [ColumnType; 9] = [
        ColumnType::String,
        ColumnType::Binary,
        ColumnType::ULong,
        ColumnType::Long,
        ColumnType::Double,
        ColumnType::Decimal,
        ColumnType::Time,
        ColumnType::Date,
        ColumnType::DateTime,
    ];

    fn tag(self) -> u8 {
        self as u8
    }

    fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(usize::from(tag)).copied()
    }

    fn has_length(self) -> bool {
        matches!(self, ColumnType::String | ColumnType::Binary)
    }
}

impl Encode for ColumnType {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.tag())
    }

    fn size(&self) -> usize {
        1
    }
}

impl Decode for ColumnType {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        ensure_remaining(buf, 1)?;
        let tag = buf.get_u8();
        ColumnType::from_tag(tag).ok_or(DecodeError::InvalidTag {
            what: "column type",
            tag,
        })
    }
}

/// Descriptor of one stored column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnSchema {
    column_type: ColumnType,
    nullable: bool,
    auto_increment: bool,
    max_length: Option<u32>,
    scale: Option<u32>,
    precision: Option<u32>,
}

impl ColumnSchema {
    /// Start describing a nullable column of `column_type`.
    pub fn builder(column_type: ColumnType) -> ColumnSchemaBuilder {
        ColumnSchemaBuilder {
            schema: ColumnSchema {
                column_type,
                nullable: true,
                auto_increment: false,
                max_length: None,
                scale: None,
                precision: None,
            },
        }
    }

    /// Describe a host column.
    pub fn from_host(field: &HostField) -> Result<Self, ContainerError> {
        let mut builder = Self::builder(field.column_type())
            .nullable(field.nullable)
            .auto_increment(field.auto_increment);
        if let Some(max_length) = field.max_length() {
            builder = builder.max_length(max_length);
        }
        if let Some((precision, scale)) = field.precision_scale() {
            builder = builder.precision(precision).scale(scale);
        }
        builder.build(&field.name)
    }

    /// Logical type.
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Whether NULL is accepted.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether values are assigned from the table's counter.
    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    /// Maximum length of STRING and BINARY columns.
    pub fn max_length(&self) -> Option<u32> {
        self.max_length
    }

    /// Fractional digits of DECIMAL columns.
    pub fn scale(&self) -> Option<u32> {
        self.scale
    }

    /// Total digits of DECIMAL columns.
    pub fn precision(&self) -> Option<u32> {
        self.precision
    }

    /// Restore the builder defaults, keeping the column type.
    pub fn reset(&mut self) {
        self.nullable = true;
        self.auto_increment = false;
        self.max_length = None;
        self.scale = None;
        self.precision = None;
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), ContainerError> {
        let invalid = |reason: &str| ContainerError::InvalidColumn {
            column: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("column name is empty"));
        }
        match (self.column_type, self.precision, self.scale) {
            (ColumnType::Decimal, Some(precision), Some(scale)) => {
                decimal::check_bounds(precision, scale)
                    .map_err(|err| invalid(&err.to_string()))?;
            }
            (ColumnType::Decimal, _, _) => {
                return Err(invalid("decimal requires precision and scale"))
            }
            (_, None, None) => {}
            _ => return Err(invalid("precision and scale are only valid for decimal")),
        }
        match (self.column_type.has_length(), self.max_length) {
            (true, None) => return Err(invalid("max length is required")),
            (false, Some(_)) => {
                return Err(invalid("max length is only valid for string and binary"))
            }
            _ => {}
        }
        if self.auto_increment
            && !matches!(
                self.column_type,
                ColumnType::ULong | ColumnType::Long | ColumnType::Double
            )
        {
            return Err(invalid("only integer or floating point columns may auto increment"));
        }
        Ok(())
    }
}

impl Encode for ColumnSchema {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.column_type.encode(buf);
        self.nullable.encode(buf);
        self.auto_increment.encode(buf);
        self.max_length.encode(buf);
        self.scale.encode(buf);
        self.precision.encode(buf);
    }

    fn size(&self) -> usize {
        self.column_type.size()
            + self.nullable.size()
            + self.auto_increment.size()
            + self.max_length.size()
            + self.scale.size()
            + self.precision.size()
    }
}

impl Decode for ColumnSchema {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        Ok(Self {
            column_type: ColumnType::decode(buf)?,
            nullable: bool::decode(buf)?,
            auto_increment: bool::decode(buf)?,
            max_length: Option::decode(buf)?,
            scale: Option::decode(buf)?,
            precision: Option::decode(buf)?,
        })
    }
}

/// Builder for [`ColumnSchema`].
#[derive(Debug, Clone)]
pub struct ColumnSchemaBuilder {
    schema: ColumnSchema,
}

impl ColumnSchemaBuilder {
    /// Whether NULL is accepted. Defaults to `true`.
    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            schema: ColumnSchema {
                nullable,
                ..self.schema
            },
        }
    }

    /// Whether the column auto increments. Defaults to `false`.
    pub fn auto_increment(self, auto_increment: bool) -> Self {
        Self {
            schema: ColumnSchema {
                auto_increment,
                ..self.schema
            },
        }
    }

    /// Maximum length, required for STRING and BINARY.
    pub fn max_length(self, max_length: u32) -> Self {
        Self {
            schema: ColumnSchema {
                max_length: Some(max_length),
                ..self.schema
            },
        }
    }

    /// Fractional digits, required for DECIMAL.
    pub fn scale(self, scale: u32) -> Self {
        Self {
            schema: ColumnSchema {
                scale: Some(scale),
                ..self.schema
            },
        }
    }

    /// Total digits, required for DECIMAL.
    pub fn precision(self, precision: u32) -> Self {
        Self {
            schema: ColumnSchema {
                precision: Some(precision),
                ..self.schema
            },
        }
    }

    /// Validate and build the descriptor of column `name`.
    pub fn build(self, name: &str) -> Result<ColumnSchema, ContainerError> {
        self.schema.validate(name)?;
        Ok(self.schema)
    }
}
