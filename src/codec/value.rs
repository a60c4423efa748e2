//! Native field values exchanged with the host.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use super::{decimal::Decimal, CodecError};
use crate::schema::ColumnType;

/// Largest hour a host TIME value may carry.
pub const MAX_TIME_HOURS: u32 = 838;

/// A host TIME value: a signed duration of hours, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Time {
    negative: bool,
    hours: u32,
    minutes: u8,
    seconds: u8,
}

impl Time {
    /// Build a time value, rejecting out-of-range components.
    pub fn new(negative: bool, hours: u32, minutes: u8, seconds: u8) -> Result<Self, CodecError> {
        if hours > MAX_TIME_HOURS || minutes > 59 || seconds > 59 {
            return Err(CodecError::InvalidTemporal(format!(
                "time {hours}:{minutes}:{seconds} out of range"
            )));
        }
        let negative = negative && (hours, minutes, seconds) != (0, 0, 0);
        Ok(Self {
            negative,
            hours,
            minutes,
            seconds,
        })
    }

    /// Decode the host's integral `[-]HHMMSS` form.
    pub fn from_packed(packed: i64) -> Result<Self, CodecError> {
        let negative = packed < 0;
        let abs = packed.unsigned_abs();
        let hours = u32::try_from(abs / 10_000)
            .map_err(|_| CodecError::InvalidTemporal(format!("time {packed} out of range")))?;
        Self::new(
            negative,
            hours,
            ((abs / 100) % 100) as u8,
            (abs % 100) as u8,
        )
    }

    /// The host's integral `[-]HHMMSS` form.
    pub fn to_packed(&self) -> i64 {
        let abs = i64::from(self.hours) * 10_000
            + i64::from(self.minutes) * 100
            + i64::from(self.seconds);
        if self.negative {
            -abs
        } else {
            abs
        }
    }

    /// Whether the duration is negative.
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Hour component.
    pub fn hours(&self) -> u32 {
        self.hours
    }

    /// Minute component.
    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    /// Second component.
    pub fn seconds(&self) -> u8 {
        self.seconds
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// A host field value in its native, decoded form.
///
/// SQL NULL is represented outside this type as `Option::None`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Character data of a STRING column.
    Text(String),
    /// Raw bytes of a BINARY column.
    Binary(Vec<u8>),
    /// Value of an unsigned integer column.
    Unsigned(u64),
    /// Value of a signed integer column.
    Signed(i64),
    /// Value of a floating point column.
    Double(f64),
    /// Value of a fixed-point column.
    Decimal(Decimal),
    /// Value of a TIME column.
    Time(Time),
    /// Value of a DATE column.
    Date(NaiveDate),
    /// Value of a DATETIME or TIMESTAMP column.
    DateTime(NaiveDateTime),
}

impl FieldValue {
    /// Logical column type this value belongs to.
    pub fn column_type(&self) -> ColumnType {
        match self {
            FieldValue::Text(_) => ColumnType::String,
            FieldValue::Binary(_) => ColumnType::Binary,
            FieldValue::Unsigned(_) => ColumnType::ULong,
            FieldValue::Signed(_) => ColumnType::Long,
            FieldValue::Double(_) => ColumnType::Double,
            FieldValue::Decimal(_) => ColumnType::Decimal,
            FieldValue::Time(_) => ColumnType::Time,
            FieldValue::Date(_) => ColumnType::Date,
            FieldValue::DateTime(_) => ColumnType::DateTime,
        }
    }

    /// Integral view used by auto-increment handling.
    pub fn as_auto_increment(&self) -> Option<u64> {
        match self {
            FieldValue::Unsigned(v) => Some(*v),
            FieldValue::Signed(v) => u64::try_from(*v).ok(),
            FieldValue::Double(v) if *v >= 0.0 => Some(*v as u64),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        FieldValue::Binary(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Unsigned(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Signed(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Decimal(value)
    }
}

impl From<Time> for FieldValue {
    fn from(value: Time) -> Self {
        FieldValue::Time(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        FieldValue::DateTime(value)
    }
}
