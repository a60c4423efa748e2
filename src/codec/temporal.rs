//! Canonical text forms of dates and datetimes, plus the host's packed
//! temporal key layouts.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use super::{value::Time, CodecError};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIMEF_INT_OFS: i64 = 0x80_0000_0000;
const TIMEF_INT_OFS: i64 = 0x80_0000;

const MAX_YEAR: i32 = 9999;

/// `YYYY-MM-DD`; years outside `0..=9999` have no four-digit form.
pub(crate) fn format_date(date: &NaiveDate) -> Result<String, CodecError> {
    if !(0..=MAX_YEAR).contains(&date.year()) {
        return Err(CodecError::InvalidTemporal(format!(
            "year {} of `{date}` is outside 0000..=9999",
            date.year()
        )));
    }
    Ok(format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day()))
}

pub(crate) fn parse_date(text: &str) -> Result<NaiveDate, CodecError> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|err| CodecError::InvalidTemporal(format!("date `{text}`: {err}")))
}

pub(crate) fn format_datetime(datetime: &NaiveDateTime) -> Result<String, CodecError> {
    let mut text = format!(
        "{} {:02}:{:02}:{:02}",
        format_date(&datetime.date())?,
        datetime.hour(),
        datetime.minute(),
        datetime.second()
    );
    let micros = datetime.nanosecond() / 1_000;
    if micros != 0 {
        text.push_str(&format!(".{micros:06}"));
    }
    Ok(text)
}

pub(crate) fn parse_datetime(text: &str) -> Result<NaiveDateTime, CodecError> {
    let invalid =
        |reason: String| CodecError::InvalidTemporal(format!("datetime `{text}`: {reason}"));

    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text, None),
    };
    let datetime = NaiveDateTime::parse_from_str(whole, DATETIME_FORMAT)
        .map_err(|err| invalid(err.to_string()))?;
    let Some(fraction) = fraction else {
        return Ok(datetime);
    };
    if fraction.is_empty() || fraction.len() > 6 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("fraction must be 1 to 6 digits".to_string()));
    }
    let micros = fraction
        .parse::<u32>()
        .map_err(|err| invalid(err.to_string()))?
        * 10u32.pow(6 - fraction.len() as u32);
    datetime
        .with_nanosecond(micros * 1_000)
        .ok_or_else(|| invalid("fraction out of range".to_string()))
}

fn date_from_parts(year: u32, month: u32, day: u32) -> Result<NaiveDate, CodecError> {
    i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
        .ok_or_else(|| {
            CodecError::InvalidTemporal(format!("date {year:04}-{month:02}-{day:02} out of range"))
        })
}

fn datetime_from_parts(
    date: NaiveDate,
    hour: u32,
    minute: u32,
    second: u32,
) -> Result<NaiveDateTime, CodecError> {
    NaiveTime::from_hms_opt(hour, minute, second)
        .map(|time| date.and_time(time))
        .ok_or_else(|| {
            CodecError::InvalidTemporal(format!(
                "time {hour:02}:{minute:02}:{second:02} out of range"
            ))
        })
}

/// `day | month << 5 | year << 9`
pub(crate) fn unpack_newdate(packed: u32) -> Result<NaiveDate, CodecError> {
    date_from_parts(packed >> 9, (packed >> 5) & 0x0F, packed & 0x1F)
}

/// `YYYYMMDD`
pub(crate) fn unpack_legacy_date(packed: u32) -> Result<NaiveDate, CodecError> {
    date_from_parts(packed / 10_000, (packed / 100) % 100, packed % 100)
}

/// `YYYYMMDDHHMMSS`
pub(crate) fn unpack_legacy_datetime(packed: u64) -> Result<NaiveDateTime, CodecError> {
    let ymd = (packed / 1_000_000) as u32;
    let hms = (packed % 1_000_000) as u32;
    let date = unpack_legacy_date(ymd)?;
    datetime_from_parts(date, hms / 10_000, (hms / 100) % 100, hms % 100)
}

/// Five big-endian bytes: `ym(17) day(5) hour(5) minute(6) second(6)` offset
/// by `0x8000000000`.
pub(crate) fn unpack_datetime2(raw: u64) -> Result<NaiveDateTime, CodecError> {
    let packed = raw as i64 - DATETIMEF_INT_OFS;
    if packed < 0 {
        return Err(CodecError::InvalidTemporal(format!(
            "negative datetime image {raw:#x}"
        )));
    }
    let packed = packed as u64;
    let ymd = packed >> 17;
    let ym = ymd >> 5;
    let hms = packed & 0x1_FFFF;

    let date = date_from_parts((ym / 13) as u32, (ym % 13) as u32, (ymd & 0x1F) as u32)?;
    datetime_from_parts(
        date,
        (hms >> 12) as u32,
        ((hms >> 6) & 0x3F) as u32,
        (hms & 0x3F) as u32,
    )
}

/// Seconds since the Unix epoch, rendered in UTC.
pub(crate) fn unpack_timestamp(seconds: u32) -> Result<NaiveDateTime, CodecError> {
    DateTime::from_timestamp(i64::from(seconds), 0)
        .map(|datetime| datetime.naive_utc())
        .ok_or_else(|| CodecError::InvalidTemporal(format!("timestamp {seconds} out of range")))
}

/// Three big-endian bytes: signed `hour(10) minute(6) second(6)` offset by
/// `0x800000`.
pub(crate) fn unpack_time2(raw: u32) -> Result<Time, CodecError> {
    let packed = i64::from(raw) - TIMEF_INT_OFS;
    let negative = packed < 0;
    let abs = packed.unsigned_abs();
    Time::new(
        negative,
        ((abs >> 12) & 0x3FF) as u32,
        ((abs >> 6) & 0x3F) as u8,
        (abs & 0x3F) as u8,
    )
}
