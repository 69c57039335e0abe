//! Source row parsing.
//!
//! Rows are `timestamp,bid,ask` with the timestamp in the fixed
//! `MM/DD/YYYY HH:MM:SS.mmm` layout (UTC). The timestamp is read by byte
//! offset rather than through a format string: every field sits at a known
//! position, and this is the hottest path of a bulk load.

use chrono::{DateTime, NaiveDate, Utc};
use fxmaster_types::Quote;

use crate::ParseError;

/// Length of `MM/DD/YYYY HH:MM:SS.mmm`.
pub const TIMESTAMP_LEN: usize = 23;

/// Expected separators as `(offset, byte)`.
const SEPARATORS: [(usize, u8); 6] = [
    (2, b'/'),
    (5, b'/'),
    (10, b' '),
    (13, b':'),
    (16, b':'),
    (19, b'.'),
];

/// Parses a fixed-layout timestamp.
///
/// # Errors
///
/// Returns [`ParseError::Timestamp`] if the layout or the calendar value is
/// invalid.
///
/// # Example
///
/// ```
/// use fxmaster_ingest::parse_timestamp;
///
/// let ts = parse_timestamp("01/04/2015 22:00:01.587").unwrap();
/// assert_eq!(ts.to_rfc3339(), "2015-01-04T22:00:01.587+00:00");
/// ```
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ParseError> {
    let invalid = || ParseError::Timestamp(s.to_string());
    let b = s.as_bytes();
    if b.len() != TIMESTAMP_LEN || SEPARATORS.iter().any(|&(i, c)| b[i] != c) {
        return Err(invalid());
    }

    let month = digits(&b[0..2]).ok_or_else(invalid)?;
    let day = digits(&b[3..5]).ok_or_else(invalid)?;
    let year = digits(&b[6..10]).ok_or_else(invalid)?;
    let hour = digits(&b[11..13]).ok_or_else(invalid)?;
    let minute = digits(&b[14..16]).ok_or_else(invalid)?;
    let second = digits(&b[17..19]).ok_or_else(invalid)?;
    let milli = digits(&b[20..23]).ok_or_else(invalid)?;

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|d| d.and_hms_milli_opt(hour, minute, second, milli))
        .map(|dt| dt.and_utc())
        .ok_or_else(invalid)
}

/// Reads an unsigned decimal from ASCII digits.
#[inline]
fn digits(bytes: &[u8]) -> Option<u32> {
    bytes.iter().try_fold(0u32, |acc, &c| {
        c.is_ascii_digit().then(|| acc * 10 + u32::from(c - b'0'))
    })
}

fn parse_price(s: &str) -> Result<f64, ParseError> {
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(ParseError::Price(s.to_string())),
    }
}

/// Parses one `timestamp,bid,ask` data row.
///
/// # Errors
///
/// Returns an error if the row does not have exactly three fields or any
/// field is invalid.
pub fn parse_line(line: &str) -> Result<Quote, ParseError> {
    let mut fields = line.trim_end_matches(['\r', '\n']).split(',');
    let (Some(ts), Some(bid), Some(ask), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(ParseError::FieldCount(line.split(',').count()));
    };

    Ok(Quote::new(
        parse_timestamp(ts.trim())?,
        parse_price(bid)?,
        parse_price(ask)?,
    ))
}

/// Returns true if `line` carries data (not blank).
#[inline]
#[must_use]
pub fn is_data_line(line: &str) -> bool {
    !line.trim().is_empty()
}
