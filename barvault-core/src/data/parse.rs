//! Row-level record parsing and canonical serialization.
//!
//! A [`RecordParser`] is bound once per import run against the source file's
//! header row (column positions are resolved up front, not per row). Each
//! data row then becomes a [`BarRecord`] or a [`ParseError`] explaining why
//! it could not.
//!
//! The serialization direction is the exact inverse: timestamps as
//! `%Y-%m-%d %H:%M:%S` in UTC, decimals printed without scientific notation
//! or added trailing zeros.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use super::import::ImportConfig;
use crate::domain::{BarRecord, Exchange, Interval, SeriesKey};

/// Fixed header order of the canonical delimited format.
pub const CANONICAL_HEADER: [&str; 8] = [
    "datetime",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "turnover",
    "open_interest",
];

/// Canonical timestamp format (also the default for source files).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Why one row could not become a bar record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing value for field '{field}'")]
    MissingColumn { field: &'static str },

    #[error("malformed timestamp '{raw_value}'")]
    MalformedTimestamp { raw_value: String },

    #[error("malformed number for field '{field}': '{raw_value}'")]
    MalformedNumber {
        field: &'static str,
        raw_value: String,
    },

    #[error("invalid value for field '{field}': must not be negative")]
    InvalidValue { field: &'static str },
}

/// Resolved positions of the configured columns within the header row.
#[derive(Debug, Clone)]
struct FieldIndices {
    datetime: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    turnover: Option<usize>,
    open_interest: Option<usize>,
}

/// Parses configured delimited-file rows into canonical bar records.
#[derive(Debug)]
pub struct RecordParser {
    symbol: String,
    exchange: Exchange,
    interval: Interval,
    source_timezone: Tz,
    timestamp_format: String,
    idx: FieldIndices,
}

impl RecordParser {
    /// Bind the configured column map against a header row.
    ///
    /// Returns the literal header names that could not be found, so the
    /// pipeline can fail fast with a schema mismatch before parsing a
    /// single row.
    pub fn bind(config: &ImportConfig, headers: &csv::StringRecord) -> Result<Self, Vec<String>> {
        let position = |name: &str| headers.iter().position(|h| h == name);

        let mut missing = Vec::new();
        let mut require = |name: &str| match position(name) {
            Some(i) => i,
            None => {
                missing.push(name.to_string());
                0
            }
        };

        let cols = &config.columns;
        let idx = FieldIndices {
            datetime: require(&cols.datetime),
            open: require(&cols.open),
            high: require(&cols.high),
            low: require(&cols.low),
            close: require(&cols.close),
            volume: require(&cols.volume),
            turnover: match &cols.turnover {
                Some(name) => Some(require(name)),
                None => None,
            },
            open_interest: match &cols.open_interest {
                Some(name) => Some(require(name)),
                None => None,
            },
        };

        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(Self {
            symbol: config.symbol.clone(),
            exchange: config.exchange,
            interval: config.interval,
            source_timezone: config.source_timezone,
            timestamp_format: config.timestamp_format.clone(),
            idx,
        })
    }

    /// Parse one data row into a canonical, UTC-timestamped bar record.
    pub fn parse(&self, row: &csv::StringRecord) -> Result<BarRecord, ParseError> {
        let raw_ts = required_cell(row, self.idx.datetime, "datetime")?;
        let timestamp = parse_timestamp(raw_ts, &self.timestamp_format, self.source_timezone)?;

        let open = required_decimal(row, self.idx.open, "open")?;
        let high = required_decimal(row, self.idx.high, "high")?;
        let low = required_decimal(row, self.idx.low, "low")?;
        let close = required_decimal(row, self.idx.close, "close")?;

        let volume = non_negative(required_decimal(row, self.idx.volume, "volume")?, "volume")?;
        let turnover = optional_decimal(row, self.idx.turnover, "turnover")?;
        let open_interest = optional_decimal(row, self.idx.open_interest, "open_interest")?;

        Ok(BarRecord {
            symbol: self.symbol.clone(),
            exchange: self.exchange,
            interval: self.interval,
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            turnover,
            open_interest,
        })
    }
}

/// Serialize one record to a canonical row of literal strings.
///
/// Exact inverse of parsing a canonical row: feeding the output back through
/// [`parse_canonical`] reproduces the record within the stored precision.
pub fn serialize_bar(record: &BarRecord) -> [String; 8] {
    [
        record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        record.open.to_string(),
        record.high.to_string(),
        record.low.to_string(),
        record.close.to_string(),
        record.volume.to_string(),
        record.turnover.to_string(),
        record.open_interest.to_string(),
    ]
}

/// Parse one row of the canonical format (fixed column order, UTC).
///
/// Used when reading back files barvault itself wrote: the on-disk store
/// and re-imports of exported files.
pub fn parse_canonical(key: &SeriesKey, row: &csv::StringRecord) -> Result<BarRecord, ParseError> {
    let raw_ts = required_cell(row, 0, "datetime")?;
    let naive = NaiveDateTime::parse_from_str(raw_ts, TIMESTAMP_FORMAT).map_err(|_| {
        ParseError::MalformedTimestamp {
            raw_value: raw_ts.to_string(),
        }
    })?;

    Ok(BarRecord {
        symbol: key.symbol.clone(),
        exchange: key.exchange,
        interval: key.interval,
        timestamp: Utc.from_utc_datetime(&naive),
        open: required_decimal(row, 1, "open")?,
        high: required_decimal(row, 2, "high")?,
        low: required_decimal(row, 3, "low")?,
        close: required_decimal(row, 4, "close")?,
        volume: non_negative(required_decimal(row, 5, "volume")?, "volume")?,
        turnover: optional_decimal(row, Some(6), "turnover")?,
        open_interest: optional_decimal(row, Some(7), "open_interest")?,
    })
}

/// Parse a timestamp cell and renormalize it to UTC.
///
/// Renormalization is unconditional: an offset-aware timestamp is converted,
/// a naive one is resolved in the source timezone first. Ambiguous local
/// times (DST fall-back) take the earliest instant; nonexistent local times
/// (spring-forward gap) are malformed.
fn parse_timestamp(raw: &str, format: &str, tz: Tz) -> Result<DateTime<Utc>, ParseError> {
    if let Ok(aware) = DateTime::parse_from_str(raw, format) {
        return Ok(aware.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, format)
        .or_else(|_| {
            // Date-only formats (e.g. %Y-%m-%d for daily bars) resolve to midnight.
            NaiveDate::parse_from_str(raw, format).map(|d| d.and_hms_opt(0, 0, 0).unwrap())
        })
        .map_err(|_| ParseError::MalformedTimestamp {
            raw_value: raw.to_string(),
        })?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| ParseError::MalformedTimestamp {
            raw_value: raw.to_string(),
        })
}

fn required_cell<'r>(
    row: &'r csv::StringRecord,
    idx: usize,
    field: &'static str,
) -> Result<&'r str, ParseError> {
    match row.get(idx).map(str::trim) {
        Some(cell) if !cell.is_empty() => Ok(cell),
        _ => Err(ParseError::MissingColumn { field }),
    }
}

fn required_decimal(
    row: &csv::StringRecord,
    idx: usize,
    field: &'static str,
) -> Result<Decimal, ParseError> {
    let cell = required_cell(row, idx, field)?;
    Decimal::from_str(cell).map_err(|_| ParseError::MalformedNumber {
        field,
        raw_value: cell.to_string(),
    })
}

/// Optional fields (turnover, open interest) default to zero when the column
/// is unmapped or the cell is empty; present values must still be valid and
/// non-negative.
fn optional_decimal(
    row: &csv::StringRecord,
    idx: Option<usize>,
    field: &'static str,
) -> Result<Decimal, ParseError> {
    let cell = match idx.and_then(|i| row.get(i)).map(str::trim) {
        Some(cell) if !cell.is_empty() => cell,
        _ => return Ok(Decimal::ZERO),
    };
    let value = Decimal::from_str(cell).map_err(|_| ParseError::MalformedNumber {
        field,
        raw_value: cell.to_string(),
    })?;
    non_negative(value, field)
}

fn non_negative(value: Decimal, field: &'static str) -> Result<Decimal, ParseError> {
    if value < Decimal::ZERO {
        Err(ParseError::InvalidValue { field })
    } else {
        Ok(value)
    }
}
