//! Trading venue and bar interval enums.
//!
//! Both are closed sets: an exchange or interval the manager does not know
//! about is rejected at the edge (CLI argument, config file) rather than
//! carried as a free-form string through the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Known trading venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Exchange {
    /// China Financial Futures Exchange
    Cffex,
    /// Shanghai Futures Exchange
    Shfe,
    /// Zhengzhou Commodity Exchange
    Czce,
    /// Dalian Commodity Exchange
    Dce,
    /// Shanghai International Energy Exchange
    Ine,
    /// Guangzhou Futures Exchange
    Gfex,
    /// Shanghai Stock Exchange
    Sse,
    /// Shenzhen Stock Exchange
    Szse,
    /// Beijing Stock Exchange
    Bse,
    /// Hong Kong Stock Exchange
    Sehk,
    /// New York Stock Exchange
    Nyse,
    Nasdaq,
    /// Locally generated or backtest-only data
    Local,
}

impl Exchange {
    /// Every known venue, for CLI listings.
    pub const ALL: [Exchange; 13] = [
        Exchange::Cffex,
        Exchange::Shfe,
        Exchange::Czce,
        Exchange::Dce,
        Exchange::Ine,
        Exchange::Gfex,
        Exchange::Sse,
        Exchange::Szse,
        Exchange::Bse,
        Exchange::Sehk,
        Exchange::Nyse,
        Exchange::Nasdaq,
        Exchange::Local,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Cffex => "CFFEX",
            Exchange::Shfe => "SHFE",
            Exchange::Czce => "CZCE",
            Exchange::Dce => "DCE",
            Exchange::Ine => "INE",
            Exchange::Gfex => "GFEX",
            Exchange::Sse => "SSE",
            Exchange::Szse => "SZSE",
            Exchange::Bse => "BSE",
            Exchange::Sehk => "SEHK",
            Exchange::Nyse => "NYSE",
            Exchange::Nasdaq => "NASDAQ",
            Exchange::Local => "LOCAL",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Exchange::ALL
            .iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| ParseEnumError {
                kind: "exchange",
                raw: s.to_string(),
            })
    }
}

/// Bar interval of a stored series.
///
/// `Tick` is a distinct, schema-less series kind: the bar pipelines reject
/// it, but it exists so the history provider surface and deletion can name
/// tick series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Minute,
    Hour,
    Daily,
    Tick,
}

/// The fixed catalog order of bar-carrying intervals.
pub const BAR_INTERVALS: [Interval; 3] = [Interval::Minute, Interval::Hour, Interval::Daily];

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute => "minute",
            Interval::Hour => "hour",
            Interval::Daily => "daily",
            Interval::Tick => "tick",
        }
    }

    /// True for intervals that carry bar records.
    pub fn is_bar(&self) -> bool {
        !matches!(self, Interval::Tick)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minute" | "1m" => Ok(Interval::Minute),
            "hour" | "1h" => Ok(Interval::Hour),
            "daily" | "d" | "1d" => Ok(Interval::Daily),
            "tick" => Ok(Interval::Tick),
            _ => Err(ParseEnumError {
                kind: "interval",
                raw: s.to_string(),
            }),
        }
    }
}

/// Failed to parse a closed-set enum from text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} '{raw}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub raw: String,
}
