//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Canonical round-trip — serialize then parse reproduces every record
//! 2. Ordering — any permutation of source rows reaches the store ascending
//! 3. Catalog completeness — no leaf is lost, symbols sort ascending

use std::sync::atomic::AtomicBool;
use std::sync::Mutex;

use barvault_core::data::parse::{parse_canonical, serialize_bar};
use barvault_core::data::{
    BarStore, Catalog, ColumnMap, ImportConfig, ImportPipeline, StoreError,
};
use barvault_core::domain::{BarRecord, Exchange, Interval, SeriesKey, SeriesOverview};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

// ── Strategies ───────────────────────────────────────────────────────

fn arb_decimal() -> impl Strategy<Value = Decimal> {
    (-1_000_000_000i64..1_000_000_000, 0u32..6).prop_map(|(m, scale)| Decimal::new(m, scale))
}

fn arb_non_negative_decimal() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000, 0u32..6).prop_map(|(m, scale)| Decimal::new(m, scale))
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap()
}

type BarFields = (Decimal, Decimal, Decimal, Decimal, Decimal, Decimal, Decimal);

fn arb_fields() -> impl Strategy<Value = BarFields> {
    (
        arb_decimal(),
        arb_decimal(),
        arb_decimal(),
        arb_decimal(),
        arb_non_negative_decimal(),
        arb_non_negative_decimal(),
        arb_non_negative_decimal(),
    )
}

/// Bars with distinct minute timestamps, in shuffled order.
fn arb_bars(max: usize) -> impl Strategy<Value = Vec<BarRecord>> {
    prop::collection::vec(arb_fields(), 1..=max)
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(
                    |(i, (open, high, low, close, volume, turnover, open_interest))| BarRecord {
                        symbol: "rb2410".into(),
                        exchange: Exchange::Shfe,
                        interval: Interval::Minute,
                        timestamp: base_time() + Duration::minutes(i as i64),
                        open,
                        high,
                        low,
                        close,
                        volume,
                        turnover,
                        open_interest,
                    },
                )
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

// ── 1. Canonical round-trip ──────────────────────────────────────────

proptest! {
    #[test]
    fn serialize_parse_round_trips(bars in arb_bars(16)) {
        let key = SeriesKey::new("rb2410", Exchange::Shfe, Interval::Minute);
        for bar in &bars {
            let row = serialize_bar(bar);
            let record = csv::StringRecord::from(row.to_vec());
            let back = parse_canonical(&key, &record).unwrap();
            prop_assert_eq!(bar, &back);
        }
    }
}

// ── 2. Ordering invariant ────────────────────────────────────────────

/// Store that records every upsert batch it receives.
#[derive(Default)]
struct RecordingStore {
    batches: Mutex<Vec<Vec<BarRecord>>>,
}

impl BarStore for RecordingStore {
    fn overviews(&self) -> Result<Vec<SeriesOverview>, StoreError> {
        Ok(Vec::new())
    }

    fn query(
        &self,
        _key: &SeriesKey,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<BarRecord>, StoreError> {
        Ok(Vec::new())
    }

    fn upsert(&self, _key: &SeriesKey, records: Vec<BarRecord>) -> Result<usize, StoreError> {
        let count = records.len();
        self.batches.lock().unwrap().push(records);
        Ok(count)
    }

    fn delete(&self, _key: &SeriesKey) -> Result<usize, StoreError> {
        Ok(0)
    }
}

proptest! {
    #[test]
    fn any_row_permutation_reaches_store_ascending(bars in arb_bars(24)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.csv");

        let mut writer = csv::Writer::from_path(&path).unwrap();
        writer
            .write_record([
                "datetime", "open", "high", "low", "close", "volume", "turnover", "open_interest",
            ])
            .unwrap();
        for bar in &bars {
            writer.write_record(serialize_bar(bar)).unwrap();
        }
        writer.flush().unwrap();

        let config = ImportConfig {
            file_path: path,
            symbol: "rb2410".into(),
            exchange: Exchange::Shfe,
            interval: Interval::Minute,
            source_timezone: chrono_tz::UTC,
            columns: ColumnMap {
                turnover: Some("turnover".into()),
                open_interest: Some("open_interest".into()),
                ..ColumnMap::default()
            },
            timestamp_format: "%Y-%m-%d %H:%M:%S".into(),
        };

        let store = RecordingStore::default();
        ImportPipeline::new(&store)
            .run(&config, &AtomicBool::new(false))
            .unwrap();

        let batches = store.batches.lock().unwrap();
        prop_assert_eq!(batches.len(), 1);
        let timestamps: Vec<_> = batches[0].iter().map(|b| b.timestamp).collect();
        prop_assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(timestamps.len(), bars.len());
    }
}

// ── 3. Catalog completeness ──────────────────────────────────────────

fn arb_overview() -> impl Strategy<Value = SeriesOverview> {
    (
        "[A-Za-z][A-Za-z0-9]{0,5}",
        prop::sample::select(&[Exchange::Shfe, Exchange::Cffex, Exchange::Sse, Exchange::Nyse][..]),
        prop::sample::select(&[Interval::Minute, Interval::Hour, Interval::Daily][..]),
        1usize..10_000,
    )
        .prop_map(|(symbol, exchange, interval, count)| SeriesOverview {
            key: SeriesKey::new(symbol, exchange, interval),
            count,
            start: base_time(),
            end: base_time() + Duration::days(30),
        })
}

proptest! {
    #[test]
    fn catalog_preserves_leaves_and_sorts_symbols(
        overviews in prop::collection::vec(arb_overview(), 0..32),
    ) {
        let catalog = Catalog::build(&overviews);

        prop_assert_eq!(catalog.total_series(), overviews.len());
        prop_assert_eq!(catalog.intervals.len(), 3);

        for node in &catalog.intervals {
            for group in &node.exchanges {
                prop_assert!(!group.series.is_empty());
                prop_assert!(group
                    .series
                    .windows(2)
                    .all(|w| w[0].key.symbol <= w[1].key.symbol));
            }
        }
    }
}
