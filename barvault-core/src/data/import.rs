//! Import pipeline — delimited file in, ordered UTC batch out.
//!
//! The pipeline is deliberately all-or-nothing: the first bad row aborts the
//! run and nothing reaches the store. A silently partial import of a price
//! series is worse than a visible failure.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use super::error::PipelineError;
use super::parse::{RecordParser, TIMESTAMP_FORMAT};
use super::store::BarStore;
use crate::domain::{Exchange, Interval, SeriesKey};

/// Mapping from canonical field names to the literal header names in the
/// source file. Turnover and open interest may be unmapped, meaning
/// "default to zero".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub datetime: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub turnover: Option<String>,
    pub open_interest: Option<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            datetime: "datetime".into(),
            open: "open".into(),
            high: "high".into(),
            low: "low".into(),
            close: "close".into(),
            volume: "volume".into(),
            turnover: None,
            open_interest: None,
        }
    }
}

/// One import run's configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub file_path: PathBuf,
    pub symbol: String,
    pub exchange: Exchange,
    pub interval: Interval,
    /// IANA timezone used to interpret naive timestamps in the file.
    #[serde(default = "default_timezone")]
    pub source_timezone: Tz,
    #[serde(default)]
    pub columns: ColumnMap,
    /// strptime-style pattern for the datetime column.
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

fn default_timezone() -> Tz {
    chrono_tz::UTC
}

fn default_timestamp_format() -> String {
    TIMESTAMP_FORMAT.to_string()
}

impl ImportConfig {
    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(self.symbol.clone(), self.exchange, self.interval)
    }

    /// Validated once at pipeline start, not per row.
    fn validate(&self) -> Result<(), PipelineError> {
        if self.symbol.trim().is_empty() {
            return Err(PipelineError::InvalidConfig("symbol is empty".into()));
        }
        // Symbols become file names in the store; a separator or `..` would
        // address outside the series directory.
        if self.symbol.contains(['/', '\\']) || self.symbol == ".." || self.symbol == "." {
            return Err(PipelineError::InvalidConfig(format!(
                "symbol '{}' is not a valid series name",
                self.symbol
            )));
        }
        if !self.interval.is_bar() {
            return Err(PipelineError::InvalidConfig(
                "tick series are schema-less and cannot be imported as bars".into(),
            ));
        }
        if self.timestamp_format.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "timestamp format is empty".into(),
            ));
        }
        Ok(())
    }
}

/// What an import run wrote: first/last stored timestamp and row count.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub count: usize,
}

/// Drives [`RecordParser`] across a whole file and hands the ordered batch
/// to the store.
pub struct ImportPipeline<'a> {
    store: &'a dyn BarStore,
}

impl<'a> ImportPipeline<'a> {
    pub fn new(store: &'a dyn BarStore) -> Self {
        Self { store }
    }

    /// Run one import to completion.
    ///
    /// The cancellation flag is checked between rows, never mid-row; once
    /// the upsert has been issued the batch is no longer cancellable.
    pub fn run(
        &self,
        config: &ImportConfig,
        cancel: &AtomicBool,
    ) -> Result<ImportReport, PipelineError> {
        config.validate()?;

        let file = File::open(&config.file_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PipelineError::FileNotFound {
                path: config.file_path.clone(),
            },
            _ => PipelineError::Unreadable {
                path: config.file_path.clone(),
                reason: e.to_string(),
            },
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader.headers().map_err(|e| PipelineError::Unreadable {
            path: config.file_path.clone(),
            reason: e.to_string(),
        })?;

        let parser = RecordParser::bind(config, headers)
            .map_err(|missing| PipelineError::SchemaMismatch { missing })?;

        let mut records = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let row_number = i + 1;

            if cancel.load(Ordering::Relaxed) {
                return Err(PipelineError::Cancelled);
            }

            let row = row.map_err(|e| PipelineError::Unreadable {
                path: config.file_path.clone(),
                reason: e.to_string(),
            })?;

            let record = parser
                .parse(&row)
                .map_err(|cause| PipelineError::RowFailed { row_number, cause })?;
            records.push(record);
        }

        if records.is_empty() {
            return Err(PipelineError::Empty);
        }

        // The source file may be unsorted; the canonical ordering is
        // timestamp-ascending. Stable, so equal-timestamp rows keep their
        // file order and last-write-wins stays deterministic.
        records.sort_by_key(|r| r.timestamp);

        let start = records[0].timestamp;
        let end = records[records.len() - 1].timestamp;
        let count = self.store.upsert(&config.key(), records)?;

        Ok(ImportReport { start, end, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::store::MemoryStore;
    use chrono::TimeZone;
    use std::io::Write;

    fn write_source(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn config_for(file: &tempfile::NamedTempFile) -> ImportConfig {
        ImportConfig {
            file_path: file.path().to_path_buf(),
            symbol: "rb2410".into(),
            exchange: Exchange::Shfe,
            interval: Interval::Minute,
            source_timezone: chrono_tz::UTC,
            columns: ColumnMap::default(),
            timestamp_format: TIMESTAMP_FORMAT.to_string(),
        }
    }

    const SORTED: &str = "\
datetime,open,high,low,close,volume
2024-01-02 01:31:00,3890,3895,3888,3891,1520
2024-01-02 01:32:00,3891,3893,3889,3890,980
2024-01-02 01:33:00,3890,3899,3890,3898,2210
";

    #[test]
    fn import_reports_bounds_and_count() {
        let file = write_source(SORTED);
        let store = MemoryStore::default();
        let report = ImportPipeline::new(&store)
            .run(&config_for(&file), &AtomicBool::new(false))
            .unwrap();

        assert_eq!(report.count, 3);
        assert_eq!(
            report.start,
            Utc.with_ymd_and_hms(2024, 1, 2, 1, 31, 0).unwrap()
        );
        assert_eq!(
            report.end,
            Utc.with_ymd_and_hms(2024, 1, 2, 1, 33, 0).unwrap()
        );
    }

    #[test]
    fn unsorted_source_is_restored_to_ascending_order() {
        let file = write_source(
            "\
datetime,open,high,low,close,volume
2024-01-02 01:33:00,3890,3899,3890,3898,2210
2024-01-02 01:31:00,3890,3895,3888,3891,1520
2024-01-02 01:32:00,3891,3893,3889,3890,980
",
        );
        let store = MemoryStore::default();
        let config = config_for(&file);
        ImportPipeline::new(&store)
            .run(&config, &AtomicBool::new(false))
            .unwrap();

        let bars = store
            .query(
                &config.key(),
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
            )
            .unwrap();
        let timestamps: Vec<_> = bars.iter().map(|b| b.timestamp).collect();
        let mut sorted = timestamps.clone();
        sorted.sort();
        assert_eq!(timestamps, sorted);
        assert_eq!(bars.len(), 3);
    }

    #[test]
    fn reimport_is_idempotent() {
        let file = write_source(SORTED);
        let store = MemoryStore::default();
        let config = config_for(&file);
        let pipeline = ImportPipeline::new(&store);

        let first = pipeline.run(&config, &AtomicBool::new(false)).unwrap();
        let second = pipeline.run(&config, &AtomicBool::new(false)).unwrap();

        // Second run still reflects rows processed, not rows newly added.
        assert_eq!(first, second);
        let overview = &store.overviews().unwrap()[0];
        assert_eq!(overview.count, 3);
    }

    #[test]
    fn missing_configured_column_fails_fast() {
        let file = write_source(
            "\
datetime,open,high,low,volume
2024-01-02 01:31:00,3890,3895,3888,1520
",
        );
        let store = MemoryStore::default();
        let err = ImportPipeline::new(&store)
            .run(&config_for(&file), &AtomicBool::new(false))
            .unwrap_err();

        match err {
            PipelineError::SchemaMismatch { missing } => {
                assert_eq!(missing, vec!["close".to_string()]);
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
        assert!(store.overviews().unwrap().is_empty());
    }

    #[test]
    fn bad_row_aborts_whole_run() {
        let file = write_source(
            "\
datetime,open,high,low,close,volume
2024-01-02 01:31:00,3890,3895,3888,3891,1520
2024-01-02 01:32:00,junk,3893,3889,3890,980
",
        );
        let store = MemoryStore::default();
        let err = ImportPipeline::new(&store)
            .run(&config_for(&file), &AtomicBool::new(false))
            .unwrap_err();

        match err {
            PipelineError::RowFailed { row_number, .. } => assert_eq!(row_number, 2),
            other => panic!("expected RowFailed, got {other:?}"),
        }
        // Nothing partially ingested.
        assert!(store.overviews().unwrap().is_empty());
    }

    #[test]
    fn header_only_file_is_empty() {
        let file = write_source("datetime,open,high,low,close,volume\n");
        let store = MemoryStore::default();
        let err = ImportPipeline::new(&store)
            .run(&config_for(&file), &AtomicBool::new(false))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Empty));
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let store = MemoryStore::default();
        let mut config = config_for(&write_source(SORTED));
        config.file_path = "/definitely/not/here.csv".into();
        let err = ImportPipeline::new(&store)
            .run(&config, &AtomicBool::new(false))
            .unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound { .. }));
    }

    #[test]
    fn tick_interval_is_rejected_up_front() {
        let file = write_source(SORTED);
        let mut config = config_for(&file);
        config.interval = Interval::Tick;
        let store = MemoryStore::default();
        let err = ImportPipeline::new(&store)
            .run(&config, &AtomicBool::new(false))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn symbol_with_path_separators_is_rejected_up_front() {
        let file = write_source(SORTED);
        let store = MemoryStore::default();
        for symbol in ["../rb2410", "a/b", "a\\b", ".."] {
            let mut config = config_for(&file);
            config.symbol = symbol.into();
            let err = ImportPipeline::new(&store)
                .run(&config, &AtomicBool::new(false))
                .unwrap_err();
            assert!(matches!(err, PipelineError::InvalidConfig(_)), "{symbol:?}");
        }
        assert!(store.overviews().unwrap().is_empty());
    }

    #[test]
    fn cancellation_commits_nothing() {
        let file = write_source(SORTED);
        let store = MemoryStore::default();
        let err = ImportPipeline::new(&store)
            .run(&config_for(&file), &AtomicBool::new(true))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
        assert!(store.overviews().unwrap().is_empty());
    }

    #[test]
    fn duplicate_timestamps_resolve_last_write_wins() {
        let file = write_source(
            "\
datetime,open,high,low,close,volume
2024-01-02 01:31:00,1,1,1,1,10
2024-01-02 01:31:00,2,2,2,2,20
",
        );
        let store = MemoryStore::default();
        let config = config_for(&file);
        let report = ImportPipeline::new(&store)
            .run(&config, &AtomicBool::new(false))
            .unwrap();
        assert_eq!(report.count, 1);

        let bars = store
            .query(
                &config.key(),
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
            )
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].open.to_string(), "2");
    }
}
