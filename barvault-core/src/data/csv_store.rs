//! CSV-backed bar store with one file per series and a metadata sidecar.
//!
//! Layout: `{root}/{interval}/{EXCHANGE}/{SYMBOL}.csv` next to
//! `{SYMBOL}.meta.json` (count and time bounds, so overview listing never
//! has to scan bar data).
//!
//! Writes are atomic: the merged series is written to a `.tmp` file and
//! renamed into place, then the sidecar is rewritten. A crash mid-upsert
//! leaves the previous series file intact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::parse::{parse_canonical, serialize_bar, CANONICAL_HEADER};
use super::store::{dedupe_batch, BarStore, StoreError};
use crate::domain::{BarRecord, Exchange, SeriesKey, SeriesOverview, BAR_INTERVALS};

/// Sidecar contents for one series file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SeriesMeta {
    key: SeriesKey,
    count: usize,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// On-disk store rooted at a data directory.
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Symbols become file names; a separator or `..` would address
    /// outside the store root.
    fn check_symbol(key: &SeriesKey) -> Result<(), StoreError> {
        let symbol = key.symbol.as_str();
        if symbol.is_empty()
            || symbol == "."
            || symbol == ".."
            || symbol.contains(['/', '\\'])
        {
            return Err(StoreError::Io {
                path: PathBuf::from(symbol),
                reason: "symbol must be a single path component".into(),
            });
        }
        Ok(())
    }

    fn series_dir(&self, key: &SeriesKey) -> PathBuf {
        self.root
            .join(key.interval.as_str())
            .join(key.exchange.as_str())
    }

    fn series_path(&self, key: &SeriesKey) -> PathBuf {
        self.series_dir(key).join(format!("{}.csv", key.symbol))
    }

    fn meta_path(&self, key: &SeriesKey) -> PathBuf {
        self.series_dir(key)
            .join(format!("{}.meta.json", key.symbol))
    }

    fn io_err(path: &Path, e: impl std::fmt::Display) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    }

    fn corrupt(path: &Path, e: impl std::fmt::Display) -> StoreError {
        StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    }

    /// Load one whole series file, keyed by timestamp.
    fn load_series(
        &self,
        key: &SeriesKey,
    ) -> Result<BTreeMap<DateTime<Utc>, BarRecord>, StoreError> {
        let path = self.series_path(key);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let mut reader = csv::Reader::from_path(&path).map_err(|e| Self::io_err(&path, e))?;
        let mut bars = BTreeMap::new();
        for row in reader.records() {
            let row = row.map_err(|e| Self::corrupt(&path, e))?;
            let bar = parse_canonical(key, &row).map_err(|e| Self::corrupt(&path, e))?;
            bars.insert(bar.timestamp, bar);
        }
        Ok(bars)
    }

    /// Write the merged series then its sidecar, atomically per key.
    fn write_series(
        &self,
        key: &SeriesKey,
        bars: &BTreeMap<DateTime<Utc>, BarRecord>,
    ) -> Result<(), StoreError> {
        let dir = self.series_dir(key);
        fs::create_dir_all(&dir).map_err(|e| Self::io_err(&dir, e))?;

        let path = self.series_path(key);
        let tmp = path.with_extension("csv.tmp");

        let mut writer = csv::Writer::from_path(&tmp).map_err(|e| Self::io_err(&tmp, e))?;
        writer
            .write_record(CANONICAL_HEADER)
            .map_err(|e| Self::io_err(&tmp, e))?;
        for bar in bars.values() {
            writer
                .write_record(serialize_bar(bar))
                .map_err(|e| Self::io_err(&tmp, e))?;
        }
        writer.flush().map_err(|e| Self::io_err(&tmp, e))?;
        drop(writer);

        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Self::io_err(&path, e)
        })?;

        let meta = SeriesMeta {
            key: key.clone(),
            count: bars.len(),
            start: *bars.keys().next().expect("non-empty series"),
            end: *bars.keys().next_back().expect("non-empty series"),
        };
        let meta_path = self.meta_path(key);
        let json = serde_json::to_string_pretty(&meta).map_err(|e| Self::io_err(&meta_path, e))?;
        fs::write(&meta_path, json).map_err(|e| Self::io_err(&meta_path, e))?;

        Ok(())
    }

    fn read_meta(path: &Path) -> Result<SeriesMeta, StoreError> {
        let contents = fs::read_to_string(path).map_err(|e| Self::io_err(path, e))?;
        serde_json::from_str(&contents).map_err(|e| Self::corrupt(path, e))
    }
}

impl BarStore for CsvStore {
    fn overviews(&self) -> Result<Vec<SeriesOverview>, StoreError> {
        let mut overviews = Vec::new();

        for interval in BAR_INTERVALS {
            let interval_dir = self.root.join(interval.as_str());
            if !interval_dir.is_dir() {
                continue;
            }

            let entries =
                fs::read_dir(&interval_dir).map_err(|e| Self::io_err(&interval_dir, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| Self::io_err(&interval_dir, e))?;
                let exchange_dir = entry.path();

                // Stray files and unknown venue dirs are not series data.
                let Some(name) = exchange_dir.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if !exchange_dir.is_dir() || Exchange::from_str(name).is_err() {
                    continue;
                }

                let files =
                    fs::read_dir(&exchange_dir).map_err(|e| Self::io_err(&exchange_dir, e))?;
                for file in files {
                    let file = file.map_err(|e| Self::io_err(&exchange_dir, e))?;
                    let path = file.path();
                    if path
                        .to_str()
                        .is_some_and(|p| p.ends_with(".meta.json"))
                    {
                        let meta = Self::read_meta(&path)?;
                        overviews.push(SeriesOverview {
                            key: meta.key,
                            count: meta.count,
                            start: meta.start,
                            end: meta.end,
                        });
                    }
                }
            }
        }

        // Directory iteration order is platform-dependent; keep it stable.
        overviews.sort_by(|a, b| {
            (a.key.interval, a.key.exchange, &a.key.symbol).cmp(&(
                b.key.interval,
                b.key.exchange,
                &b.key.symbol,
            ))
        });
        Ok(overviews)
    }

    fn query(
        &self,
        key: &SeriesKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BarRecord>, StoreError> {
        Self::check_symbol(key)?;
        let bars = self.load_series(key)?;
        Ok(bars.range(start..end).map(|(_, b)| b.clone()).collect())
    }

    fn upsert(&self, key: &SeriesKey, records: Vec<BarRecord>) -> Result<usize, StoreError> {
        Self::check_symbol(key)?;
        let batch = dedupe_batch(records);
        let written = batch.len();
        if written == 0 {
            return Ok(0);
        }

        let mut bars = self.load_series(key)?;
        bars.extend(batch);
        self.write_series(key, &bars)?;
        Ok(written)
    }

    fn delete(&self, key: &SeriesKey) -> Result<usize, StoreError> {
        Self::check_symbol(key)?;
        let meta_path = self.meta_path(key);
        if !meta_path.exists() {
            return Ok(0);
        }
        let meta = Self::read_meta(&meta_path)?;

        let path = self.series_path(key);
        fs::remove_file(&path).map_err(|e| Self::io_err(&path, e))?;
        fs::remove_file(&meta_path).map_err(|e| Self::io_err(&meta_path, e))?;
        Ok(meta.count)
    }
}
