//! The storage collaborator interface and an in-memory implementation.
//!
//! Pipelines read and write bars only through [`BarStore`]; the concrete
//! engine behind it is swappable (in-memory for tests, CSV tree on disk,
//! or something external). Every call is logically atomic per series key;
//! no multi-key transactions exist and the core never retries.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

use crate::domain::{BarRecord, SeriesKey, SeriesOverview};

/// A storage collaborator failure, surfaced to the caller unmodified.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O at {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    #[error("corrupt store file {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Narrow read/write contract over the series store.
pub trait BarStore: Send + Sync {
    /// Summaries of every stored bar series.
    fn overviews(&self) -> Result<Vec<SeriesOverview>, StoreError>;

    /// Bars in `[start, end)` for one series, ascending timestamp.
    /// Both bounds are in the canonical internal timezone (UTC).
    fn query(
        &self,
        key: &SeriesKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BarRecord>, StoreError>;

    /// Merge an ordered batch into the series, last-write-wins on duplicate
    /// timestamps. Idempotent: re-upserting the same batch changes nothing.
    /// Returns the number of distinct rows the batch wrote.
    fn upsert(&self, key: &SeriesKey, records: Vec<BarRecord>) -> Result<usize, StoreError>;

    /// Remove the whole series; returns the number of records deleted.
    fn delete(&self, key: &SeriesKey) -> Result<usize, StoreError>;
}

/// Collapse a batch to one record per timestamp, last write winning.
pub(crate) fn dedupe_batch(records: Vec<BarRecord>) -> BTreeMap<DateTime<Utc>, BarRecord> {
    let mut batch = BTreeMap::new();
    for record in records {
        batch.insert(record.timestamp, record);
    }
    batch
}

/// Heap-backed store for tests and scratch sessions. Nothing persists.
#[derive(Default)]
pub struct MemoryStore {
    series: Mutex<HashMap<SeriesKey, BTreeMap<DateTime<Utc>, BarRecord>>>,
}

impl BarStore for MemoryStore {
    fn overviews(&self) -> Result<Vec<SeriesOverview>, StoreError> {
        let series = self.series.lock().expect("store lock poisoned");
        let mut overviews: Vec<SeriesOverview> = series
            .iter()
            .filter(|(_, bars)| !bars.is_empty())
            .map(|(key, bars)| SeriesOverview {
                key: key.clone(),
                count: bars.len(),
                start: *bars.keys().next().expect("non-empty"),
                end: *bars.keys().next_back().expect("non-empty"),
            })
            .collect();
        // HashMap iteration order is arbitrary; keep listings stable.
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
        let series = self.series.lock().expect("store lock poisoned");
        Ok(series
            .get(key)
            .map(|bars| bars.range(start..end).map(|(_, b)| b.clone()).collect())
            .unwrap_or_default())
    }

    fn upsert(&self, key: &SeriesKey, records: Vec<BarRecord>) -> Result<usize, StoreError> {
        let batch = dedupe_batch(records);
        let written = batch.len();
        let mut series = self.series.lock().expect("store lock poisoned");
        series.entry(key.clone()).or_default().extend(batch);
        Ok(written)
    }

    fn delete(&self, key: &SeriesKey) -> Result<usize, StoreError> {
        let mut series = self.series.lock().expect("store lock poisoned");
        Ok(series.remove(key).map(|bars| bars.len()).unwrap_or(0))
    }
}
