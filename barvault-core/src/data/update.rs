//! Download orchestrators: fetch one series on demand, or refresh every
//! stored series from its last stored timestamp onward.
//!
//! During a bulk refresh, per-series failures are collected rather than
//! fatal: one dead symbol should not stop the rest of the refresh.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use super::provider::{HistoryProvider, ProviderError};
use super::store::{BarStore, StoreError};
use crate::domain::{Interval, SeriesKey};

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Progress callbacks for a multi-series update.
pub trait UpdateProgress: Send {
    fn on_start(&self, key: &SeriesKey, index: usize, total: usize);

    fn on_complete(
        &self,
        key: &SeriesKey,
        index: usize,
        total: usize,
        result: &Result<usize, UpdateError>,
    );

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that prints to stdout.
pub struct StdoutProgress;

impl UpdateProgress for StdoutProgress {
    fn on_start(&self, key: &SeriesKey, index: usize, total: usize) {
        println!("[{}/{}] Updating {key}...", index + 1, total);
    }

    fn on_complete(
        &self,
        key: &SeriesKey,
        _index: usize,
        _total: usize,
        result: &Result<usize, UpdateError>,
    ) {
        match result {
            Ok(written) => println!("  OK: {key}: {written} bars"),
            Err(e) => println!("  FAIL: {key}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nUpdate complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Summary of a batch update.
#[derive(Debug)]
pub struct UpdateSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub bars_written: usize,
    pub errors: Vec<(SeriesKey, UpdateError)>,
}

impl UpdateSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Refresh every stored bar series from its last stored timestamp onward.
///
/// Cancellation is checked between series; the series currently updating
/// runs to completion.
pub fn update_all(
    store: &dyn BarStore,
    provider: &dyn HistoryProvider,
    progress: &dyn UpdateProgress,
    cancel: &AtomicBool,
) -> Result<UpdateSummary, StoreError> {
    let overviews = store.overviews()?;
    let total = overviews.len();

    let mut succeeded = 0;
    let mut failed = 0;
    let mut bars_written = 0;
    let mut errors: Vec<(SeriesKey, UpdateError)> = Vec::new();

    for (i, overview) in overviews.into_iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            break;
        }

        progress.on_start(&overview.key, i, total);
        let result = update_single(store, provider, &overview.key, overview.end);
        progress.on_complete(&overview.key, i, total, &result);

        match result {
            Ok(written) => {
                succeeded += 1;
                bars_written += written;
            }
            Err(e) => {
                errors.push((overview.key, e));
                failed += 1;
            }
        }
    }

    progress.on_batch_complete(succeeded, failed, total);

    Ok(UpdateSummary {
        total,
        succeeded,
        failed,
        bars_written,
        errors,
    })
}

/// Fetch one series from `start` onward and store it.
///
/// The series need not be stored already, so this is how a new symbol
/// enters the store from a provider. Bar intervals are upserted and the
/// distinct row count returned; a tick request is forwarded to the
/// provider, which manages tick data itself and reports back only the
/// count fetched.
pub fn download_series(
    store: &dyn BarStore,
    provider: &dyn HistoryProvider,
    key: &SeriesKey,
    start: DateTime<Utc>,
) -> Result<usize, UpdateError> {
    if key.interval == Interval::Tick {
        return Ok(provider.download_tick_data(&key.symbol, key.exchange, start)?);
    }
    update_single(store, provider, key, start)
}

fn update_single(
    store: &dyn BarStore,
    provider: &dyn HistoryProvider,
    key: &SeriesKey,
    start: DateTime<Utc>,
) -> Result<usize, UpdateError> {
    let mut bars = provider.download_bar_data(key, start)?;
    if bars.is_empty() {
        return Ok(0);
    }
    bars.sort_by_key(|b| b.timestamp);
    Ok(store.upsert(key, bars)?)
}
