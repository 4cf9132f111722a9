//! Export pipeline — bounded store range out to canonical delimited text.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use super::error::PipelineError;
use super::parse::{serialize_bar, CANONICAL_HEADER};
use super::store::BarStore;
use crate::domain::SeriesKey;

/// Serializes a queried record range back to the canonical format.
pub struct ExportPipeline<'a> {
    store: &'a dyn BarStore,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(store: &'a dyn BarStore) -> Self {
        Self { store }
    }

    /// Serialize `[start, end)` to literal rows, ascending timestamp.
    ///
    /// Zero matching records is not an error: the export is just empty.
    /// Store failures propagate as [`PipelineError::Store`], never as a
    /// sink failure.
    pub fn run(
        &self,
        key: &SeriesKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &AtomicBool,
    ) -> Result<Vec<[String; 8]>, PipelineError> {
        let records = self.store.query(key, start, end)?;

        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            if cancel.load(Ordering::Relaxed) {
                return Err(PipelineError::Cancelled);
            }
            rows.push(serialize_bar(record));
        }
        Ok(rows)
    }

    /// Write the canonical header plus one row per record to `path`.
    ///
    /// Returns the number of data rows written. A destination that cannot
    /// be opened or written (locked by another process, unwritable
    /// directory) is [`PipelineError::SinkUnavailable`].
    pub fn write_csv(
        &self,
        key: &SeriesKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        path: &Path,
        cancel: &AtomicBool,
    ) -> Result<usize, PipelineError> {
        let rows = self.run(key, start, end, cancel)?;

        let sink = |e: &dyn std::fmt::Display| PipelineError::SinkUnavailable(e.to_string());

        let mut writer = csv::Writer::from_path(path).map_err(|e| sink(&e))?;
        writer.write_record(CANONICAL_HEADER).map_err(|e| sink(&e))?;
        for row in &rows {
            writer.write_record(row).map_err(|e| sink(&e))?;
        }
        writer.flush().map_err(|e| sink(&e))?;

        Ok(rows.len())
    }
}
