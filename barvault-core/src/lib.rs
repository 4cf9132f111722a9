//! Barvault Core — canonical price-bar datasets and the pipelines that feed them.
//!
//! This crate contains everything except the command surface:
//! - Domain types (bar records, series keys, overviews, venue/interval enums)
//! - Row-level record parsing and canonical serialization
//! - Import pipeline (delimited file → ordered UTC batch → store upsert)
//! - Export pipeline (store range query → canonical CSV)
//! - Catalog aggregation (flat overviews → interval/exchange/symbol tree)
//! - The `BarStore` trait plus in-memory and on-disk implementations
//! - The `HistoryProvider` trait and the bulk update orchestrator

pub mod data;
pub mod domain;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types that cross thread boundaries are Send + Sync.
    ///
    /// Pipelines are run off the interactive thread by callers that need
    /// responsiveness, so everything they produce must be movable.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::BarRecord>();
        require_sync::<domain::BarRecord>();
        require_send::<domain::SeriesKey>();
        require_sync::<domain::SeriesKey>();
        require_send::<domain::SeriesOverview>();
        require_sync::<domain::SeriesOverview>();
        require_send::<domain::Exchange>();
        require_sync::<domain::Exchange>();
        require_send::<domain::Interval>();
        require_sync::<domain::Interval>();

        require_send::<data::ImportConfig>();
        require_sync::<data::ImportConfig>();
        require_send::<data::ImportReport>();
        require_sync::<data::ImportReport>();
        require_send::<data::Catalog>();
        require_sync::<data::Catalog>();
        require_send::<data::MemoryStore>();
        require_sync::<data::MemoryStore>();
        require_send::<data::CsvStore>();
        require_sync::<data::CsvStore>();
    }
}
