//! Data pipelines, catalog aggregation, and storage interfaces.

pub mod catalog;
pub mod csv_store;
pub mod error;
pub mod export;
pub mod import;
pub mod parse;
pub mod provider;
pub mod store;
pub mod update;

pub use catalog::{Catalog, ExchangeNode, IntervalNode};
pub use csv_store::CsvStore;
pub use error::PipelineError;
pub use export::ExportPipeline;
pub use import::{ColumnMap, ImportConfig, ImportPipeline, ImportReport};
pub use parse::{ParseError, RecordParser, CANONICAL_HEADER, TIMESTAMP_FORMAT};
pub use provider::{HistoryProvider, ProviderError};
pub use store::{BarStore, MemoryStore, StoreError};
pub use update::{
    download_series, update_all, StdoutProgress, UpdateError, UpdateProgress, UpdateSummary,
};
