//! Operation-level pipeline errors.
//!
//! Row-local failures live in [`super::parse::ParseError`]; everything that
//! aborts a whole import or export run is a `PipelineError`. Nothing in the
//! core is logged-and-swallowed: every variant surfaces to the caller.

use std::path::PathBuf;
use thiserror::Error;

use super::parse::ParseError;
use super::store::StoreError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("cannot read {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("header is missing configured column(s): {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("row {row_number}: {cause}")]
    RowFailed {
        /// 1-based data row number (the header row is not counted).
        row_number: usize,
        #[source]
        cause: ParseError,
    },

    #[error("source file contains no data rows")]
    Empty,

    #[error("invalid import config: {0}")]
    InvalidConfig(String),

    #[error("cancelled before completion")]
    Cancelled,

    #[error("destination unavailable: {0}")]
    SinkUnavailable(String),

    /// A storage collaborator failure, propagated as-is.
    #[error(transparent)]
    Store(#[from] StoreError),
}
