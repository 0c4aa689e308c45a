use crate::domain::SeriesError;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the index store and its analytics.
///
/// Batch operations report `InsufficientData`, `InvalidOperation` and
/// `UnknownIndex` per index next to partial results; `InvalidRange` always
/// aborts the call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("no index data could be loaded")]
    DataUnavailable,

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("insufficient data for '{index}': need at least {required} observations, found {found}")]
    InsufficientData {
        index: String,
        required: usize,
        found: usize,
    },

    #[error("invalid operation on '{index}': {reason}")]
    InvalidOperation { index: String, reason: String },

    #[error("unknown index '{0}'")]
    UnknownIndex(String),

    #[error("invalid series: {0}")]
    InvalidSeries(#[from] SeriesError),

    #[error("export failed: {0}")]
    Export(String),
}
