use chrono::NaiveDate;
use thiserror::Error;

/// Failures raised by a snapshot store implementation. Report computations
/// propagate these untouched; they never degrade into partial results.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("malformed {context} row: {message}")]
    MalformedRow { context: &'static str, message: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}
