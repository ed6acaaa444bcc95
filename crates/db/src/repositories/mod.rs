pub mod opportunity;
pub mod snapshot;

use std::str::FromStr;

use pipecast_core::StoreError;
use rust_decimal::Decimal;

pub use opportunity::{NewOpportunity, SqlOpportunityRepository};
pub use snapshot::{BatchSummary, NewBatch, NewSnapshot, SqlSnapshotRepository};

pub(crate) fn db_error(error: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("database error: {error}"))
}

pub(crate) fn parse_decimal_opt(
    context: &'static str,
    value: Option<String>,
) -> Result<Option<Decimal>, StoreError> {
    value
        .map(|raw| {
            Decimal::from_str(raw.trim()).map_err(|error| StoreError::MalformedRow {
                context,
                message: format!("invalid decimal `{raw}`: {error}"),
            })
        })
        .transpose()
}
