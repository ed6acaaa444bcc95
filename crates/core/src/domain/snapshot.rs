use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::opportunity::OpportunityId;

/// One immutable, dated, full-state observation of an opportunity.
///
/// Stage, values, close date, and loss reason all come from free-text upload
/// columns and may be absent; a missing field excludes the row only from the
/// computations that need it, never from the dataset as a whole.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: i64,
    pub opportunity_id: OpportunityId,
    pub snapshot_date: NaiveDate,
    pub stage: Option<String>,
    pub annualized_value: Option<Decimal>,
    pub total_contract_value: Option<Decimal>,
    pub close_date: Option<NaiveDate>,
    pub loss_reason: Option<String>,
    pub entered_pipeline: Option<NaiveDate>,
}
