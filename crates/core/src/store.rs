use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Opportunity, OpportunityId, SnapshotRecord};
use crate::errors::{ReportError, StoreError};

/// Inclusive snapshot-date bounds for a report request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReportError> {
        if start > end {
            return Err(ReportError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Read access to opportunity and snapshot rows. The engine is read-only;
/// ingest and reset live behind the concrete repository, not this trait.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn list_snapshots_for(
        &self,
        opportunity_id: OpportunityId,
    ) -> Result<Vec<SnapshotRecord>, StoreError>;

    /// Bulk read for whole-table reports, optionally bounded by snapshot date.
    async fn list_snapshots(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<SnapshotRecord>, StoreError>;

    /// Snapshot date of the most recent upload batch at or before the given
    /// date (or at all, when no bound is given). `None` on an empty table.
    async fn latest_batch_date(
        &self,
        at_or_before: Option<NaiveDate>,
    ) -> Result<Option<NaiveDate>, StoreError>;

    async fn list_opportunities(&self) -> Result<Vec<Opportunity>, StoreError>;

    async fn get_opportunity(
        &self,
        id: OpportunityId,
    ) -> Result<Option<Opportunity>, StoreError>;
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::errors::ReportError;

    use super::DateRange;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 3, 31)).expect("range");
        assert!(range.contains(date(2024, 1, 1)));
        assert!(range.contains(date(2024, 3, 31)));
        assert!(!range.contains(date(2024, 4, 1)));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let error = DateRange::new(date(2024, 3, 31), date(2024, 1, 1)).expect_err("inverted");
        assert!(matches!(error, ReportError::InvalidRange { .. }));
    }
}
