//! Report orchestration: load rows, reconstruct per-opportunity histories,
//! run one aggregator, return the flat table.
//!
//! Each report is a single pass over data resolved once at the start of the
//! request; in particular the duplicate report resolves "latest batch" one
//! time and feeds the resolved date into everything downstream.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::{Opportunity, OpportunityId, SnapshotRecord};
use crate::errors::ReportError;
use crate::history::reconstruct;
use crate::reports::closing::{closing_probability_report, ClosingProbabilityRow};
use crate::reports::duplicates::{duplicate_account_report, DuplicateAccountGroup};
use crate::reports::dwell::{stage_dwell_report, StageDwellRow};
use crate::reports::loss::{loss_reason_report, LossGrouping, LossReasonReport};
use crate::reports::slippage::{date_slippage_report, StageSlippageRow};
use crate::reports::validation::{validation_conversion_report, ValidationConversionReport};
use crate::reports::value_change::{value_change_report, ValueChangeRow};
use crate::reports::DealHistory;
use crate::settings::ReportSettings;
use crate::store::{DateRange, SnapshotStore};

pub struct ReportService<S> {
    store: S,
    settings: ReportSettings,
}

impl<S: SnapshotStore> ReportService<S> {
    pub fn new(store: S, settings: ReportSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    pub fn replace_settings(&mut self, settings: ReportSettings) {
        self.settings = settings;
    }

    pub async fn stage_dwell(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<StageDwellRow>, ReportError> {
        let deals = self.load_deals(range).await?;
        Ok(stage_dwell_report(&deals))
    }

    pub async fn date_slippage(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<StageSlippageRow>, ReportError> {
        let deals = self.load_deals(range).await?;
        Ok(date_slippage_report(&deals))
    }

    pub async fn validation_conversion(
        &self,
        range: Option<DateRange>,
        as_of: NaiveDate,
    ) -> Result<ValidationConversionReport, ReportError> {
        let deals = self.load_deals(range).await?;
        Ok(validation_conversion_report(&deals, as_of, &self.settings))
    }

    pub async fn closing_probability(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<ClosingProbabilityRow>, ReportError> {
        let deals = self.load_deals(range).await?;
        Ok(closing_probability_report(&deals, &self.settings))
    }

    /// The optional range filters on close dates inside the aggregator, so
    /// the full snapshot history is always loaded here.
    pub async fn loss_reasons(
        &self,
        grouping: LossGrouping,
        close_date_range: Option<DateRange>,
    ) -> Result<LossReasonReport, ReportError> {
        let deals = self.load_deals(None).await?;
        Ok(loss_reason_report(&deals, grouping, close_date_range))
    }

    pub async fn value_change(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<ValueChangeRow>, ReportError> {
        let deals = self.load_deals(range).await?;
        Ok(value_change_report(&deals, &self.settings))
    }

    /// Resolves the most recent batch at or before `as_of` once and treats
    /// its snapshots as the current state of the world. An empty table is an
    /// empty report, not an error.
    pub async fn duplicate_accounts(
        &self,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<DuplicateAccountGroup>, ReportError> {
        let Some(batch_date) = self.store.latest_batch_date(as_of).await? else {
            return Ok(Vec::new());
        };
        let range = DateRange { start: batch_date, end: batch_date };
        let deals = self.load_deals(Some(range)).await?;
        Ok(duplicate_account_report(&deals, batch_date))
    }

    async fn load_deals(&self, range: Option<DateRange>) -> Result<Vec<DealHistory>, ReportError> {
        let snapshots = self.store.list_snapshots(range).await?;
        let opportunities: HashMap<OpportunityId, Opportunity> = self
            .store
            .list_opportunities()
            .await?
            .into_iter()
            .map(|opportunity| (opportunity.id, opportunity))
            .collect();

        let mut grouped: HashMap<OpportunityId, Vec<SnapshotRecord>> = HashMap::new();
        for snapshot in snapshots {
            grouped.entry(snapshot.opportunity_id).or_default().push(snapshot);
        }

        let mut deals: Vec<DealHistory> = grouped
            .into_iter()
            .filter_map(|(id, snapshots)| {
                // Snapshots with no owning opportunity row are orphans the
                // persistence layer should prevent; degrade by skipping.
                let opportunity = opportunities.get(&id)?.clone();
                Some(DealHistory { opportunity, history: reconstruct(snapshots, &self.settings) })
            })
            .collect();
        deals.sort_by(|a, b| a.opportunity.id.cmp(&b.opportunity.id));
        Ok(deals)
    }
}
