//! Loss attribution: why deals were lost and which stage they were lost
//! from, weighted by count and value.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::stage;
use crate::store::DateRange;

use super::{round1, DealHistory};

pub const UNKNOWN_REASON: &str = "Unknown";
pub const UNKNOWN_STAGE: &str = "Unknown Stage";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossGrouping {
    Reason,
    ReasonAndStage,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LossReasonRow {
    pub reason: String,
    /// Populated for [`LossGrouping::ReasonAndStage`].
    pub previous_stage: Option<String>,
    pub deal_count: usize,
    pub total_value: Decimal,
    pub pct_of_total: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LossReasonReport {
    pub total_deals: usize,
    pub total_value: Decimal,
    pub rows: Vec<LossReasonRow>,
}

/// Groups closed-lost deals by loss reason, optionally subdivided by the
/// stage the deal was lost from (the chronologically last non-closed-lost
/// stage in its history). The date filter applies to the deal's recorded
/// close date, not the snapshot date; deals without a close date drop out of
/// a filtered report.
pub fn loss_reason_report(
    deals: &[DealHistory],
    grouping: LossGrouping,
    close_date_range: Option<DateRange>,
) -> LossReasonReport {
    let mut groups: BTreeMap<(String, Option<String>), (usize, Decimal)> = BTreeMap::new();
    let mut total_deals = 0usize;
    let mut total_value = Decimal::ZERO;

    for deal in deals {
        let Some(latest) = deal.history.latest_staged() else {
            continue;
        };
        if !stage::is_exactly(latest.stage.as_deref().expect("staged"), "Closed Lost") {
            continue;
        }
        if let Some(range) = close_date_range {
            match latest.close_date {
                Some(close_date) if range.contains(close_date) => {}
                _ => continue,
            }
        }

        let reason = latest
            .loss_reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(UNKNOWN_REASON)
            .to_string();
        let previous_stage = match grouping {
            LossGrouping::Reason => None,
            LossGrouping::ReasonAndStage => Some(lost_from_stage(deal)),
        };
        let value = latest.annualized_value.unwrap_or(Decimal::ZERO);

        total_deals += 1;
        total_value += value;
        let entry = groups.entry((reason, previous_stage)).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += value;
    }

    let mut rows: Vec<LossReasonRow> = groups
        .into_iter()
        .map(|((reason, previous_stage), (deal_count, value))| LossReasonRow {
            reason,
            previous_stage,
            deal_count,
            total_value: value,
            pct_of_total: if total_deals == 0 {
                0.0
            } else {
                round1(deal_count as f64 / total_deals as f64 * 100.0)
            },
        })
        .collect();
    rows.sort_by(|a, b| {
        b.deal_count.cmp(&a.deal_count).then_with(|| b.total_value.cmp(&a.total_value))
    });

    LossReasonReport { total_deals, total_value, rows }
}

/// The stage the deal was lost from: the chronologically last snapshot whose
/// stage is not closed-lost. Deals with no such history attribute to a
/// sentinel.
fn lost_from_stage(deal: &DealHistory) -> String {
    deal.history
        .snapshots
        .iter()
        .rev()
        .filter_map(|snap| snap.stage.as_deref())
        .find(|label| !stage::is_closed_lost(label))
        .unwrap_or(UNKNOWN_STAGE)
        .to_string()
}
