//! Value movement attributed to the stage a deal was leaving when its value
//! changed, across both monetary dimensions.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::settings::ReportSettings;
use crate::stage;

use super::{decimal_avg, round1, DealHistory};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValueChangeRow {
    pub stage: String,
    pub transition_count: usize,
    pub total_annualized_delta: Decimal,
    pub avg_annualized_delta: Decimal,
    /// Percent change relative to the summed originating annualized values;
    /// absent when that sum is zero.
    pub annualized_pct_change: Option<f64>,
    pub total_contract_delta: Decimal,
    pub avg_contract_delta: Decimal,
    pub contract_pct_change: Option<f64>,
}

#[derive(Default)]
struct DimensionTally {
    total_delta: Decimal,
    origin_sum: Decimal,
    samples: usize,
}

impl DimensionTally {
    fn record(&mut self, from: Option<Decimal>, to: Option<Decimal>) {
        let (Some(from), Some(to)) = (from, to) else {
            return;
        };
        self.total_delta += to - from;
        self.origin_sum += from;
        self.samples += 1;
    }

    fn pct_change(&self) -> Option<f64> {
        if self.origin_sum.is_zero() {
            return None;
        }
        let ratio = self.total_delta / self.origin_sum * Decimal::from(100);
        ratio.to_f64().map(round1)
    }
}

#[derive(Default)]
struct StageTally {
    transitions: usize,
    annualized: DimensionTally,
    contract: DimensionTally,
}

/// Walks adjacent snapshot pairs; whenever the stage changes and the
/// originating stage is not terminal, the value deltas are credited to the
/// originating stage. Rows are presented in the configured pipeline order,
/// with out-of-funnel stages appended in lexical order.
pub fn value_change_report(
    deals: &[DealHistory],
    settings: &ReportSettings,
) -> Vec<ValueChangeRow> {
    let mut tallies: HashMap<String, StageTally> = HashMap::new();

    for deal in deals {
        let staged: Vec<_> =
            deal.history.snapshots.iter().filter(|snap| snap.stage.is_some()).collect();
        for pair in staged.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let from_stage = from.stage.as_deref().expect("staged");
            let to_stage = to.stage.as_deref().expect("staged");
            if stage::same_stage(from_stage, to_stage) || stage::is_closed(from_stage) {
                continue;
            }

            let tally = tallies.entry(from_stage.to_string()).or_default();
            tally.transitions += 1;
            tally.annualized.record(from.annualized_value, to.annualized_value);
            tally.contract.record(from.total_contract_value, to.total_contract_value);
        }
    }

    let mut rows: Vec<ValueChangeRow> = tallies
        .into_iter()
        .map(|(stage, tally)| ValueChangeRow {
            stage,
            transition_count: tally.transitions,
            total_annualized_delta: tally.annualized.total_delta,
            avg_annualized_delta: decimal_avg(tally.annualized.total_delta, tally.annualized.samples),
            annualized_pct_change: tally.annualized.pct_change(),
            total_contract_delta: tally.contract.total_delta,
            avg_contract_delta: decimal_avg(tally.contract.total_delta, tally.contract.samples),
            contract_pct_change: tally.contract.pct_change(),
        })
        .collect();

    rows.sort_by(|a, b| match (settings.pipeline_position(&a.stage), settings.pipeline_position(&b.stage)) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.stage.cmp(&b.stage),
    });
    rows
}
