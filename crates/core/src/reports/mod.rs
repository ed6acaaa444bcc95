//! One module per analytic table. Each aggregator is a pure function over
//! reconstructed per-opportunity histories; missing per-row data drops the
//! row from the specific computation that needed it, and an empty input
//! always yields an empty table.

pub mod closing;
pub mod duplicates;
pub mod dwell;
pub mod loss;
pub mod slippage;
pub mod validation;
pub mod value_change;

use rust_decimal::Decimal;

use crate::domain::Opportunity;
use crate::history::OpportunityHistory;

/// One opportunity with its reconstructed timeline, the unit every
/// aggregator consumes.
#[derive(Clone, Debug)]
pub struct DealHistory {
    pub opportunity: Opportunity,
    pub history: OpportunityHistory,
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

pub(crate) fn decimal_avg(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        (total / Decimal::from(count as i64)).round_dp(2)
    }
}
