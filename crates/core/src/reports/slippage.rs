//! Date slippage: drift of the forecast close date while a deal sits in a
//! stage. This is forecast drift, not calendar drift; a deal that keeps its
//! promised close date while aging contributes zero slippage.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::fiscal;
use crate::stage;

use super::{round1, round3, DealHistory};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlippageWorstCase {
    pub opportunity_name: String,
    pub slippage_days: f64,
    pub value: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StageSlippageRow {
    pub stage: String,
    pub avg_slippage_days: f64,
    pub window_count: usize,
    pub worst_case: Option<SlippageWorstCase>,
    /// Among windows whose first forecast fell in a fiscal quarter-end
    /// month, the fraction whose final forecast landed in a different
    /// fiscal quarter. `None` when no window started at a quarter end.
    pub quarter_end_slippage_rate: Option<f64>,
}

struct StageForecastWindow {
    opportunity_name: String,
    first_forecast: NaiveDate,
    last_forecast: NaiveDate,
    value: Option<Decimal>,
}

impl StageForecastWindow {
    fn slippage_days(&self) -> f64 {
        (self.last_forecast - self.first_forecast).num_days() as f64
    }
}

/// Per-stage forecast drift. A window is one (opportunity, stage) pair with
/// at least two dated forecasts inside that stage; closed stages carry no
/// forecast to drift and are excluded. Case variants of one stage fold into
/// one row under the first-seen spelling. Negative and zero slippage stay in
/// the averages (forecasts also improve) but never become the worst case.
pub fn date_slippage_report(deals: &[DealHistory]) -> Vec<StageSlippageRow> {
    let mut windows: HashMap<String, (String, Vec<StageForecastWindow>)> = HashMap::new();

    for deal in deals {
        let dated: Vec<_> = deal
            .history
            .snapshots
            .iter()
            .filter(|snap| snap.close_date.is_some() && snap.stage.is_some())
            .collect();
        if dated.len() < 2 {
            continue;
        }

        // BTreeMap keeps per-stage discovery deterministic for equal input.
        let mut per_stage: BTreeMap<String, (String, Vec<&crate::domain::SnapshotRecord>)> =
            BTreeMap::new();
        for snap in dated {
            let label = snap.stage.as_deref().expect("stage present");
            if stage::is_closed(label) {
                continue;
            }
            let (_, snaps) = per_stage
                .entry(stage::fold(label))
                .or_insert_with(|| (label.trim().to_string(), Vec::new()));
            snaps.push(snap);
        }

        for (key, (display, snaps)) in per_stage {
            if snaps.len() < 2 {
                continue;
            }
            let first = snaps.first().expect("non-empty");
            let last = snaps.last().expect("non-empty");
            let (_, stage_windows) = windows.entry(key).or_insert_with(|| (display, Vec::new()));
            stage_windows.push(StageForecastWindow {
                opportunity_name: deal.opportunity.name.clone(),
                first_forecast: first.close_date.expect("dated"),
                last_forecast: last.close_date.expect("dated"),
                value: last.annualized_value,
            });
        }
    }

    let mut rows: Vec<StageSlippageRow> = windows
        .into_values()
        .map(|(stage, windows)| {
            let count = windows.len();
            let avg = windows.iter().map(StageForecastWindow::slippage_days).sum::<f64>()
                / count as f64;

            let worst_case = windows
                .iter()
                .filter(|w| w.slippage_days() > 0.0)
                .max_by(|a, b| {
                    a.slippage_days()
                        .partial_cmp(&b.slippage_days())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|w| SlippageWorstCase {
                    opportunity_name: w.opportunity_name.clone(),
                    slippage_days: w.slippage_days(),
                    value: w.value,
                });

            let quarter_end: Vec<_> = windows
                .iter()
                .filter(|w| fiscal::is_quarter_end_month(w.first_forecast))
                .collect();
            let quarter_end_slippage_rate = if quarter_end.is_empty() {
                None
            } else {
                let slipped = quarter_end
                    .iter()
                    .filter(|w| {
                        fiscal::fiscal_period(w.first_forecast)
                            != fiscal::fiscal_period(w.last_forecast)
                    })
                    .count();
                Some(round3(slipped as f64 / quarter_end.len() as f64))
            };

            StageSlippageRow {
                stage,
                avg_slippage_days: round1(avg),
                window_count: count,
                worst_case,
                quarter_end_slippage_rate,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.avg_slippage_days
            .partial_cmp(&a.avg_slippage_days)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{date, deal, observed};
    use super::date_slippage_report;

    #[test]
    fn slippage_is_last_minus_first_forecast_within_a_stage() {
        let deals = vec![deal(
            1,
            "Alpha",
            None,
            vec![
                observed(date(2024, 2, 1), "Discover").closing(date(2024, 5, 15)).value(100),
                observed(date(2024, 2, 15), "Discover").closing(date(2024, 6, 5)).value(120),
                observed(date(2024, 3, 1), "Proposal").closing(date(2024, 6, 5)),
            ],
        )];

        let rows = date_slippage_report(&deals);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stage, "Discover");
        assert_eq!(rows[0].avg_slippage_days, 21.0);
        assert_eq!(rows[0].window_count, 1);
        let worst = rows[0].worst_case.as_ref().expect("worst case");
        assert_eq!(worst.opportunity_name, "Alpha");
        assert_eq!(worst.slippage_days, 21.0);
        assert_eq!(worst.value, Some(120.into()));
    }

    #[test]
    fn improving_forecasts_lower_the_average_but_never_become_worst_case() {
        let deals = vec![
            deal(
                1,
                "Slips",
                None,
                vec![
                    observed(date(2024, 2, 1), "Discover").closing(date(2024, 5, 1)),
                    observed(date(2024, 2, 15), "Discover").closing(date(2024, 5, 11)),
                ],
            ),
            deal(
                2,
                "Improves",
                None,
                vec![
                    observed(date(2024, 2, 1), "Discover").closing(date(2024, 5, 1)),
                    observed(date(2024, 2, 15), "Discover").closing(date(2024, 4, 21)),
                ],
            ),
        ];

        let rows = date_slippage_report(&deals);
        assert_eq!(rows[0].window_count, 2);
        // (10 + -10) / 2
        assert_eq!(rows[0].avg_slippage_days, 0.0);
        assert_eq!(rows[0].worst_case.as_ref().expect("worst").opportunity_name, "Slips");
    }

    #[test]
    fn quarter_end_rate_counts_fiscal_quarter_crossings() {
        let deals = vec![
            // First forecast in April (fiscal Q1 end month), drifts into May (Q2).
            deal(
                1,
                "Crosses",
                None,
                vec![
                    observed(date(2024, 3, 1), "Proposal").closing(date(2024, 4, 25)),
                    observed(date(2024, 3, 15), "Proposal").closing(date(2024, 5, 10)),
                ],
            ),
            // First forecast in April, stays in April.
            deal(
                2,
                "Holds",
                None,
                vec![
                    observed(date(2024, 3, 1), "Proposal").closing(date(2024, 4, 5)),
                    observed(date(2024, 3, 15), "Proposal").closing(date(2024, 4, 20)),
                ],
            ),
        ];

        let rows = date_slippage_report(&deals);
        assert_eq!(rows[0].quarter_end_slippage_rate, Some(0.5));
    }

    #[test]
    fn quarter_end_rate_is_absent_without_quarter_end_forecasts() {
        let deals = vec![deal(
            1,
            "MidQuarter",
            None,
            vec![
                observed(date(2024, 2, 1), "Discover").closing(date(2024, 3, 1)),
                observed(date(2024, 2, 15), "Discover").closing(date(2024, 3, 20)),
            ],
        )];

        let rows = date_slippage_report(&deals);
        assert_eq!(rows[0].quarter_end_slippage_rate, None);
    }

    #[test]
    fn case_variants_of_one_stage_fold_into_one_row() {
        let deals = vec![
            deal(
                1,
                "Mixed",
                None,
                vec![
                    observed(date(2024, 2, 1), "Proposal").closing(date(2024, 5, 1)),
                    observed(date(2024, 2, 15), "PROPOSAL").closing(date(2024, 5, 21)),
                ],
            ),
            deal(
                2,
                "Lower",
                None,
                vec![
                    observed(date(2024, 3, 1), "proposal").closing(date(2024, 6, 1)),
                    observed(date(2024, 3, 15), "proposal").closing(date(2024, 6, 11)),
                ],
            ),
        ];

        let rows = date_slippage_report(&deals);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stage, "Proposal");
        assert_eq!(rows[0].window_count, 2);
        // (20 + 10) / 2
        assert_eq!(rows[0].avg_slippage_days, 15.0);
    }

    #[test]
    fn closed_stages_and_sparse_forecasts_contribute_nothing() {
        let deals = vec![
            deal(
                1,
                "ClosedOnly",
                None,
                vec![
                    observed(date(2024, 1, 1), "Closed Won").closing(date(2024, 1, 1)),
                    observed(date(2024, 2, 1), "Closed Won").closing(date(2024, 1, 1)),
                ],
            ),
            deal(
                2,
                "OneForecast",
                None,
                vec![
                    observed(date(2024, 1, 1), "Discover").closing(date(2024, 3, 1)),
                    observed(date(2024, 2, 1), "Discover"),
                ],
            ),
        ];

        assert!(date_slippage_report(&deals).is_empty());
    }
}
