//! Stage dwell time: how long deals sit in each stage before moving on.

use std::collections::HashMap;

use serde::Serialize;

use crate::stage;

use super::{round1, DealHistory};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StageDwellRow {
    pub stage: String,
    pub avg_days: f64,
    pub window_count: usize,
}

/// Averages the duration of closed occupancy windows per stage. Only
/// opportunities observed at least twice contribute; windows with
/// non-positive duration are artifacts of duplicate same-day uploads and are
/// discarded. Case variants of one stage share a row under the first-seen
/// spelling. Rows are sorted by average duration, longest first.
pub fn stage_dwell_report(deals: &[DealHistory]) -> Vec<StageDwellRow> {
    let mut durations: HashMap<String, (String, Vec<f64>)> = HashMap::new();

    for deal in deals {
        if deal.history.snapshots.len() < 2 {
            continue;
        }
        for window in &deal.history.windows {
            let Some(days) = window.duration_days() else {
                continue;
            };
            if days <= 0.0 {
                continue;
            }
            let (_, samples) = durations
                .entry(stage::fold(&window.stage))
                .or_insert_with(|| (window.stage.trim().to_string(), Vec::new()));
            samples.push(days);
        }
    }

    let mut rows: Vec<StageDwellRow> = durations
        .into_values()
        .map(|(stage, days)| {
            let count = days.len();
            let avg = days.iter().sum::<f64>() / count as f64;
            StageDwellRow { stage, avg_days: round1(avg), window_count: count }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.avg_days.partial_cmp(&a.avg_days).unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{date, deal, observed};
    use super::stage_dwell_report;

    #[test]
    fn averages_closed_windows_per_stage() {
        let deals = vec![
            deal(
                1,
                "Alpha",
                None,
                vec![
                    observed(date(2024, 1, 10), "Discover").value(100),
                    observed(date(2024, 3, 1), "Negotiation/Review").value(150),
                    observed(date(2024, 4, 15), "Closed Won").value(150),
                ],
            ),
            deal(
                2,
                "Beta",
                None,
                vec![
                    observed(date(2024, 2, 1), "Discover"),
                    observed(date(2024, 2, 11), "Proposal"),
                ],
            ),
        ];

        let rows = stage_dwell_report(&deals);

        let discover = rows.iter().find(|r| r.stage == "Discover").expect("discover row");
        // (51 + 10) / 2
        assert_eq!(discover.avg_days, 30.5);
        assert_eq!(discover.window_count, 2);

        let negotiation =
            rows.iter().find(|r| r.stage == "Negotiation/Review").expect("negotiation row");
        assert_eq!(negotiation.avg_days, 45.0);
        assert_eq!(negotiation.window_count, 1);
    }

    #[test]
    fn end_to_end_scenario_yields_51_days_in_discover() {
        let deals = vec![deal(
            1,
            "O1",
            None,
            vec![
                observed(date(2024, 1, 10), "Discover").value(100),
                observed(date(2024, 3, 1), "Negotiation/Review").value(150),
                observed(date(2024, 4, 15), "Closed Won").value(150),
            ],
        )];

        let rows = stage_dwell_report(&deals);
        let discover = rows.iter().find(|r| r.stage == "Discover").expect("discover row");
        assert_eq!(discover.avg_days, 51.0);
        assert_eq!(discover.window_count, 1);
    }

    #[test]
    fn open_final_windows_and_single_snapshots_are_excluded() {
        let deals = vec![
            deal(1, "Open", None, vec![observed(date(2024, 1, 1), "Discover")]),
            deal(
                2,
                "Still going",
                None,
                vec![
                    observed(date(2024, 1, 1), "Discover"),
                    observed(date(2024, 2, 1), "Proposal"),
                ],
            ),
        ];

        let rows = stage_dwell_report(&deals);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stage, "Discover");
    }

    #[test]
    fn same_day_duplicate_windows_are_discarded() {
        let deals = vec![deal(
            1,
            "Dup",
            None,
            vec![
                observed(date(2024, 1, 1), "Discover"),
                observed(date(2024, 1, 1), "Proposal"),
                observed(date(2024, 2, 1), "Closed Won"),
            ],
        )];

        let rows = stage_dwell_report(&deals);
        // The zero-length Discover window is dropped; Proposal keeps 31 days.
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stage, "Proposal");
        assert_eq!(rows[0].avg_days, 31.0);
    }

    #[test]
    fn sorted_by_average_descending() {
        let deals = vec![deal(
            1,
            "Multi",
            None,
            vec![
                observed(date(2024, 1, 1), "Discover"),
                observed(date(2024, 1, 5), "Proposal"),
                observed(date(2024, 3, 1), "Closed Won"),
            ],
        )];

        let rows = stage_dwell_report(&deals);
        assert_eq!(rows[0].stage, "Proposal");
        assert!(rows[0].avg_days >= rows[1].avg_days);
    }

    #[test]
    fn case_variants_of_one_stage_share_a_row() {
        let deals = vec![
            deal(
                1,
                "Lower",
                None,
                vec![
                    observed(date(2024, 1, 1), "Discover"),
                    observed(date(2024, 1, 11), "Proposal"),
                ],
            ),
            deal(
                2,
                "Upper",
                None,
                vec![
                    observed(date(2024, 1, 1), "DISCOVER"),
                    observed(date(2024, 1, 31), "Proposal"),
                ],
            ),
        ];

        let rows = stage_dwell_report(&deals);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stage, "Discover");
        assert_eq!(rows[0].window_count, 2);
        assert_eq!(rows[0].avg_days, 20.0);
    }

    #[test]
    fn empty_input_yields_empty_table() {
        assert!(stage_dwell_report(&[]).is_empty());
    }
}
