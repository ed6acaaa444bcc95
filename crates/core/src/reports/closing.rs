//! Closing probability: for deals that eventually closed, win rate per
//! non-terminal stage the deal was ever observed in.

use serde::Serialize;

use crate::settings::ReportSettings;
use crate::stage;

use super::{round1, DealHistory};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClosingProbabilityRow {
    pub stage: String,
    pub deals: usize,
    pub won: usize,
    pub lost: usize,
    pub win_rate_pct: f64,
    /// Currently mirrors the win rate. The upstream definition of
    /// conversion-to-next-stage was identical to win rate; kept as-is
    /// pending a real stage-to-stage statistic.
    pub conversion_to_next_pct: f64,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FinalOutcome {
    Won,
    Lost,
}

/// Restricts to opportunities whose most recent staged snapshot is a closed
/// stage, then counts each configured pipeline stage the deal ever visited
/// toward that stage's deal/won/lost tallies. Rows follow the configured
/// pipeline order.
pub fn closing_probability_report(
    deals: &[DealHistory],
    settings: &ReportSettings,
) -> Vec<ClosingProbabilityRow> {
    let stages = settings.pipeline_stages();
    let mut tallies = vec![(0usize, 0usize, 0usize); stages.len()];

    for deal in deals {
        let Some(outcome) = final_outcome(deal) else {
            continue;
        };

        for (index, pipeline_stage) in stages.iter().enumerate() {
            let visited = deal.history.snapshots.iter().any(|snap| {
                snap.stage.as_deref().is_some_and(|label| stage::same_stage(label, pipeline_stage))
            });
            if !visited {
                continue;
            }
            let (deals_count, won, lost) = &mut tallies[index];
            *deals_count += 1;
            match outcome {
                FinalOutcome::Won => *won += 1,
                FinalOutcome::Lost => *lost += 1,
            }
        }
    }

    stages
        .iter()
        .zip(tallies)
        .map(|(stage, (deals, won, lost))| {
            let win_rate_pct =
                if deals == 0 { 0.0 } else { round1(won as f64 / deals as f64 * 100.0) };
            ClosingProbabilityRow {
                stage: stage.clone(),
                deals,
                won,
                lost,
                win_rate_pct,
                conversion_to_next_pct: win_rate_pct,
            }
        })
        .collect()
}

fn final_outcome(deal: &DealHistory) -> Option<FinalOutcome> {
    let label = deal.history.latest_staged()?.stage.as_deref().expect("staged");
    if !stage::is_closed(label) {
        return None;
    }
    if stage::is_won(label) {
        Some(FinalOutcome::Won)
    } else if stage::is_lost(label) {
        Some(FinalOutcome::Lost)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::settings::ReportSettings;

    use super::super::testutil::{date, deal, observed};
    use super::closing_probability_report;

    #[test]
    fn win_rate_counts_every_visited_pipeline_stage() {
        let deals = vec![
            deal(
                1,
                "Winner",
                None,
                vec![
                    observed(date(2024, 1, 1), "Discover"),
                    observed(date(2024, 2, 1), "Proposal"),
                    observed(date(2024, 3, 1), "Closed Won"),
                ],
            ),
            deal(
                2,
                "Loser",
                None,
                vec![
                    observed(date(2024, 1, 1), "Discover"),
                    observed(date(2024, 2, 1), "Closed Lost"),
                ],
            ),
        ];

        let rows = closing_probability_report(&deals, &ReportSettings::default());
        let discover = rows.iter().find(|r| r.stage == "Discover").expect("discover");
        assert_eq!(discover.deals, 2);
        assert_eq!(discover.won, 1);
        assert_eq!(discover.lost, 1);
        assert_eq!(discover.win_rate_pct, 50.0);

        let proposal = rows.iter().find(|r| r.stage == "Proposal").expect("proposal");
        assert_eq!(proposal.deals, 1);
        assert_eq!(proposal.win_rate_pct, 100.0);
    }

    #[test]
    fn open_deals_are_excluded() {
        let deals = vec![deal(
            1,
            "Open",
            None,
            vec![
                observed(date(2024, 1, 1), "Discover"),
                observed(date(2024, 2, 1), "Proposal"),
            ],
        )];

        let rows = closing_probability_report(&deals, &ReportSettings::default());
        assert!(rows.iter().all(|r| r.deals == 0));
    }

    #[test]
    fn rows_follow_the_configured_pipeline_order() {
        let rows = closing_probability_report(&[], &ReportSettings::default());
        let stages: Vec<&str> = rows.iter().map(|r| r.stage.as_str()).collect();
        assert_eq!(
            stages,
            ["Introduction", "Discover", "Validation", "Proposal", "Negotiation/Review"]
        );
    }

    #[test]
    fn conversion_to_next_mirrors_win_rate() {
        let deals = vec![deal(
            1,
            "Winner",
            None,
            vec![
                observed(date(2024, 1, 1), "Discover"),
                observed(date(2024, 2, 1), "Closed Won"),
            ],
        )];

        let rows = closing_probability_report(&deals, &ReportSettings::default());
        for row in rows {
            assert_eq!(row.win_rate_pct, row.conversion_to_next_pct);
        }
    }
}
