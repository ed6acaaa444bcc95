//! Conversion out of the validation/introduction stages: how often deals
//! that enter the early funnel move forward versus die there, plus the
//! roster of deals still sitting in it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::settings::ReportSettings;
use crate::stage;

use super::{round1, DealHistory};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationConversionReport {
    pub total_converted: usize,
    pub total_closed_lost: usize,
    pub conversion_rate_pct: f64,
    pub by_entry_stage: Vec<EntryStageRow>,
    pub still_in_validation: Vec<ValidationRosterRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntryStageRow {
    pub entry_stage: String,
    pub converted: usize,
    pub closed_lost: usize,
    pub conversion_rate_pct: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationRosterRow {
    pub opportunity_name: String,
    pub stage: String,
    pub entered_at: NaiveDate,
    pub days_in_stage: i64,
    pub value: Option<Decimal>,
}

enum Outcome {
    Converted,
    ClosedLost,
    StillIn { roster: ValidationRosterRow },
}

/// Walks each opportunity's sorted snapshots. The first qualifying stage
/// observation fixes the entry label; the first later non-qualifying
/// snapshot is the conversion event, classified closed-lost when that stage
/// carries both "closed" and "lost". Deals that never leave appear on the
/// roster with their age measured against `as_of`.
pub fn validation_conversion_report(
    deals: &[DealHistory],
    as_of: NaiveDate,
    settings: &ReportSettings,
) -> ValidationConversionReport {
    let mut total_converted = 0usize;
    let mut total_closed_lost = 0usize;
    let mut by_entry: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    let mut roster = Vec::new();

    for deal in deals {
        let Some((entry_stage, outcome)) = classify(deal, as_of) else {
            continue;
        };
        let counters = by_entry.entry(entry_stage).or_default();
        match outcome {
            Outcome::Converted => {
                total_converted += 1;
                counters.0 += 1;
            }
            Outcome::ClosedLost => {
                total_closed_lost += 1;
                counters.1 += 1;
            }
            Outcome::StillIn { roster: row } => roster.push(row),
        }
    }

    roster.sort_by(|a: &ValidationRosterRow, b: &ValidationRosterRow| {
        b.value.cmp(&a.value).then_with(|| b.days_in_stage.cmp(&a.days_in_stage))
    });
    roster.truncate(settings.roster_limit());

    let by_entry_stage = by_entry
        .into_iter()
        .filter(|(_, (converted, lost))| converted + lost > 0)
        .map(|(entry_stage, (converted, closed_lost))| EntryStageRow {
            entry_stage,
            converted,
            closed_lost,
            conversion_rate_pct: rate_pct(converted, closed_lost),
        })
        .collect();

    ValidationConversionReport {
        total_converted,
        total_closed_lost,
        conversion_rate_pct: rate_pct(total_converted, total_closed_lost),
        by_entry_stage,
        still_in_validation: roster,
    }
}

fn classify(deal: &DealHistory, as_of: NaiveDate) -> Option<(String, Outcome)> {
    let staged: Vec<_> =
        deal.history.snapshots.iter().filter(|snap| snap.stage.is_some()).collect();

    let entry_index = staged
        .iter()
        .position(|snap| stage::is_validation(snap.stage.as_deref().expect("staged")))?;
    let entry = staged[entry_index];
    let entry_stage = entry.stage.clone().expect("staged");

    for snap in &staged[entry_index + 1..] {
        let label = snap.stage.as_deref().expect("staged");
        if stage::is_validation(label) {
            continue;
        }
        let outcome =
            if stage::is_closed_lost(label) { Outcome::ClosedLost } else { Outcome::Converted };
        return Some((entry_stage, outcome));
    }

    let latest = staged.last().expect("entry exists");
    let roster = ValidationRosterRow {
        opportunity_name: deal.opportunity.name.clone(),
        stage: latest.stage.clone().expect("staged"),
        entered_at: entry.snapshot_date,
        days_in_stage: (as_of - entry.snapshot_date).num_days(),
        value: deal.history.latest_value(),
    };
    Some((entry_stage, Outcome::StillIn { roster }))
}

fn rate_pct(converted: usize, closed_lost: usize) -> f64 {
    let denominator = converted + closed_lost;
    if denominator == 0 {
        0.0
    } else {
        round1(converted as f64 / denominator as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::settings::ReportSettings;

    use super::super::testutil::{date, deal, observed};
    use super::validation_conversion_report;

    #[test]
    fn forward_moves_and_losses_are_classified_separately() {
        let deals = vec![
            deal(
                1,
                "Forward",
                None,
                vec![
                    observed(date(2024, 1, 1), "Validation"),
                    observed(date(2024, 2, 1), "Proposal"),
                ],
            ),
            deal(
                2,
                "Died",
                None,
                vec![
                    observed(date(2024, 1, 1), "Technical Validation"),
                    observed(date(2024, 2, 1), "Closed Lost"),
                ],
            ),
            deal(
                3,
                "Won from validation",
                None,
                vec![
                    observed(date(2024, 1, 1), "Validation"),
                    observed(date(2024, 2, 1), "Closed Won"),
                ],
            ),
        ];

        let report =
            validation_conversion_report(&deals, date(2024, 3, 1), &ReportSettings::default());
        assert_eq!(report.total_converted, 2);
        assert_eq!(report.total_closed_lost, 1);
        assert_eq!(report.conversion_rate_pct, 66.7);
    }

    #[test]
    fn entry_stage_label_is_the_first_qualifying_observation() {
        let deals = vec![deal(
            1,
            "Intro first",
            None,
            vec![
                observed(date(2024, 1, 1), "Introduction Call"),
                observed(date(2024, 1, 15), "Validation"),
                observed(date(2024, 2, 1), "Proposal"),
            ],
        )];

        let report =
            validation_conversion_report(&deals, date(2024, 3, 1), &ReportSettings::default());
        assert_eq!(report.by_entry_stage.len(), 1);
        assert_eq!(report.by_entry_stage[0].entry_stage, "Introduction Call");
        assert_eq!(report.by_entry_stage[0].converted, 1);
    }

    #[test]
    fn roster_lists_unconverted_deals_by_value_descending() {
        let deals = vec![
            deal(
                1,
                "Small",
                None,
                vec![observed(date(2024, 1, 10), "Validation").value(50)],
            ),
            deal(
                2,
                "Large",
                None,
                vec![observed(date(2024, 2, 1), "Validation").value(500)],
            ),
            deal(
                3,
                "NeverEntered",
                None,
                vec![observed(date(2024, 1, 1), "Discover").value(900)],
            ),
        ];

        let report =
            validation_conversion_report(&deals, date(2024, 3, 1), &ReportSettings::default());
        assert_eq!(report.still_in_validation.len(), 2);
        assert_eq!(report.still_in_validation[0].opportunity_name, "Large");
        assert_eq!(report.still_in_validation[0].days_in_stage, 29);
        assert_eq!(report.still_in_validation[1].opportunity_name, "Small");
        assert_eq!(report.still_in_validation[1].days_in_stage, 51);
    }

    #[test]
    fn roster_is_capped_by_the_configured_limit() {
        let settings = ReportSettings::from_toml_str("roster_limit = 1").expect("settings");

        let deals = vec![
            deal(1, "A", None, vec![observed(date(2024, 1, 1), "Validation").value(10)]),
            deal(2, "B", None, vec![observed(date(2024, 1, 1), "Validation").value(20)]),
        ];

        let report = validation_conversion_report(&deals, date(2024, 2, 1), &settings);
        assert_eq!(report.still_in_validation.len(), 1);
        assert_eq!(report.still_in_validation[0].opportunity_name, "B");
    }

    #[test]
    fn deals_that_never_qualify_are_ignored() {
        let deals = vec![deal(
            1,
            "Straight through",
            None,
            vec![
                observed(date(2024, 1, 1), "Discover"),
                observed(date(2024, 2, 1), "Closed Won"),
            ],
        )];

        let report =
            validation_conversion_report(&deals, date(2024, 3, 1), &ReportSettings::default());
        assert_eq!(report.total_converted, 0);
        assert_eq!(report.total_closed_lost, 0);
        assert_eq!(report.conversion_rate_pct, 0.0);
        assert!(report.by_entry_stage.is_empty());
        assert!(report.still_in_validation.is_empty());
    }
}
