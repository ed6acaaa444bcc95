use chrono::NaiveDate;
use pipecast_core::{OpportunityId, StoreError};
use rust_decimal::Decimal;

use crate::connection::DbPool;
use crate::repositories::{
    NewBatch, NewOpportunity, NewSnapshot, SqlOpportunityRepository, SqlSnapshotRepository,
};

/// One deal's weekly trajectory in the demo dataset. Each observation is
/// (week offset, stage, annualized value, forecast close date).
struct SeedDeal {
    external_id: &'static str,
    name: &'static str,
    account_name: &'static str,
    owner: &'static str,
    loss_reason: Option<&'static str>,
    observations: &'static [(u32, &'static str, i64, &'static str)],
}

/// Weekly snapshot dates start here; week N lands N*7 days later.
const SEED_START: &str = "2024-02-05";

const SEED_DEALS: &[SeedDeal] = &[
    // Wins its way down the funnel, slipping one quarter along the way.
    SeedDeal {
        external_id: "006DM00000AcmeRnw",
        name: "Acme Renewal FY2024",
        account_name: "Acme Inc.",
        owner: "jordan",
        loss_reason: None,
        observations: &[
            (0, "Introduction", 40_000, "2024-04-30"),
            (1, "Discover", 42_000, "2024-04-30"),
            (3, "Proposal", 45_000, "2024-07-15"),
            (5, "Negotiation/Review", 45_000, "2024-07-15"),
            (7, "Closed Won", 45_000, "2024-07-01"),
        ],
    },
    // Stalls in validation, then converts.
    SeedDeal {
        external_id: "006DM00000GlbxExp",
        name: "Globex Expansion",
        account_name: "Globex LLC",
        owner: "casey",
        loss_reason: None,
        observations: &[
            (0, "Validation", 18_000, "2024-06-30"),
            (2, "Validation", 18_000, "2024-06-30"),
            (4, "Discover", 20_000, "2024-06-30"),
            (6, "Proposal", 24_000, "2024-07-31"),
        ],
    },
    // Lost from proposal with a recorded reason.
    SeedDeal {
        external_id: "006DM00000InitSec",
        name: "Initech Security Suite",
        account_name: "Initech",
        owner: "jordan",
        loss_reason: Some("Chose incumbent vendor"),
        observations: &[
            (0, "Discover", 60_000, "2024-05-15"),
            (2, "Proposal", 60_000, "2024-05-15"),
            (4, "Closed Lost", 60_000, "2024-05-15"),
        ],
    },
    // Second live deal on the Acme account, for duplicate detection.
    SeedDeal {
        external_id: "006DM00000AcmeNet",
        name: "Acme Platform Upsell",
        account_name: "ACME",
        owner: "casey",
        loss_reason: None,
        observations: &[
            (3, "Introduction", 12_000, "2024-09-30"),
            (5, "Discover", 15_000, "2024-09-30"),
            (7, "Discover", 15_000, "2024-10-31"),
        ],
    },
];

#[derive(Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub opportunities: usize,
    pub batches: usize,
    pub snapshots: usize,
}

/// Deterministic demo dataset: four deals observed over eight weekly
/// uploads, covering a win, a validation conversion, a loss with a
/// reason, and a duplicate account pair. Loading twice duplicates
/// batches, so callers reset first when they need a clean slate.
pub struct DemoDataset;

impl DemoDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedSummary, StoreError> {
        let opportunities = SqlOpportunityRepository::new(pool.clone());
        let snapshots = SqlSnapshotRepository::new(pool.clone());

        let mut ids: Vec<OpportunityId> = Vec::with_capacity(SEED_DEALS.len());
        for deal in SEED_DEALS {
            let id = opportunities
                .upsert(NewOpportunity {
                    external_id: deal.external_id.to_string(),
                    name: deal.name.to_string(),
                    account_name: Some(deal.account_name.to_string()),
                    owner: Some(deal.owner.to_string()),
                })
                .await?;
            ids.push(id);
        }

        let start = parse_seed_date(SEED_START)?;
        let weeks = SEED_DEALS
            .iter()
            .flat_map(|deal| deal.observations.iter().map(|(week, ..)| *week))
            .max()
            .unwrap_or(0);

        let mut batches = 0;
        let mut inserted = 0;
        for week in 0..=weeks {
            let snapshot_date = start + chrono::Days::new(u64::from(week) * 7);
            let mut rows = Vec::new();
            for (deal, id) in SEED_DEALS.iter().zip(&ids) {
                let Some((_, stage, value, close)) =
                    deal.observations.iter().find(|(w, ..)| *w == week)
                else {
                    continue;
                };
                let lost = stage.eq_ignore_ascii_case("closed lost");
                rows.push(NewSnapshot {
                    opportunity_id: *id,
                    stage: Some((*stage).to_string()),
                    annualized_value: Some(Decimal::from(*value)),
                    total_contract_value: Some(Decimal::from(*value * 2)),
                    close_date: Some(parse_seed_date(close)?),
                    loss_reason: if lost {
                        deal.loss_reason.map(str::to_string)
                    } else {
                        None
                    },
                    entered_pipeline: Some(start),
                });
            }
            if rows.is_empty() {
                continue;
            }
            inserted += rows.len();
            batches += 1;
            snapshots
                .record_batch(NewBatch {
                    batch_date: snapshot_date + chrono::Days::new(1),
                    snapshot_date,
                    source: Some("demo seed".to_string()),
                    rows,
                })
                .await?;
        }

        Ok(SeedSummary { opportunities: ids.len(), batches, snapshots: inserted })
    }
}

fn parse_seed_date(raw: &str) -> Result<NaiveDate, StoreError> {
    raw.parse().map_err(|_| StoreError::MalformedRow {
        context: "fixtures.seed_date",
        message: format!("invalid seed date `{raw}`"),
    })
}
