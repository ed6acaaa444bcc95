use chrono::{NaiveDate, Utc};
use clap::ValueEnum;
use pipecast_core::{DateRange, LossGrouping, ReportError, ReportService};
use pipecast_db::repositories::SqlSnapshotRepository;
use pipecast_db::{connect, migrations};
use serde::Serialize;

use crate::commands::{self, CommandResult, FailureKind};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportName {
    StageDwell,
    DateSlippage,
    ValidationConversion,
    ClosingProbability,
    LossReasons,
    ValueChange,
    DuplicateAccounts,
}

impl ReportName {
    fn label(self) -> &'static str {
        match self {
            Self::StageDwell => "stage-dwell",
            Self::DateSlippage => "date-slippage",
            Self::ValidationConversion => "validation-conversion",
            Self::ClosingProbability => "closing-probability",
            Self::LossReasons => "loss-reasons",
            Self::ValueChange => "value-change",
            Self::DuplicateAccounts => "duplicate-accounts",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReportArgs {
    pub name: ReportName,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub as_of: Option<NaiveDate>,
    pub group: Option<String>,
}

pub fn run(args: ReportArgs) -> CommandResult {
    let config = match commands::load_config("report") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let range = match parse_range(&args) {
        Ok(range) => range,
        Err(message) => {
            return CommandResult::failure("report", FailureKind::InvalidArguments, message);
        }
    };
    let grouping = match parse_grouping(args.group.as_deref()) {
        Ok(grouping) => grouping,
        Err(message) => {
            return CommandResult::failure("report", FailureKind::InvalidArguments, message);
        }
    };

    let outcome = commands::block_on("report", async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| (FailureKind::DbConnectivity, error.to_string()))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| (FailureKind::Migration, error.to_string()))?;

        let service =
            ReportService::new(SqlSnapshotRepository::new(pool.clone()), config.reports.clone());

        let as_of = args.as_of.unwrap_or_else(|| Utc::now().date_naive());
        let data = match args.name {
            ReportName::StageDwell => to_value(service.stage_dwell(range).await),
            ReportName::DateSlippage => to_value(service.date_slippage(range).await),
            ReportName::ValidationConversion => {
                to_value(service.validation_conversion(range, as_of).await)
            }
            ReportName::ClosingProbability => to_value(service.closing_probability(range).await),
            ReportName::LossReasons => to_value(service.loss_reasons(grouping, range).await),
            ReportName::ValueChange => to_value(service.value_change(range).await),
            ReportName::DuplicateAccounts => {
                to_value(service.duplicate_accounts(args.as_of).await)
            }
        };

        pool.close().await;
        data
    });

    match outcome {
        Ok(data) => CommandResult::report("report", args.name.label(), data),
        Err(result) => result,
    }
}

fn parse_range(args: &ReportArgs) -> Result<Option<DateRange>, String> {
    match (args.start, args.end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            DateRange::new(start, end).map(Some).map_err(|error| error.to_string())
        }
        _ => Err("--start and --end must be provided together".to_string()),
    }
}

fn parse_grouping(raw: Option<&str>) -> Result<LossGrouping, String> {
    match raw.map(str::trim) {
        None | Some("") | Some("reason") => Ok(LossGrouping::Reason),
        Some("stage") => Ok(LossGrouping::ReasonAndStage),
        Some(other) => Err(format!("unsupported group `{other}` (expected reason|stage)")),
    }
}

fn to_value<T: Serialize>(
    result: Result<T, ReportError>,
) -> Result<serde_json::Value, (FailureKind, String)> {
    let rows = result.map_err(|error| match error {
        ReportError::InvalidRange { .. } => (FailureKind::InvalidArguments, error.to_string()),
        ReportError::Store(_) => (FailureKind::ReportQuery, error.to_string()),
    })?;
    serde_json::to_value(rows).map_err(|error| (FailureKind::Serialization, error.to_string()))
}
