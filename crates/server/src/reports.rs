//! JSON report routes. Each handler parses its query parameters, calls the
//! report service, and serializes the aggregator's table as-is.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use pipecast_core::{
    ClosingProbabilityRow, DateRange, DuplicateAccountGroup, LossGrouping, LossReasonReport,
    ReportError, ReportService, ReportSettings, StageDwellRow, StageSlippageRow,
    ValidationConversionReport, ValueChangeRow,
};
use pipecast_db::repositories::SqlSnapshotRepository;
use pipecast_db::DbPool;
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Clone)]
pub struct ReportsState {
    service: Arc<ReportService<SqlSnapshotRepository>>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub fn router(db_pool: DbPool, settings: ReportSettings) -> Router {
    let service = Arc::new(ReportService::new(SqlSnapshotRepository::new(db_pool), settings));
    Router::new()
        .route("/api/reports/stage-dwell", get(stage_dwell))
        .route("/api/reports/date-slippage", get(date_slippage))
        .route("/api/reports/validation-conversion", get(validation_conversion))
        .route("/api/reports/closing-probability", get(closing_probability))
        .route("/api/reports/loss-reasons", get(loss_reasons))
        .route("/api/reports/value-change", get(value_change))
        .route("/api/reports/duplicate-accounts", get(duplicate_accounts))
        .with_state(ReportsState { service })
}

/// Shared query shape for all report routes; each handler reads the
/// parameters it understands and ignores the rest.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub as_of: Option<NaiveDate>,
    pub group: Option<String>,
}

async fn stage_dwell(
    State(state): State<ReportsState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Vec<StageDwellRow>> {
    let range = parse_range(&query)?;
    state.service.stage_dwell(range).await.map(Json).map_err(report_error)
}

async fn date_slippage(
    State(state): State<ReportsState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Vec<StageSlippageRow>> {
    let range = parse_range(&query)?;
    state.service.date_slippage(range).await.map(Json).map_err(report_error)
}

async fn validation_conversion(
    State(state): State<ReportsState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<ValidationConversionReport> {
    let range = parse_range(&query)?;
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    state.service.validation_conversion(range, as_of).await.map(Json).map_err(report_error)
}

async fn closing_probability(
    State(state): State<ReportsState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Vec<ClosingProbabilityRow>> {
    let range = parse_range(&query)?;
    state.service.closing_probability(range).await.map(Json).map_err(report_error)
}

/// `start`/`end` bound recorded close dates here, not snapshot dates.
async fn loss_reasons(
    State(state): State<ReportsState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<LossReasonReport> {
    let grouping = parse_grouping(query.group.as_deref())?;
    let close_date_range = parse_range(&query)?;
    state.service.loss_reasons(grouping, close_date_range).await.map(Json).map_err(report_error)
}

async fn value_change(
    State(state): State<ReportsState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Vec<ValueChangeRow>> {
    let range = parse_range(&query)?;
    state.service.value_change(range).await.map(Json).map_err(report_error)
}

async fn duplicate_accounts(
    State(state): State<ReportsState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Vec<DuplicateAccountGroup>> {
    state.service.duplicate_accounts(query.as_of).await.map(Json).map_err(report_error)
}

fn parse_range(query: &ReportQuery) -> Result<Option<DateRange>, (StatusCode, Json<ApiError>)> {
    match (query.start, query.end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => DateRange::new(start, end).map(Some).map_err(report_error),
        _ => Err(bad_request("start and end must be provided together".to_string())),
    }
}

fn parse_grouping(raw: Option<&str>) -> Result<LossGrouping, (StatusCode, Json<ApiError>)> {
    match raw.map(str::trim) {
        None | Some("") | Some("reason") => Ok(LossGrouping::Reason),
        Some("stage") => Ok(LossGrouping::ReasonAndStage),
        Some(other) => {
            Err(bad_request(format!("unsupported group `{other}` (expected reason|stage)")))
        }
    }
}

fn report_error(err: ReportError) -> (StatusCode, Json<ApiError>) {
    match err {
        ReportError::InvalidRange { .. } => bad_request(err.to_string()),
        ReportError::Store(inner) => {
            error!(event_name = "system.reports.store_failure", error = %inner, "report query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError { error: "report computation failed".to_string() }),
            )
        }
    }
}

fn bad_request(message: String) -> (StatusCode, Json<ApiError>) {
    (StatusCode::BAD_REQUEST, Json(ApiError { error: message }))
}
