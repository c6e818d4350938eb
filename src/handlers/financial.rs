use super::common::ok;
use crate::{
    services::financial::{FinancialReport, FinancialSummary, MonthQuery},
    ApiResult, AppState,
};
use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};

/// Actual and planned income and expense for a month
#[utoipa::path(
    get,
    path = "/api/v1/financial/summary",
    params(MonthQuery),
    responses(
        (status = 200, description = "Monthly summary", body = crate::ApiResponse<FinancialSummary>),
        (status = 400, description = "Invalid month", body = crate::errors::ErrorResponse),
    ),
    tag = "financial"
)]
pub async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<FinancialSummary> {
    let summary = state
        .services
        .financial
        .get_summary(&query.month, state.config.studio_today())
        .await?;
    Ok(ok(summary))
}

/// Itemised month report with formatted totals
#[utoipa::path(
    get,
    path = "/api/v1/financial/report",
    params(MonthQuery),
    responses(
        (status = 200, description = "Monthly report", body = crate::ApiResponse<FinancialReport>),
        (status = 400, description = "Invalid month", body = crate::errors::ErrorResponse),
    ),
    tag = "financial"
)]
pub async fn get_report(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<FinancialReport> {
    let report = state
        .services
        .financial
        .get_report(&query.month, state.config.studio_offset())
        .await?;
    Ok(ok(report))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/financial/summary", get(get_summary))
        .route("/financial/report", get(get_report))
}
