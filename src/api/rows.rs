use crate::api::{AppState, ReportQuery};
use crate::domain::ReportRow;
use crate::error::AppError;
use crate::report::TickerSummary;
use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RowsResponse {
    pub ticker: String,
    pub year: i32,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: TickerSummary,
    pub text: String,
}

pub async fn get_rows(
    Query(params): Query<ReportQuery>,
    State(state): State<AppState>,
) -> Result<Json<RowsResponse>, AppError> {
    let ticker = params.ticker()?;
    let year = params.year()?;

    let rows = state
        .report
        .rows_for(&ticker, year)
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(RowsResponse {
        ticker: ticker.to_string(),
        year,
        rows,
    }))
}

pub async fn get_summary(
    Query(params): Query<ReportQuery>,
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, AppError> {
    let ticker = params.ticker()?;
    let year = params.year()?;

    let summary = state.report.ticker_summary(&ticker, year).ok_or_else(|| {
        AppError::NotFound(format!("no realized sales of {} in {}", ticker, year))
    })?;
    let text = summary.describe();

    Ok(Json(SummaryResponse { summary, text }))
}
