//! Year-level views: available years, tickers per year, the per-year result
//! waterfall and the tickers that failed.

use crate::api::{AppState, ReportQuery};
use crate::error::AppError;
use crate::report::{TickerFailure, YearResults};
use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct YearsResponse {
    pub years: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct TickersResponse {
    pub year: i32,
    pub tickers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FailuresResponse {
    pub failures: Vec<TickerFailure>,
}

pub async fn get_years(State(state): State<AppState>) -> Json<YearsResponse> {
    Json(YearsResponse {
        years: state.report.tax_years(),
    })
}

pub async fn get_tickers(
    Query(params): Query<ReportQuery>,
    State(state): State<AppState>,
) -> Result<Json<TickersResponse>, AppError> {
    let year = params.year()?;
    let tickers = state
        .report
        .tickers_for_year(year)
        .into_iter()
        .map(|t| t.to_string())
        .collect();
    Ok(Json(TickersResponse { year, tickers }))
}

pub async fn get_results(
    Query(params): Query<ReportQuery>,
    State(state): State<AppState>,
) -> Result<Json<YearResults>, AppError> {
    let year = params.year()?;
    Ok(Json(state.report.year_results(year)))
}

pub async fn get_failures(State(state): State<AppState>) -> Json<FailuresResponse> {
    Json(FailuresResponse {
        failures: state.report.failures.clone(),
    })
}
