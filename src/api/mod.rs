pub mod health;
pub mod rows;
pub mod years;

use crate::domain::Ticker;
use crate::error::AppError;
use crate::report::FifoReport;
use axum::{routing::get, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// The API serves a report computed once at startup.
#[derive(Clone)]
pub struct AppState {
    pub report: Arc<FifoReport>,
}

impl AppState {
    pub fn new(report: FifoReport) -> Self {
        Self {
            report: Arc::new(report),
        }
    }
}

/// Query parameters shared by the report endpoints. Kept as raw strings so
/// that bad values produce a JSON error body.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub ticker: Option<String>,
    pub year: Option<String>,
}

impl ReportQuery {
    pub fn year(&self) -> Result<i32, AppError> {
        let raw = self
            .year
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest("missing query parameter: year".into()))?;
        raw.parse::<i32>()
            .map_err(|_| AppError::BadRequest(format!("invalid year: {}", raw)))
    }

    pub fn ticker(&self) -> Result<Ticker, AppError> {
        self.ticker
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Ticker::new)
            .ok_or_else(|| AppError::BadRequest("missing query parameter: ticker".into()))
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/v1/years", get(years::get_years))
        .route("/v1/tickers", get(years::get_tickers))
        .route("/v1/results", get(years::get_results))
        .route("/v1/failures", get(years::get_failures))
        .route("/v1/rows", get(rows::get_rows))
        .route("/v1/summary", get(rows::get_summary))
        .layer(cors)
        .with_state(state)
}
