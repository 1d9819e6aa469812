//! Dividend report over dividend history.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use super::{select_years, ReportError};
use crate::domain::{Dividend, Ticker};
use crate::history::HistorySource;

#[derive(Debug, Clone)]
pub struct DividendReport {
    history: Arc<dyn HistorySource>,
    years: Option<Vec<i32>>,
}

impl DividendReport {
    pub fn new(history: Arc<dyn HistorySource>, years: Option<Vec<i32>>) -> Self {
        Self { history, years }
    }

    /// Every dividend paid on `ticker`, in payment order.
    pub async fn create_report_by_ticker(
        &self,
        ticker: &Ticker,
    ) -> Result<Vec<Dividend>, ReportError> {
        let mut dividends: Vec<Dividend> = self
            .history
            .read_dividends()
            .await?
            .into_iter()
            .filter(|dividend| &dividend.ticker == ticker)
            .collect();
        dividends.sort_by_key(|dividend| dividend.timestamp);
        Ok(dividends)
    }

    /// Dividends paid in the selected years, ordered by payment time and then
    /// ticker.
    ///
    /// # Errors
    /// `YearsNotInHistory` if a requested year has no dividend at all.
    pub async fn create_report(&self) -> Result<Vec<Dividend>, ReportError> {
        let dividends = self.history.read_dividends().await?;

        let available: BTreeSet<i32> = dividends.iter().map(Dividend::year).collect();
        let selected = select_years(self.years.as_deref(), &available)?;

        let mut dividends: Vec<Dividend> = dividends
            .into_iter()
            .filter(|dividend| selected.contains(&dividend.year()))
            .collect();
        dividends.sort_by(|a, b| (a.timestamp, &a.ticker).cmp(&(b.timestamp, &b.ticker)));

        info!(dividends = dividends.len(), "dividend report created");
        Ok(dividends)
    }
}
