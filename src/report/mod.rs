//! Report assembly: per-ticker FIFO reports, multi-ticker fan-out, and
//! aggregation over the combined rows.
//!
//! A [`FifoPositionReport`] reads history once, groups it by ticker, and runs
//! the normalizer and matcher for each ticker on a bounded pool of blocking
//! tasks. The resulting [`FifoReport`] is what the table/CSV renderers, the
//! XML builder and the API all consume.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{ReportRow, Ticker, Transaction};
use crate::engine::{match_lots, FifoError, LotNormalizer, NormalizeError, NormalizedLots};
use crate::history::{HistoryError, HistorySource};

pub mod dividend;
pub mod render;
pub mod summary;

pub use dividend::DividendReport;
pub use render::{render_table, write_csv};
pub use summary::{TickerResult, TickerSummary, YearResults};

/// What to do when one ticker of a batch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// The first failing ticker aborts the whole report.
    #[default]
    FailFast,
    /// Failing tickers are recorded in [`FifoReport::failures`] and skipped.
    Continue,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::FailFast => "fail-fast",
            FailurePolicy::Continue => "continue",
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "fail-fast" => Ok(FailurePolicy::FailFast),
            "continue" => Ok(FailurePolicy::Continue),
            other => Err(format!("must be fail-fast or continue, got {}", other)),
        }
    }
}

/// Number of worker tasks the machine can run in parallel.
pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Requested worker count bounded to `1..=available_workers()`.
fn worker_count(requested: usize) -> usize {
    requested.clamp(1, available_workers())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Restrict the report to tickers traded in these years. `None` means
    /// every year present in history.
    pub years: Option<Vec<i32>>,
    pub n_workers: usize,
    pub policy: FailurePolicy,
    pub base_currency: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            years: None,
            n_workers: available_workers(),
            policy: FailurePolicy::FailFast,
            base_currency: "EUR".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("ticker {ticker}: {source}")]
    Normalize {
        ticker: Ticker,
        #[source]
        source: NormalizeError,
    },
    #[error("ticker {ticker}: {source}")]
    Fifo {
        ticker: Ticker,
        #[source]
        source: FifoError,
    },
    #[error("requested years {requested:?} are not all present in history (available: {available:?})")]
    YearsNotInHistory {
        requested: Vec<i32>,
        available: Vec<i32>,
    },
    #[error("ticker {ticker}: worker task failed: {message}")]
    Worker { ticker: Ticker, message: String },
}

impl ReportError {
    /// Ticker the error belongs to, for per-ticker failures.
    pub fn ticker(&self) -> Option<&Ticker> {
        match self {
            ReportError::Normalize { ticker, .. }
            | ReportError::Fifo { ticker, .. }
            | ReportError::Worker { ticker, .. } => Some(ticker),
            ReportError::History(_) | ReportError::YearsNotInHistory { .. } => None,
        }
    }
}

/// A ticker left out of a report run under [`FailurePolicy::Continue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerFailure {
    pub ticker: Ticker,
    pub message: String,
}

/// Rows of every reported ticker, sorted by ticker, sell date and buy date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FifoReport {
    pub rows: Vec<ReportRow>,
    pub failures: Vec<TickerFailure>,
    /// Lots each reported ticker was matched from, sorted by ticker.
    /// Tickers that were never sold have none.
    #[serde(skip)]
    pub ledgers: Vec<NormalizedLots>,
}

/// FIFO capital-gains report over a position history.
#[derive(Debug, Clone)]
pub struct FifoPositionReport {
    history: Arc<dyn HistorySource>,
    options: ReportOptions,
    normalizer: LotNormalizer,
}

impl FifoPositionReport {
    pub fn new(history: Arc<dyn HistorySource>, options: ReportOptions) -> Self {
        let normalizer = LotNormalizer::new(options.base_currency.clone());
        Self {
            history,
            options,
            normalizer,
        }
    }

    /// Report rows of a single ticker. Empty when the ticker was never sold.
    pub async fn create_report_by_ticker(
        &self,
        ticker: &Ticker,
    ) -> Result<Vec<ReportRow>, ReportError> {
        let transactions: Vec<Transaction> = self
            .history
            .read_transactions()
            .await?
            .into_iter()
            .filter(|tx| &tx.ticker == ticker)
            .collect();

        report_ticker(&self.normalizer, ticker, &transactions)
    }

    /// Report rows of every ticker traded in the selected years.
    ///
    /// # Errors
    /// `YearsNotInHistory` if a requested year has no transactions at all.
    /// Under [`FailurePolicy::FailFast`] the first per-ticker error is
    /// returned; under [`FailurePolicy::Continue`] it is recorded instead.
    pub async fn create_report(&self) -> Result<FifoReport, ReportError> {
        let transactions = self.history.read_transactions().await?;

        let available: BTreeSet<i32> = transactions.iter().map(Transaction::year).collect();
        let selected = select_years(self.options.years.as_deref(), &available)?;

        let mut by_ticker: BTreeMap<Ticker, Vec<Transaction>> = BTreeMap::new();
        for tx in transactions {
            by_ticker.entry(tx.ticker.clone()).or_default().push(tx);
        }
        by_ticker.retain(|_, txs| txs.iter().any(|tx| selected.contains(&tx.year())));

        let workers = worker_count(self.options.n_workers);
        info!(
            tickers = by_ticker.len(),
            workers,
            policy = self.options.policy.as_str(),
            "creating FIFO report"
        );

        let mut results = stream::iter(by_ticker)
            .map(|(ticker, transactions)| {
                let normalizer = self.normalizer.clone();
                async move {
                    let task_ticker = ticker.clone();
                    let result = tokio::task::spawn_blocking(move || {
                        match_ticker(&normalizer, &task_ticker, &transactions)
                    })
                    .await
                    .unwrap_or_else(|e| {
                        Err(ReportError::Worker {
                            ticker: ticker.clone(),
                            message: e.to_string(),
                        })
                    });
                    (ticker, result)
                }
            })
            .buffer_unordered(workers);

        let mut report = FifoReport::default();
        while let Some((ticker, result)) = results.next().await {
            match result {
                Ok(Some((mut rows, lots))) => {
                    report.rows.append(&mut rows);
                    report.ledgers.push(lots);
                }
                Ok(None) => {}
                Err(e) => match self.options.policy {
                    FailurePolicy::FailFast => return Err(e),
                    FailurePolicy::Continue => {
                        warn!(ticker = %ticker, error = %e, "skipping ticker");
                        report.failures.push(TickerFailure {
                            ticker,
                            message: e.to_string(),
                        });
                    }
                },
            }
        }

        report.rows.sort_by(|a, b| {
            (&a.ticker, a.sell_date, a.buy_date).cmp(&(&b.ticker, b.sell_date, b.buy_date))
        });
        report.failures.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        report
            .ledgers
            .sort_by(|a, b| a.attributes.ticker.cmp(&b.attributes.ticker));

        info!(
            rows = report.rows.len(),
            failures = report.failures.len(),
            "FIFO report created"
        );
        Ok(report)
    }
}

/// Normalize and match one ticker's transactions into report rows.
pub fn report_ticker(
    normalizer: &LotNormalizer,
    ticker: &Ticker,
    transactions: &[Transaction],
) -> Result<Vec<ReportRow>, ReportError> {
    Ok(match_ticker(normalizer, ticker, transactions)?
        .map(|(rows, _)| rows)
        .unwrap_or_default())
}

/// Report rows of one ticker and the lots they were matched from. `None`
/// when the ticker was never sold.
fn match_ticker(
    normalizer: &LotNormalizer,
    ticker: &Ticker,
    transactions: &[Transaction],
) -> Result<Option<(Vec<ReportRow>, NormalizedLots)>, ReportError> {
    let lots = normalizer
        .normalize(transactions)
        .map_err(|source| ReportError::Normalize {
            ticker: ticker.clone(),
            source,
        })?;
    let Some(lots) = lots else {
        return Ok(None);
    };

    let records = match_lots(&lots.buys, &lots.sells).map_err(|source| ReportError::Fifo {
        ticker: ticker.clone(),
        source,
    })?;

    let rows = records
        .iter()
        .map(|record| ReportRow::new(record, &lots.attributes))
        .collect();
    Ok(Some((rows, lots)))
}

/// Years to report on: the requested ones, which must all be present in
/// history, or every available year.
pub fn select_years(
    requested: Option<&[i32]>,
    available: &BTreeSet<i32>,
) -> Result<BTreeSet<i32>, ReportError> {
    let Some(requested) = requested else {
        return Ok(available.clone());
    };

    if requested.iter().all(|year| available.contains(year)) {
        Ok(requested.iter().copied().collect())
    } else {
        Err(ReportError::YearsNotInHistory {
            requested: requested.to_vec(),
            available: available.iter().copied().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{parse_timestamp, Action, Decimal, Isin};
    use crate::history::MockHistory;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn tx(action: Action, ticker: &str, time: &str, qty: &str, price: &str) -> Transaction {
        Transaction::new(
            action,
            parse_timestamp(time).unwrap(),
            Ticker::new(ticker),
            Isin::new(format!("ISIN-{}", ticker)),
            format!("{} Inc", ticker),
            d(qty),
            d(price),
            None,
            None,
        )
        .unwrap()
    }

    fn history() -> MockHistory {
        MockHistory::new().with_transactions(vec![
            tx(Action::MarketBuy, "AAA", "2020-01-01", "10", "1"),
            tx(Action::MarketSell, "AAA", "2020-02-01", "4", "2"),
            tx(Action::MarketSell, "AAA", "2021-03-01", "6", "3"),
            tx(Action::MarketBuy, "BBB", "2021-01-01", "5", "10"),
            tx(Action::MarketSell, "BBB", "2021-06-01", "5", "8"),
            tx(Action::MarketBuy, "CCC", "2019-01-01", "1", "10"),
        ])
    }

    fn report(history: MockHistory, options: ReportOptions) -> FifoPositionReport {
        FifoPositionReport::new(Arc::new(history), options)
    }

    #[tokio::test]
    async fn test_create_report_by_ticker() {
        let rows = report(history(), ReportOptions::default())
            .create_report_by_ticker(&Ticker::new("AAA"))
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].result, d("4"));
        assert_eq!(rows[0].tax_year, 2020);
        assert_eq!(rows[1].result, d("12"));
        assert_eq!(rows[1].tax_year, 2021);
        assert_eq!(rows[1].name, "AAA Inc");
        assert_eq!(rows[1].currency, "EUR");
    }

    #[tokio::test]
    async fn test_unsold_ticker_reports_nothing() {
        let rows = report(history(), ReportOptions::default())
            .create_report_by_ticker(&Ticker::new("CCC"))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_create_report_all_years() {
        let result = report(history(), ReportOptions::default())
            .create_report()
            .await
            .unwrap();

        assert_eq!(result.rows.len(), 3);
        assert!(result.failures.is_empty());
        let tickers: Vec<&str> = result.rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAA", "AAA", "BBB"]);
    }

    #[tokio::test]
    async fn test_years_select_tickers_traded_in_them() {
        let options = ReportOptions {
            years: Some(vec![2020]),
            n_workers: 2,
            ..ReportOptions::default()
        };
        let result = report(history(), options).create_report().await.unwrap();

        // AAA traded in 2020, so all of its rows are reported; BBB did not.
        assert_eq!(result.rows.len(), 2);
        assert!(result.rows.iter().all(|r| r.ticker.as_str() == "AAA"));
    }

    #[tokio::test]
    async fn test_unknown_year_is_rejected() {
        let options = ReportOptions {
            years: Some(vec![2020, 2030]),
            ..ReportOptions::default()
        };
        let err = report(history(), options).create_report().await.unwrap_err();
        match err {
            ReportError::YearsNotInHistory {
                requested,
                available,
            } => {
                assert_eq!(requested, vec![2020, 2030]);
                assert_eq!(available, vec![2019, 2020, 2021]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn history_with_oversold_ticker() -> MockHistory {
        history().with_transaction(tx(Action::MarketSell, "DDD", "2021-01-01", "1", "5"))
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_batch() {
        let err = report(history_with_oversold_ticker(), ReportOptions::default())
            .create_report()
            .await
            .unwrap_err();

        assert_eq!(err.ticker(), Some(&Ticker::new("DDD")));
        assert!(matches!(
            err,
            ReportError::Fifo {
                source: FifoError::InsufficientHistory { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_continue_collects_failures() {
        let options = ReportOptions {
            policy: FailurePolicy::Continue,
            ..ReportOptions::default()
        };
        let result = report(history_with_oversold_ticker(), options)
            .create_report()
            .await
            .unwrap();

        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].ticker, Ticker::new("DDD"));
        assert!(result.failures[0].message.contains("insufficient buy history"));
    }

    #[tokio::test]
    async fn test_history_error_propagates_regardless_of_policy() {
        let options = ReportOptions {
            policy: FailurePolicy::Continue,
            ..ReportOptions::default()
        };
        let err = report(history().with_failure("broken"), options)
            .create_report()
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::History(_)));
    }

    #[tokio::test]
    async fn test_rows_sorted_by_ticker_and_dates() {
        let history = MockHistory::new().with_transactions(vec![
            tx(Action::MarketBuy, "ZZZ", "2020-01-01", "2", "1"),
            tx(Action::MarketSell, "ZZZ", "2020-03-01", "1", "2"),
            tx(Action::MarketSell, "ZZZ", "2020-02-01", "1", "2"),
            tx(Action::MarketBuy, "MMM", "2020-01-01", "1", "1"),
            tx(Action::MarketSell, "MMM", "2020-05-01", "1", "2"),
        ]);
        let options = ReportOptions {
            n_workers: 1,
            ..ReportOptions::default()
        };
        let result = report(history, options).create_report().await.unwrap();

        let keys: Vec<(String, String)> = result
            .rows
            .iter()
            .map(|r| (r.ticker.to_string(), r.sell_date.to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("MMM".to_string(), "2020-05-01".to_string()),
                ("ZZZ".to_string(), "2020-02-01".to_string()),
                ("ZZZ".to_string(), "2020-03-01".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_ledgers_keep_full_lots_of_sold_tickers() {
        let result = report(history(), ReportOptions::default())
            .create_report()
            .await
            .unwrap();

        let tickers: Vec<&str> = result
            .ledgers
            .iter()
            .map(|lots| lots.attributes.ticker.as_str())
            .collect();
        assert_eq!(tickers, vec!["AAA", "BBB"]);

        let aaa = &result.ledgers[0];
        assert_eq!(aaa.buys.len(), 1);
        assert_eq!(aaa.buys[0].quantity, d("10"));
        assert_eq!(aaa.sells.len(), 2);
    }

    #[test]
    fn test_worker_count_bounded_by_parallelism() {
        assert_eq!(worker_count(0), 1);
        assert_eq!(worker_count(1), 1);
        assert_eq!(worker_count(usize::MAX), available_workers());
    }

    #[test]
    fn test_failure_policy_parse() {
        assert_eq!("fail-fast".parse::<FailurePolicy>(), Ok(FailurePolicy::FailFast));
        assert_eq!("continue".parse::<FailurePolicy>(), Ok(FailurePolicy::Continue));
        assert!("retry".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn test_select_years() {
        let available: BTreeSet<i32> = [2019, 2020].into_iter().collect();
        assert_eq!(select_years(None, &available).unwrap(), available);
        assert_eq!(
            select_years(Some(&[2020]), &available).unwrap(),
            [2020].into_iter().collect()
        );
        assert!(select_years(Some(&[2018]), &available).is_err());
    }
}
