//! History source abstraction for reading transactions, dividends and cash flows.

use crate::domain::{CashFlow, Dividend, Transaction};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub mod csv_export;
pub mod mock;

pub use csv_export::CsvHistory;
pub use mock::MockHistory;

/// Supplies the raw rows the reports are computed from.
#[async_trait]
pub trait HistorySource: Send + Sync + fmt::Debug {
    /// Read all buy and sell transactions, across every ticker.
    ///
    /// Rows of other action kinds are skipped. Order is unspecified; the
    /// engine sorts per ticker.
    async fn read_transactions(&self) -> Result<Vec<Transaction>, HistoryError>;

    /// Read all ordinary dividend payments.
    async fn read_dividends(&self) -> Result<Vec<Dividend>, HistoryError>;

    /// Read all deposits and withdrawals.
    async fn read_cash_flows(&self) -> Result<Vec<CashFlow>, HistoryError>;
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history at path {0} doesn't exist or holds no CSV files")]
    Missing(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error in {file}: {message}")]
    Csv { file: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_error_display() {
        let err = HistoryError::Missing(PathBuf::from("/data/history"));
        assert_eq!(
            err.to_string(),
            "history at path /data/history doesn't exist or holds no CSV files"
        );

        let err = HistoryError::Csv {
            file: "2020.csv".to_string(),
            message: "line 3: invalid quantity".to_string(),
        };
        assert_eq!(err.to_string(), "csv error in 2020.csv: line 3: invalid quantity");
    }
}
