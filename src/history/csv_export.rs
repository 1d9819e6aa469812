//! Reading broker history exports from CSV files.

use super::{HistoryError, HistorySource};
use crate::domain::{
    parse_timestamp, Action, CashFlow, CashFlowKind, Decimal, Dividend, Isin, Ticker,
    Transaction,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// History stored as a directory of CSV exports, or a single export file.
#[derive(Debug, Clone)]
pub struct CsvHistory {
    path: PathBuf,
}

/// One export row. Column names follow the broker's export; unknown columns
/// are ignored.
#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(rename = "Action")]
    action: String,
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "ISIN", default)]
    isin: Option<String>,
    #[serde(rename = "Ticker", default)]
    ticker: Option<String>,
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "No. of shares", default)]
    num_shares: Option<String>,
    #[serde(rename = "Price / share", alias = "Price / Share", default)]
    price_per_share: Option<String>,
    #[serde(
        rename = "Currency (Price / share)",
        alias = "Currency (Price / Share)",
        default
    )]
    currency: Option<String>,
    #[serde(rename = "Exchange rate", default)]
    exchange_rate: Option<String>,
    #[serde(rename = "Total (EUR)", alias = "Total", default)]
    total: Option<String>,
    #[serde(rename = "Withholding tax", alias = "Witholding tax", default)]
    withholding_tax: Option<String>,
}

impl CsvHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Paths of the CSV files making up this history, in sorted order.
    pub async fn files(&self) -> Result<Vec<PathBuf>, HistoryError> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|_| HistoryError::Missing(self.path.clone()))?;

        if metadata.is_file() {
            return Ok(vec![self.path.clone()]);
        }

        let mut entries = tokio::fs::read_dir(&self.path)
            .await
            .map_err(|source| HistoryError::Io {
                path: self.path.clone(),
                source,
            })?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|source| HistoryError::Io {
            path: self.path.clone(),
            source,
        })? {
            let path = entry.path();
            let is_csv = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if is_csv && path.is_file() {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(HistoryError::Missing(self.path.clone()));
        }
        files.sort();
        Ok(files)
    }

    async fn read_file(path: &Path) -> Result<Vec<u8>, HistoryError> {
        tokio::fs::read(path).await.map_err(|source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse buy and sell transactions out of one export.
    pub fn parse_transactions(
        csv_bytes: &[u8],
        file: &str,
    ) -> Result<Vec<Transaction>, HistoryError> {
        let mut transactions = Vec::new();
        for (line, row) in Self::rows(csv_bytes, file)? {
            let action: Action = row.action.parse().unwrap_or_else(|e| match e {});
            if action.side().is_none() {
                continue;
            }
            let tx = row_to_transaction(row, action)
                .map_err(|message| csv_error(file, line, message))?;
            transactions.push(tx);
        }
        Ok(transactions)
    }

    /// Parse ordinary dividends out of one export.
    pub fn parse_dividends(csv_bytes: &[u8], file: &str) -> Result<Vec<Dividend>, HistoryError> {
        let mut dividends = Vec::new();
        for (line, row) in Self::rows(csv_bytes, file)? {
            let action: Action = row.action.parse().unwrap_or_else(|e| match e {});
            if action != Action::DividendOrdinary {
                continue;
            }
            let dividend =
                row_to_dividend(row).map_err(|message| csv_error(file, line, message))?;
            dividends.push(dividend);
        }
        Ok(dividends)
    }

    /// Parse deposits and withdrawals out of one export.
    pub fn parse_cash_flows(csv_bytes: &[u8], file: &str) -> Result<Vec<CashFlow>, HistoryError> {
        let mut cash_flows = Vec::new();
        for (line, row) in Self::rows(csv_bytes, file)? {
            let action: Action = row.action.parse().unwrap_or_else(|e| match e {});
            let Some(kind) = CashFlowKind::from_action(&action) else {
                continue;
            };
            let cash_flow =
                row_to_cash_flow(row, kind).map_err(|message| csv_error(file, line, message))?;
            cash_flows.push(cash_flow);
        }
        Ok(cash_flows)
    }

    /// Deserialize every row, paired with its 1-based line number.
    fn rows(csv_bytes: &[u8], file: &str) -> Result<Vec<(u64, HistoryRow)>, HistoryError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(csv_bytes);

        let parse_error = |e: csv::Error| HistoryError::Csv {
            file: file.to_string(),
            message: e.to_string(),
        };
        let headers = reader.headers().map_err(parse_error)?.clone();

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(parse_error)?;
            let line = record
                .position()
                .map_or(idx as u64 + 2, |pos| pos.line());
            let row: HistoryRow = record.deserialize(Some(&headers)).map_err(parse_error)?;
            rows.push((line, row));
        }
        Ok(rows)
    }
}

#[async_trait]
impl HistorySource for CsvHistory {
    async fn read_transactions(&self) -> Result<Vec<Transaction>, HistoryError> {
        let mut transactions = Vec::new();
        for path in self.files().await? {
            let bytes = Self::read_file(&path).await?;
            transactions.extend(Self::parse_transactions(&bytes, &file_label(&path))?);
        }
        Ok(transactions)
    }

    async fn read_dividends(&self) -> Result<Vec<Dividend>, HistoryError> {
        let mut dividends = Vec::new();
        for path in self.files().await? {
            let bytes = Self::read_file(&path).await?;
            dividends.extend(Self::parse_dividends(&bytes, &file_label(&path))?);
        }
        Ok(dividends)
    }

    async fn read_cash_flows(&self) -> Result<Vec<CashFlow>, HistoryError> {
        let mut cash_flows = Vec::new();
        for path in self.files().await? {
            let bytes = Self::read_file(&path).await?;
            cash_flows.extend(Self::parse_cash_flows(&bytes, &file_label(&path))?);
        }
        Ok(cash_flows)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn csv_error(file: &str, line: u64, message: String) -> HistoryError {
    HistoryError::Csv {
        file: file.to_string(),
        message: format!("line {}: {}", line, message),
    }
}

fn required(value: Option<String>, column: &str) -> Result<String, String> {
    value.ok_or_else(|| format!("missing value for column '{}'", column))
}

fn decimal(value: &str, column: &str) -> Result<Decimal, String> {
    Decimal::from_str_canonical(value)
        .map_err(|e| format!("invalid {} '{}': {}", column, value, e))
}

/// An absent or "Not available" exchange rate means the price is not converted.
fn exchange_rate(value: Option<String>) -> Result<Option<Decimal>, String> {
    match value.as_deref() {
        None => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("not available") => Ok(None),
        Some(s) => decimal(s, "Exchange rate").map(Some),
    }
}

fn row_to_transaction(row: HistoryRow, action: Action) -> Result<Transaction, String> {
    let timestamp = parse_timestamp(&row.time).map_err(|e| e.to_string())?;
    let ticker = required(row.ticker, "Ticker")?;
    let isin = required(row.isin, "ISIN")?;
    let name = required(row.name, "Name")?;
    let quantity = decimal(&required(row.num_shares, "No. of shares")?, "No. of shares")?;
    let price = decimal(&required(row.price_per_share, "Price / share")?, "Price / share")?;
    let exchange_rate = exchange_rate(row.exchange_rate)?;

    Transaction::new(
        action,
        timestamp,
        Ticker::new(ticker),
        Isin::new(isin),
        name,
        quantity,
        price,
        row.currency,
        exchange_rate,
    )
    .map_err(|e| e.to_string())
}

fn row_to_dividend(row: HistoryRow) -> Result<Dividend, String> {
    let timestamp = parse_timestamp(&row.time).map_err(|e| e.to_string())?;
    let num_shares = decimal(&required(row.num_shares, "No. of shares")?, "No. of shares")?;
    let price_per_share =
        decimal(&required(row.price_per_share, "Price / share")?, "Price / share")?;
    let total = decimal(&required(row.total, "Total (EUR)")?, "Total (EUR)")?;
    let withholding_tax = row
        .withholding_tax
        .as_deref()
        .map(|s| decimal(s, "Withholding tax"))
        .transpose()?;

    Ok(Dividend {
        timestamp,
        ticker: Ticker::new(required(row.ticker, "Ticker")?),
        isin: Isin::new(required(row.isin, "ISIN")?),
        name: required(row.name, "Name")?,
        num_shares,
        price_per_share,
        total,
        withholding_tax,
    })
}

fn row_to_cash_flow(row: HistoryRow, kind: CashFlowKind) -> Result<CashFlow, String> {
    Ok(CashFlow {
        timestamp: parse_timestamp(&row.time).map_err(|e| e.to_string())?,
        kind,
        total: decimal(&required(row.total, "Total (EUR)")?, "Total (EUR)")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use tempfile::TempDir;

    const HEADER: &str = "Action,Time,ISIN,Ticker,Name,No. of shares,Price / share,Currency (Price / share),Exchange rate,Result (EUR),Total (EUR),Withholding tax,Currency (Withholding tax)\n";

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn export(rows: &[&str]) -> String {
        let mut csv = HEADER.to_string();
        for row in rows {
            csv.push_str(row);
            csv.push('\n');
        }
        csv
    }

    #[test]
    fn test_parse_buy_and_sell_rows() {
        let csv = export(&[
            "Market buy,2020-01-02 10:00:00,US0378331005,AAPL,Apple,1.5,300.00,USD,1.12,,401.79,,",
            "Market sell,2020-06-02 10:00:00,US0378331005,AAPL,Apple,0.5,320.00,USD,1.10,,145.45,,",
        ]);
        let txs = CsvHistory::parse_transactions(csv.as_bytes(), "2020.csv").unwrap();

        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].side(), Some(Side::Buy));
        assert_eq!(txs[0].ticker, Ticker::new("AAPL"));
        assert_eq!(txs[0].quantity, d("1.5"));
        assert_eq!(txs[0].price_per_unit, d("300"));
        assert_eq!(txs[0].currency.as_deref(), Some("USD"));
        assert_eq!(txs[0].exchange_rate, Some(d("1.12")));
        assert_eq!(txs[1].side(), Some(Side::Sell));
    }

    #[test]
    fn test_other_actions_are_skipped() {
        let csv = export(&[
            "Deposit,2020-01-01 09:00:00,,,,,,,,,1000.00,,",
            "Dividend (Ordinary),2020-03-01 09:00:00,IE00BZ163L38,VECP,Vanguard,10,0.05,EUR,1.00,,0.50,0.00,EUR",
            "Market buy,2020-01-02 10:00:00,IE00BZ163L38,VECP,Vanguard,10,25.00,EUR,1.00,,250.00,,",
        ]);
        let txs = CsvHistory::parse_transactions(csv.as_bytes(), "x.csv").unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].ticker, Ticker::new("VECP"));
    }

    #[test]
    fn test_not_available_exchange_rate_is_none() {
        let csv = export(&[
            "Market buy,2020-01-02 10:00:00,US0378331005,AAPL,Apple,1,300,USD,Not available,,,,",
        ]);
        let txs = CsvHistory::parse_transactions(csv.as_bytes(), "x.csv").unwrap();
        assert_eq!(txs[0].exchange_rate, None);
    }

    #[test]
    fn test_missing_optional_columns() {
        let csv = "Action,Time,ISIN,Ticker,Name,No. of shares,Price / Share\n\
                   Market buy,2020-01-02,US0378331005,AAPL,Apple,2,10\n";
        let txs = CsvHistory::parse_transactions(csv.as_bytes(), "old.csv").unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].price_per_unit, d("10"));
        assert_eq!(txs[0].currency, None);
        assert_eq!(txs[0].exchange_rate, None);
    }

    #[test]
    fn test_invalid_quantity_reports_file_and_line() {
        let csv = export(&[
            "Market buy,2020-01-02 10:00:00,US0378331005,AAPL,Apple,1,300,USD,1.1,,,,",
            "Market sell,2020-01-03 10:00:00,US0378331005,AAPL,Apple,abc,300,USD,1.1,,,,",
        ]);
        let err = CsvHistory::parse_transactions(csv.as_bytes(), "bad.csv").unwrap_err();
        match err {
            HistoryError::Csv { file, message } => {
                assert_eq!(file, "bad.csv");
                assert!(message.starts_with("line 3:"), "got {}", message);
                assert!(message.contains("No. of shares"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let csv = export(&[
            "Market buy,2020-01-02 10:00:00,US0378331005,AAPL,Apple,0,300,USD,1.1,,,,",
        ]);
        assert!(matches!(
            CsvHistory::parse_transactions(csv.as_bytes(), "x.csv"),
            Err(HistoryError::Csv { .. })
        ));
    }

    #[test]
    fn test_parse_dividends() {
        let csv = export(&[
            "Market buy,2020-01-02 10:00:00,IE00BZ163L38,VECP,Vanguard,10,25.00,EUR,1.00,,250.00,,",
            "Dividend (Ordinary),2020-03-01 09:00:00,IE00BZ163L38,VECP,Vanguard,10,0.05,EUR,1.00,,0.43,0.07,EUR",
        ]);
        let dividends = CsvHistory::parse_dividends(csv.as_bytes(), "x.csv").unwrap();
        assert_eq!(dividends.len(), 1);
        assert_eq!(dividends[0].total, d("0.43"));
        assert_eq!(dividends[0].withholding_tax, Some(d("0.07")));
        assert_eq!(dividends[0].year(), 2020);
    }

    #[test]
    fn test_parse_cash_flows() {
        let csv = export(&[
            "Deposit,2020-01-01 09:00:00,,,,,,,,,1000.00,,",
            "Market buy,2020-01-02 10:00:00,IE00BZ163L38,VECP,Vanguard,10,25.00,EUR,1.00,,250.00,,",
            "Withdraw,2020-11-30 16:00:00,,,,,,,,,-300.00,,",
        ]);
        let flows = CsvHistory::parse_cash_flows(csv.as_bytes(), "x.csv").unwrap();

        assert_eq!(flows.len(), 2);
        assert_eq!(flows[0].kind, CashFlowKind::Deposit);
        assert_eq!(flows[0].total, d("1000"));
        assert_eq!(flows[1].kind, CashFlowKind::Withdrawal);
        assert_eq!(flows[1].signed_amount(), d("-300"));
        assert_eq!(flows[1].year(), 2020);
    }

    #[test]
    fn test_cash_flow_without_total_reports_line() {
        let csv = export(&[
            "Deposit,2020-01-01 09:00:00,,,,,,,,,1000.00,,",
            "Withdraw,2020-02-01 09:00:00,,,,,,,,,,,",
        ]);
        match CsvHistory::parse_cash_flows(csv.as_bytes(), "cash.csv").unwrap_err() {
            HistoryError::Csv { file, message } => {
                assert_eq!(file, "cash.csv");
                assert!(message.starts_with("line 3:"), "got {}", message);
                assert!(message.contains("Total (EUR)"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let history = CsvHistory::new("/definitely/not/here");
        assert!(matches!(
            history.read_transactions().await,
            Err(HistoryError::Missing(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_directory_is_missing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a csv").unwrap();
        let history = CsvHistory::new(dir.path());
        assert!(matches!(
            history.read_transactions().await,
            Err(HistoryError::Missing(_))
        ));
    }

    #[tokio::test]
    async fn test_reads_all_csv_files_in_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("2020.csv"),
            export(&["Market buy,2020-01-02 10:00:00,US0378331005,AAPL,Apple,1,300,USD,1.1,,,,"]),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("2021.CSV"),
            export(&["Market sell,2021-01-02 10:00:00,US0378331005,AAPL,Apple,1,320,USD,1.1,,,,"]),
        )
        .unwrap();

        let history = CsvHistory::new(dir.path());
        let txs = history.read_transactions().await.unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].year(), 2020);
        assert_eq!(txs[1].year(), 2021);
    }

    #[tokio::test]
    async fn test_single_file_history() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("all.csv");
        std::fs::write(
            &file,
            export(&["Market buy,2020-01-02 10:00:00,US0378331005,AAPL,Apple,1,300,USD,1.1,,,,"]),
        )
        .unwrap();

        let txs = CsvHistory::new(&file).read_transactions().await.unwrap();
        assert_eq!(txs.len(), 1);
    }
}
