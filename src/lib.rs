pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod history;
pub mod report;
pub mod xml;

pub use config::Config;
pub use domain::{
    Action, CashFlow, Decimal, Dividend, Isin, Lot, MatchRecord, ReportRow, Side, Ticker,
    Transaction,
};
pub use engine::{match_lots, FifoError, FifoMatcher, LotNormalizer, NormalizeError};
pub use error::AppError;
pub use history::{CsvHistory, HistoryError, HistorySource, MockHistory};
pub use report::{
    DividendReport, FailurePolicy, FifoPositionReport, FifoReport, ReportError, ReportOptions,
};
