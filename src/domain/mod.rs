//! Domain types for FIFO lot tracking.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: Ticker, Isin, Action, Side
//! - Validated Transaction, Dividend and CashFlow records read from history
//! - Lot and MatchRecord, the working unit and output of FIFO matching

pub mod cash_flow;
pub mod decimal;
pub mod dividend;
pub mod lot;
pub mod match_record;
pub mod primitives;
pub mod transaction;

pub use cash_flow::{net_cash_flow, CashFlow, CashFlowKind};
pub use decimal::{Decimal, PRECISION_GUARD};
pub use dividend::Dividend;
pub use lot::Lot;
pub use match_record::{InstrumentAttributes, MatchRecord, ReportRow};
pub use primitives::{Action, Isin, Side, Ticker};
pub use transaction::{parse_timestamp, Transaction, TransactionError};
