//! Transaction type representing one row of position history.

use crate::domain::{Action, Decimal, Isin, Side, Ticker};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),
    #[error("price per unit must be positive, got {0}")]
    NonPositivePrice(Decimal),
    #[error("exchange rate must be positive, got {0}")]
    NonPositiveExchangeRate(Decimal),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// A buy, sell or other action on a single instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub action: Action,
    pub timestamp: NaiveDateTime,
    pub ticker: Ticker,
    pub isin: Isin,
    /// Instrument name.
    pub name: String,
    /// Number of units; fractional shares allowed.
    pub quantity: Decimal,
    /// Price per unit in the quote currency.
    pub price_per_unit: Decimal,
    /// Quote currency of `price_per_unit`, when the export carries it.
    pub currency: Option<String>,
    /// Quote units per one unit of base currency.
    pub exchange_rate: Option<Decimal>,
}

impl Transaction {
    /// Create a validated Transaction.
    ///
    /// # Errors
    /// Rejects non-positive quantity, price or exchange rate.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        action: Action,
        timestamp: NaiveDateTime,
        ticker: Ticker,
        isin: Isin,
        name: String,
        quantity: Decimal,
        price_per_unit: Decimal,
        currency: Option<String>,
        exchange_rate: Option<Decimal>,
    ) -> Result<Self, TransactionError> {
        if !quantity.is_positive() {
            return Err(TransactionError::NonPositiveQuantity(quantity));
        }
        if !price_per_unit.is_positive() {
            return Err(TransactionError::NonPositivePrice(price_per_unit));
        }
        if let Some(rate) = exchange_rate {
            if !rate.is_positive() {
                return Err(TransactionError::NonPositiveExchangeRate(rate));
            }
        }

        let currency = currency
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(Transaction {
            action,
            timestamp,
            ticker,
            isin,
            name,
            quantity,
            price_per_unit,
            currency,
            exchange_rate,
        })
    }

    pub fn side(&self) -> Option<Side> {
        self.action.side()
    }

    /// Calendar year of the transaction.
    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }
}

/// Parse the `Time` column of a history export.
///
/// Accepts `YYYY-MM-DD HH:MM:SS[.fff]`, the ISO `T` separator, or a bare date
/// (interpreted as midnight).
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, TransactionError> {
    let s = s.trim();
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| TransactionError::InvalidTimestamp(s.to_string()))
}
