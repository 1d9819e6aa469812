use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::domain::{Decimal, InstrumentAttributes, Lot, Side, Ticker, Transaction};

/// Extra predicate a caller can apply on top of the buy/sell action filter.
pub type TransactionFilter = Arc<dyn Fn(&Transaction) -> bool + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("ticker {ticker} has prices in more than one currency: {}", .currencies.join(", "))]
    MixedCurrencies {
        ticker: Ticker,
        currencies: Vec<String>,
    },
}

/// Chronologically ordered lots of one ticker, ready for FIFO matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLots {
    pub attributes: InstrumentAttributes,
    pub buys: Vec<Lot>,
    pub sells: Vec<Lot>,
}

/// Turns one ticker's raw transactions into buy and sell lots.
#[derive(Clone)]
pub struct LotNormalizer {
    base_currency: String,
    filter: Option<TransactionFilter>,
}

impl fmt::Debug for LotNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LotNormalizer")
            .field("base_currency", &self.base_currency)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

impl LotNormalizer {
    pub fn new(base_currency: impl Into<String>) -> Self {
        Self {
            base_currency: base_currency.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: TransactionFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Normalize transactions of a single ticker.
    ///
    /// Returns `Ok(None)` when no sell survives filtering: there is nothing to
    /// realize. Ties in timestamp keep their input order.
    ///
    /// # Errors
    /// `MixedCurrencies` if the prices cannot be expressed in a single unit.
    pub fn normalize(
        &self,
        transactions: &[Transaction],
    ) -> Result<Option<NormalizedLots>, NormalizeError> {
        let mut kept: Vec<(&Transaction, Side)> = transactions
            .iter()
            .filter_map(|tx| tx.side().map(|side| (tx, side)))
            .filter(|(tx, _)| self.filter.as_ref().map_or(true, |keep| keep(*tx)))
            .collect();

        if !kept.iter().any(|(_, side)| *side == Side::Sell) {
            return Ok(None);
        }

        // Vec::sort_by_key is stable.
        kept.sort_by_key(|(tx, _)| tx.timestamp);

        let resolved: Vec<(Decimal, String)> =
            kept.iter().map(|(tx, _)| self.resolve_price(tx)).collect();

        let (first, _) = kept[0];
        let units: BTreeSet<&str> = resolved.iter().map(|(_, unit)| unit.as_str()).collect();
        if units.len() > 1 {
            return Err(NormalizeError::MixedCurrencies {
                ticker: first.ticker.clone(),
                currencies: units.into_iter().map(str::to_string).collect(),
            });
        }

        let attributes = InstrumentAttributes {
            ticker: first.ticker.clone(),
            isin: first.isin.clone(),
            name: first.name.clone(),
            currency: resolved[0].1.clone(),
        };

        let mut buys = Vec::new();
        let mut sells = Vec::new();
        for ((tx, side), (price, _)) in kept.iter().zip(resolved) {
            let lot = Lot::new(tx.timestamp, tx.quantity, price);
            match side {
                Side::Buy => buys.push(lot),
                Side::Sell => sells.push(lot),
            }
        }

        debug!(
            ticker = %attributes.ticker,
            buys = buys.len(),
            sells = sells.len(),
            currency = %attributes.currency,
            "normalized lots"
        );

        Ok(Some(NormalizedLots {
            attributes,
            buys,
            sells,
        }))
    }

    /// Price per unit and the currency it is expressed in.
    fn resolve_price(&self, tx: &Transaction) -> (Decimal, String) {
        match tx.exchange_rate {
            Some(rate) => (tx.price_per_unit / rate, self.base_currency.clone()),
            None => (
                tx.price_per_unit,
                tx.currency
                    .clone()
                    .unwrap_or_else(|| self.base_currency.clone()),
            ),
        }
    }
}

impl Default for LotNormalizer {
    fn default() -> Self {
        Self::new("EUR")
    }
}
