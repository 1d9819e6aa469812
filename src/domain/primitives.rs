//! Domain primitives: Ticker, Isin, Action, Side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ticker symbol (e.g., "AAPL", "VECP").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ticker(pub String);

impl Ticker {
    pub fn new(ticker: impl Into<String>) -> Self {
        Ticker(ticker.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instrument identifier (ISIN).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Isin(pub String);

impl Isin {
    pub fn new(isin: impl Into<String>) -> Self {
        Isin(isin.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Isin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade side of a position transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Action kind as written in the broker's history export.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    MarketBuy,
    MarketSell,
    DividendOrdinary,
    Deposit,
    Withdraw,
    /// Any other action; never reaches the FIFO engine.
    Other(String),
}

impl Action {
    /// The trade side for actions that move a position.
    pub fn side(&self) -> Option<Side> {
        match self {
            Action::MarketBuy => Some(Side::Buy),
            Action::MarketSell => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Action::MarketBuy => "Market buy",
            Action::MarketSell => "Market sell",
            Action::DividendOrdinary => "Dividend (Ordinary)",
            Action::Deposit => "Deposit",
            Action::Withdraw => "Withdraw",
            Action::Other(s) => s,
        }
    }
}

impl FromStr for Action {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "Market buy" => Action::MarketBuy,
            "Market sell" => Action::MarketSell,
            "Dividend (Ordinary)" => Action::DividendOrdinary,
            "Deposit" => Action::Deposit,
            "Withdraw" | "Withdrawal" => Action::Withdraw,
            other => Action::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
