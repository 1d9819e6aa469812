//! Cash moved into or out of the account.

use crate::domain::{Action, Decimal};
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowKind {
    Deposit,
    Withdrawal,
}

impl CashFlowKind {
    /// The kind of cash flow an action records, if any.
    pub fn from_action(action: &Action) -> Option<Self> {
        match action {
            Action::Deposit => Some(CashFlowKind::Deposit),
            Action::Withdraw => Some(CashFlowKind::Withdrawal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CashFlowKind::Deposit => "deposit",
            CashFlowKind::Withdrawal => "withdrawal",
        }
    }
}

/// A deposit or withdrawal, in base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlow {
    pub timestamp: NaiveDateTime,
    pub kind: CashFlowKind,
    /// `Total` column as exported. Some exports sign withdrawals, some don't.
    pub total: Decimal,
}

impl CashFlow {
    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }

    /// Positive for deposits, negative for withdrawals, whatever the export sign.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            CashFlowKind::Deposit => self.total.abs(),
            CashFlowKind::Withdrawal => Decimal::zero() - self.total.abs(),
        }
    }
}

/// Deposits minus withdrawals.
pub fn net_cash_flow(flows: &[CashFlow]) -> Decimal {
    flows.iter().map(CashFlow::signed_amount).sum()
}
