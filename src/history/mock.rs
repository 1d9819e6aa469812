//! In-memory history for tests.

use super::{HistoryError, HistorySource};
use crate::domain::{CashFlow, Dividend, Transaction};
use async_trait::async_trait;

/// History that returns predefined rows.
#[derive(Debug, Clone, Default)]
pub struct MockHistory {
    transactions: Vec<Transaction>,
    dividends: Vec<Dividend>,
    cash_flows: Vec<CashFlow>,
    failure: Option<String>,
}

impl MockHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    pub fn with_transactions(mut self, transactions: Vec<Transaction>) -> Self {
        self.transactions.extend(transactions);
        self
    }

    pub fn with_dividend(mut self, dividend: Dividend) -> Self {
        self.dividends.push(dividend);
        self
    }

    pub fn with_cash_flow(mut self, cash_flow: CashFlow) -> Self {
        self.cash_flows.push(cash_flow);
        self
    }

    /// Make every read fail with a CSV error carrying `message`.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    fn check(&self) -> Result<(), HistoryError> {
        match &self.failure {
            Some(message) => Err(HistoryError::Csv {
                file: "mock".to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl HistorySource for MockHistory {
    async fn read_transactions(&self) -> Result<Vec<Transaction>, HistoryError> {
        self.check()?;
        Ok(self.transactions.clone())
    }

    async fn read_dividends(&self) -> Result<Vec<Dividend>, HistoryError> {
        self.check()?;
        Ok(self.dividends.clone())
    }

    async fn read_cash_flows(&self) -> Result<Vec<CashFlow>, HistoryError> {
        self.check()?;
        Ok(self.cash_flows.clone())
    }
}
