//! Per-year and per-ticker aggregation of a [`FifoReport`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::FifoReport;
use crate::domain::{Decimal, ReportRow, Ticker};

/// One ticker's summed result within a tax year, positioned on a waterfall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerResult {
    pub ticker: Ticker,
    pub name: String,
    pub result: Decimal,
    /// Sum of this and every preceding result.
    pub running_total: Decimal,
    /// Where this ticker's bar starts: `running_total - result`.
    pub bar_start: Decimal,
    pub is_profit: bool,
}

/// Results of every ticker realized in one tax year, smallest result first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearResults {
    pub year: i32,
    pub tickers: Vec<TickerResult>,
    pub total: Decimal,
}

/// What was sold of one ticker in one tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub ticker: Ticker,
    pub name: String,
    pub year: i32,
    pub currency: String,
    pub num_shares: Decimal,
    /// Unweighted mean over the year's report rows.
    pub mean_buy_price: Decimal,
    /// Unweighted mean over the year's report rows.
    pub mean_sell_price: Decimal,
    pub result: Decimal,
    pub is_profit: bool,
}

impl TickerSummary {
    /// Human readable paragraph, as shown on the dashboard.
    pub fn describe(&self) -> String {
        format!(
            "For ticker {} ({}) and tax year {}, a total of {} shares were sold.\n\n\
             The average prices are:\n\n\
             - buy price: {} {},\n\
             - sell price: {} {}.\n\n\
             The overall result is a {} of {} {}.",
            self.name,
            self.ticker,
            self.year,
            self.num_shares.to_fixed(5),
            self.mean_buy_price.to_fixed(2),
            self.currency,
            self.mean_sell_price.to_fixed(2),
            self.currency,
            if self.is_profit { "profit" } else { "loss" },
            self.result.to_fixed(2),
            self.currency,
        )
    }
}

impl FifoReport {
    /// Distinct tax years with at least one realized row, ascending.
    pub fn tax_years(&self) -> Vec<i32> {
        self.rows
            .iter()
            .map(|row| row.tax_year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Tickers with realized rows in `year`, sorted.
    pub fn tickers_for_year(&self, year: i32) -> Vec<Ticker> {
        self.rows
            .iter()
            .filter(|row| row.tax_year == year)
            .map(|row| row.ticker.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn rows_for(&self, ticker: &Ticker, year: i32) -> Vec<&ReportRow> {
        self.rows
            .iter()
            .filter(|row| &row.ticker == ticker && row.tax_year == year)
            .collect()
    }

    pub fn year_results(&self, year: i32) -> YearResults {
        let mut per_ticker: BTreeMap<&Ticker, (&str, Decimal)> = BTreeMap::new();
        for row in self.rows.iter().filter(|row| row.tax_year == year) {
            let entry = per_ticker
                .entry(&row.ticker)
                .or_insert((row.name.as_str(), Decimal::zero()));
            entry.1 += row.result;
        }

        let mut sums: Vec<(&Ticker, &str, Decimal)> = per_ticker
            .into_iter()
            .map(|(ticker, (name, result))| (ticker, name, result))
            .collect();
        // Stable, so equal results stay in ticker order.
        sums.sort_by_key(|(_, _, result)| *result);

        let mut running_total = Decimal::zero();
        let tickers = sums
            .into_iter()
            .map(|(ticker, name, result)| {
                running_total += result;
                TickerResult {
                    ticker: ticker.clone(),
                    name: name.to_string(),
                    result,
                    running_total,
                    bar_start: running_total - result,
                    is_profit: !result.is_negative(),
                }
            })
            .collect();

        YearResults {
            year,
            tickers,
            total: running_total,
        }
    }

    /// `None` when the ticker realized nothing in `year`.
    pub fn ticker_summary(&self, ticker: &Ticker, year: i32) -> Option<TickerSummary> {
        let rows = self.rows_for(ticker, year);
        let first = rows.first()?;
        let count = Decimal::from_usize(rows.len());

        let num_shares: Decimal = rows.iter().map(|row| row.num_shares).sum();
        let buy_total: Decimal = rows.iter().map(|row| row.buy_price_per_share).sum();
        let sell_total: Decimal = rows.iter().map(|row| row.sell_price_per_share).sum();
        let result: Decimal = rows.iter().map(|row| row.result).sum();

        Some(TickerSummary {
            ticker: ticker.clone(),
            name: first.name.clone(),
            year,
            currency: first.currency.clone(),
            num_shares,
            mean_buy_price: buy_total.checked_div(count)?,
            mean_sell_price: sell_total.checked_div(count)?,
            result,
            is_profit: !result.is_negative(),
        })
    }
}
