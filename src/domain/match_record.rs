//! Outputs of FIFO matching: per-pair match records and report rows.

use crate::domain::{Decimal, Isin, Lot, Ticker};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One FIFO pairing of a buy fragment against a sell fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub matched_quantity: Decimal,
    pub buy_timestamp: NaiveDateTime,
    pub buy_price_per_unit: Decimal,
    pub sell_timestamp: NaiveDateTime,
    pub sell_price_per_unit: Decimal,
    /// `matched_quantity * (sell_price_per_unit - buy_price_per_unit)`.
    pub realized_result: Decimal,
}

impl MatchRecord {
    /// Build a record from two equally sized fragments.
    pub fn from_fragments(buy: &Lot, sell: &Lot) -> Self {
        let matched_quantity = sell.quantity;
        Self {
            matched_quantity,
            buy_timestamp: buy.timestamp,
            buy_price_per_unit: buy.price_per_unit,
            sell_timestamp: sell.timestamp,
            sell_price_per_unit: sell.price_per_unit,
            realized_result: matched_quantity * (sell.price_per_unit - buy.price_per_unit),
        }
    }

    /// Realization is attributed to the year of the sale.
    pub fn tax_year(&self) -> i32 {
        self.sell_timestamp.year()
    }
}

/// Attributes that are constant for every lot of one ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentAttributes {
    pub ticker: Ticker,
    pub isin: Isin,
    pub name: String,
    /// Currency every lot price of the ticker is expressed in.
    pub currency: String,
}

/// A match record joined with its instrument attributes, as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ReportRow {
    pub num_shares: Decimal,
    pub buy_date: NaiveDate,
    pub buy_price_per_share: Decimal,
    pub sell_date: NaiveDate,
    pub sell_price_per_share: Decimal,
    pub ticker: Ticker,
    pub name: String,
    pub isin: Isin,
    pub currency: String,
    pub tax_year: i32,
    pub result: Decimal,
}

impl ReportRow {
    pub fn new(record: &MatchRecord, attributes: &InstrumentAttributes) -> Self {
        Self {
            num_shares: record.matched_quantity,
            buy_date: record.buy_timestamp.date(),
            buy_price_per_share: record.buy_price_per_unit,
            sell_date: record.sell_timestamp.date(),
            sell_price_per_share: record.sell_price_per_unit,
            ticker: attributes.ticker.clone(),
            name: attributes.name.clone(),
            isin: attributes.isin.clone(),
            currency: attributes.currency.clone(),
            tax_year: record.tax_year(),
            result: record.realized_result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn ts(y: i32, m: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_from_fragments_computes_result() {
        let buy = Lot::new(ts(2019, 12, 30), d("4"), d("1.5"));
        let sell = Lot::new(ts(2020, 1, 2), d("4"), d("2"));
        let record = MatchRecord::from_fragments(&buy, &sell);

        assert_eq!(record.matched_quantity, d("4"));
        assert_eq!(record.realized_result, d("2"));
        assert_eq!(record.tax_year(), 2020);
    }

    #[test]
    fn test_loss_is_negative() {
        let buy = Lot::new(ts(2020, 1, 1), d("2"), d("10"));
        let sell = Lot::new(ts(2020, 2, 1), d("2"), d("7"));
        assert_eq!(MatchRecord::from_fragments(&buy, &sell).realized_result, d("-6"));
    }

    #[test]
    fn test_report_row_serializes_with_export_columns() {
        let buy = Lot::new(ts(2020, 1, 1), d("1"), d("10"));
        let sell = Lot::new(ts(2021, 3, 1), d("1"), d("12"));
        let record = MatchRecord::from_fragments(&buy, &sell);
        let attributes = InstrumentAttributes {
            ticker: Ticker::new("VECP"),
            isin: Isin::new("IE00BZ163L38"),
            name: "Vanguard EUR Eurozone Government Bond".to_string(),
            currency: "EUR".to_string(),
        };
        let row = ReportRow::new(&record, &attributes);
        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(json["NUM_SHARES"], serde_json::json!(1.0));
        assert_eq!(json["BUY_DATE"], "2020-01-01");
        assert_eq!(json["SELL_DATE"], "2021-03-01");
        assert_eq!(json["TICKER"], "VECP");
        assert_eq!(json["TAX_YEAR"], 2021);
        assert_eq!(json["RESULT"], serde_json::json!(2.0));
    }
}
