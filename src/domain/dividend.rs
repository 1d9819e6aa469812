//! Dividend payment read from history.

use crate::domain::{Decimal, Isin, Ticker};
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// An ordinary dividend paid on a holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dividend {
    pub timestamp: NaiveDateTime,
    pub ticker: Ticker,
    pub isin: Isin,
    pub name: String,
    pub num_shares: Decimal,
    pub price_per_share: Decimal,
    /// Amount credited, in base currency.
    pub total: Decimal,
    /// Tax withheld at source, when reported.
    pub withholding_tax: Option<Decimal>,
}

impl Dividend {
    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }

    /// Amount before withholding (credited total plus tax withheld).
    pub fn gross(&self) -> Decimal {
        self.total + self.withholding_tax.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_gross_adds_withholding() {
        let dividend = Dividend {
            timestamp: NaiveDate::from_ymd_opt(2021, 6, 15)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            ticker: Ticker::new("VECP"),
            isin: Isin::new("IE00BZ163L38"),
            name: "Vanguard".to_string(),
            num_shares: Decimal::from_str_canonical("10").unwrap(),
            price_per_share: Decimal::from_str_canonical("0.05").unwrap(),
            total: Decimal::from_str_canonical("0.43").unwrap(),
            withholding_tax: Some(Decimal::from_str_canonical("0.07").unwrap()),
        };
        assert_eq!(dividend.gross(), Decimal::from_str_canonical("0.5").unwrap());
        assert_eq!(dividend.year(), 2021);
    }
}
