//! Lot: the unit of quantity consumed by FIFO matching.

use crate::domain::Decimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A quantity of one instrument bought or sold at a single time and price.
///
/// Lots are never mutated; partial consumption produces new values via
/// [`Lot::split`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub timestamp: NaiveDateTime,
    pub quantity: Decimal,
    /// Base-currency price per unit.
    pub price_per_unit: Decimal,
}

impl Lot {
    pub fn new(timestamp: NaiveDateTime, quantity: Decimal, price_per_unit: Decimal) -> Self {
        Self {
            timestamp,
            quantity,
            price_per_unit,
        }
    }

    /// Split off `quantity` units.
    ///
    /// Returns the consumed fragment and the remainder, if any. A remainder
    /// below the precision guard is dropped. Price and timestamp are shared
    /// by both halves.
    pub fn split(&self, quantity: Decimal) -> (Lot, Option<Lot>) {
        let consumed = Lot {
            quantity,
            ..*self
        };
        let remaining = self.quantity - quantity;
        let remainder = if remaining.is_exhausted() {
            None
        } else {
            Some(Lot {
                quantity: remaining,
                ..*self
            })
        };
        (consumed, remainder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn lot(quantity: &str, price: &str) -> Lot {
        let ts = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Lot::new(ts, d(quantity), d(price))
    }

    #[test]
    fn test_split_partial() {
        let original = lot("10", "2.5");
        let (consumed, remainder) = original.split(d("4"));

        assert_eq!(consumed.quantity, d("4"));
        assert_eq!(consumed.price_per_unit, d("2.5"));
        assert_eq!(consumed.timestamp, original.timestamp);

        let remainder = remainder.expect("remainder expected");
        assert_eq!(remainder.quantity, d("6"));
        assert_eq!(remainder.price_per_unit, d("2.5"));
    }

    #[test]
    fn test_split_whole_leaves_no_remainder() {
        let (consumed, remainder) = lot("10", "1").split(d("10"));
        assert_eq!(consumed.quantity, d("10"));
        assert!(remainder.is_none());
    }

    #[test]
    fn test_split_residue_below_guard_is_dropped() {
        let (_, remainder) = lot("1.0000000000005", "1").split(d("1"));
        assert!(remainder.is_none());
    }

    #[test]
    fn test_split_does_not_touch_original() {
        let original = lot("3", "7");
        let _ = original.split(d("1"));
        assert_eq!(original.quantity, d("3"));
    }
}
