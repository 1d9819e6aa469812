use thiserror::Error;

use crate::domain::{Decimal, Lot, MatchRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FifoError {
    #[error("insufficient buy history to cover sells: {outstanding} units left unmatched")]
    InsufficientHistory { outstanding: Decimal },
}

/// Pairs sells against the oldest unsold buys.
///
/// Both inputs must be in chronological order (see
/// [`LotNormalizer`](super::LotNormalizer)). The matcher keeps a cursor into
/// each slice plus the partially consumed lot of each side.
#[derive(Debug)]
pub struct FifoMatcher<'a> {
    buys: &'a [Lot],
    sells: &'a [Lot],
    next_buy: usize,
    next_sell: usize,
    current_buy: Option<Lot>,
    current_sell: Option<Lot>,
}

impl<'a> FifoMatcher<'a> {
    pub fn new(buys: &'a [Lot], sells: &'a [Lot]) -> Self {
        Self {
            buys,
            sells,
            next_buy: 0,
            next_sell: 0,
            current_buy: None,
            current_sell: None,
        }
    }

    /// Consume every sell and return the match records in order.
    ///
    /// Unsold buys left over at the end are not an error.
    ///
    /// # Errors
    /// `InsufficientHistory` when the buys run out before the sells do. No
    /// partial result is returned in that case.
    pub fn run(mut self) -> Result<Vec<MatchRecord>, FifoError> {
        let mut records = Vec::with_capacity(self.sells.len());

        while let Some(sell) = self.take_sell() {
            let Some(buy) = self.take_buy() else {
                return Err(FifoError::InsufficientHistory {
                    outstanding: sell.quantity + self.queued_sell_quantity(),
                });
            };

            if sell.quantity >= buy.quantity {
                let (sell_fragment, sell_rest) = sell.split(buy.quantity);
                records.push(MatchRecord::from_fragments(&buy, &sell_fragment));
                self.current_sell = sell_rest;
            } else {
                let (buy_fragment, buy_rest) = buy.split(sell.quantity);
                records.push(MatchRecord::from_fragments(&buy_fragment, &sell));
                self.current_buy = buy_rest;
            }
        }

        Ok(records)
    }

    /// Held sell remainder, else the next queued sell.
    fn take_sell(&mut self) -> Option<Lot> {
        self.current_sell.take().or_else(|| {
            let lot = self.sells.get(self.next_sell).copied();
            self.next_sell += usize::from(lot.is_some());
            lot
        })
    }

    fn take_buy(&mut self) -> Option<Lot> {
        self.current_buy.take().or_else(|| {
            let lot = self.buys.get(self.next_buy).copied();
            self.next_buy += usize::from(lot.is_some());
            lot
        })
    }

    fn queued_sell_quantity(&self) -> Decimal {
        self.sells[self.next_sell..].iter().map(|l| l.quantity).sum()
    }
}

/// Run FIFO matching over chronologically ordered buy and sell lots.
pub fn match_lots(buys: &[Lot], sells: &[Lot]) -> Result<Vec<MatchRecord>, FifoError> {
    FifoMatcher::new(buys, sells).run()
}
