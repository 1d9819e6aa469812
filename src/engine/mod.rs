//! Pure computation engine for FIFO lot matching.
//!
//! [`LotNormalizer`] turns one ticker's transactions into ordered buy and sell
//! lots; [`FifoMatcher`] pairs them into [`MatchRecord`](crate::domain::MatchRecord)s.

pub mod fifo;
pub mod normalizer;

pub use fifo::{match_lots, FifoError, FifoMatcher};
pub use normalizer::{LotNormalizer, NormalizeError, NormalizedLots, TransactionFilter};
