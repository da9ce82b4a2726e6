//! Payment token balance of one account.
//!
//! `available` can be spent on purchases or new bid deltas; `escrowed` is
//! held by live auction deposits and only leaves through a claim or a
//! withdrawal.

use serde::{Deserialize, Serialize};

use crate::Amount;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceEntry {
    pub available: Amount,
    pub escrowed: Amount,
}

impl BalanceEntry {
    /// Total balance (available + escrowed), saturating.
    #[must_use]
    pub fn total(&self) -> Amount {
        Amount(self.available.0.saturating_add(self.escrowed.0))
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available.is_zero() && self.escrowed.is_zero()
    }
}
