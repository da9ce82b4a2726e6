//! # Deposit: a bidder's escrowed funds for one auction
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────┐  auction sold to this bidder  ┌─────────┐
//!   │ LOCKED ├──────────────────────────────▶│ CLAIMED │
//!   └───┬────┘                               └─────────┘
//!       │ withdrawBid after completion
//!       ▼
//!   ┌──────────┐
//!   │ RELEASED │
//!   └──────────┘
//! ```
//!
//! While `Locked` the amount only grows: raising a bid tops up the same
//! record by the difference. Both exits zero the amount, so a deposit can
//! be paid out at most once.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, AuctionId, OpenlotError, Result};

/// Lifecycle state of a deposit. Transitions never go backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepositState {
    /// Funds held in escrow; may be topped up.
    Locked,
    /// Paid to the seller as the winning bid. **Irreversible.**
    Claimed,
    /// Returned to the bidder. **Irreversible.**
    Released,
}

impl DepositState {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Locked, Self::Claimed | Self::Released))
    }
}

impl std::fmt::Display for DepositState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked => write!(f, "LOCKED"),
            Self::Claimed => write!(f, "CLAIMED"),
            Self::Released => write!(f, "RELEASED"),
        }
    }
}

/// Cumulative escrow held for one (auction, bidder) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub auction_id: AuctionId,
    pub bidder: AccountId,
    /// Currently held amount. Zero once claimed or released.
    pub amount: Amount,
    pub state: DepositState,
}

impl Deposit {
    #[must_use]
    pub fn new(auction_id: AuctionId, bidder: AccountId) -> Self {
        Self {
            auction_id,
            bidder,
            amount: Amount::ZERO,
            state: DepositState::Locked,
        }
    }

    /// Raise the held amount to `new_total`, returning the increment that
    /// must be escrowed. Never re-escrows what is already held.
    ///
    /// # Errors
    /// - `InvalidState` if the deposit is no longer locked
    /// - `InvalidAmount` if `new_total` does not exceed the held amount
    pub fn top_up_to(&mut self, new_total: Amount) -> Result<Amount> {
        if self.state != DepositState::Locked {
            return Err(OpenlotError::InvalidState {
                reason: format!(
                    "deposit of {} on {} is {}",
                    self.bidder, self.auction_id, self.state
                ),
            });
        }
        let delta = new_total
            .checked_sub(self.amount)
            .filter(|d| !d.is_zero())
            .ok_or_else(|| OpenlotError::InvalidAmount {
                reason: format!(
                    "new total {new_total} does not exceed held deposit {}",
                    self.amount
                ),
            })?;
        self.amount = new_total;
        Ok(delta)
    }

    /// Mark as claimed by the seller, returning the amount paid out.
    ///
    /// # Errors
    /// Returns `InvalidState` if the deposit is not locked.
    pub fn mark_claimed(&mut self) -> Result<Amount> {
        self.exit(DepositState::Claimed)
    }

    /// Mark as released to the bidder, returning the amount paid out.
    ///
    /// # Errors
    /// Returns `NothingToWithdraw` if the deposit is not locked or is empty.
    pub fn mark_released(&mut self) -> Result<Amount> {
        if self.state != DepositState::Locked || self.amount.is_zero() {
            return Err(OpenlotError::NothingToWithdraw {
                auction: self.auction_id,
                bidder: self.bidder,
            });
        }
        self.exit(DepositState::Released)
    }

    fn exit(&mut self, target: DepositState) -> Result<Amount> {
        if !self.state.can_transition_to(target) {
            return Err(OpenlotError::InvalidState {
                reason: format!(
                    "cannot move deposit of {} on {} from {} to {target}",
                    self.bidder, self.auction_id, self.state
                ),
            });
        }
        let paid = self.amount;
        self.amount = Amount::ZERO;
        self.state = target;
        Ok(paid)
    }
}
