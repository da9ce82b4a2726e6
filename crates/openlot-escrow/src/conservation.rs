//! Supply and escrow conservation checks.
//!
//! Independent running totals, updated alongside every balance-moving
//! operation and compared against the actual balances after each intent:
//!
//! ```text
//! Σ(available + escrowed)      == Σ(minted)
//! ∀ auction: Σ(locked deposits) == Σ(escrowed deltas) - Σ(released)
//! ```
//!
//! "Released" covers both the winning deposit paid to the seller and
//! losing deposits returned to bidders. The core only moves what clients
//! deposited; if either equation breaks, value was created or destroyed.

use std::collections::HashMap;

use openlot_types::{Amount, AuctionId, OpenlotError, Result};

/// Escrow flow totals for one auction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscrowFlow {
    pub escrowed: Amount,
    pub released: Amount,
}

/// Running totals used to validate conservation after every intent.
#[derive(Debug, Clone, Default)]
pub struct SupplyConservation {
    /// Total supply brought in since genesis.
    minted: Amount,
    flows: HashMap<AuctionId, EscrowFlow>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns `AmountOverflow` if the running total would not fit.
    pub fn record_mint(&mut self, amount: Amount) -> Result<()> {
        self.minted = self.minted.checked_add(amount)?;
        Ok(())
    }

    /// # Errors
    /// Returns `AmountOverflow` if the running total would not fit.
    pub fn record_escrow(&mut self, auction: AuctionId, delta: Amount) -> Result<()> {
        let flow = self.flows.entry(auction).or_default();
        flow.escrowed = flow.escrowed.checked_add(delta)?;
        Ok(())
    }

    /// # Errors
    /// Returns `AmountOverflow` if the running total would not fit.
    pub fn record_release(&mut self, auction: AuctionId, amount: Amount) -> Result<()> {
        let flow = self.flows.entry(auction).or_default();
        flow.released = flow.released.checked_add(amount)?;
        Ok(())
    }

    #[must_use]
    pub fn expected_supply(&self) -> Amount {
        self.minted
    }

    #[must_use]
    pub fn flow(&self, auction: AuctionId) -> EscrowFlow {
        self.flows.get(&auction).copied().unwrap_or_default()
    }

    /// Auctions with any recorded flow, in id order.
    #[must_use]
    pub fn tracked_auctions(&self) -> Vec<AuctionId> {
        let mut ids: Vec<AuctionId> = self.flows.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Verify that the sum of all balances equals everything ever minted.
    ///
    /// # Errors
    /// Returns [`OpenlotError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify_supply(&self, actual_supply: Amount) -> Result<()> {
        if actual_supply != self.minted {
            return Err(OpenlotError::SupplyInvariantViolation {
                reason: format!(
                    "actual supply {actual_supply} != minted {}",
                    self.minted
                ),
            });
        }
        Ok(())
    }

    /// Verify that what is held for `auction` equals what was escrowed minus
    /// what was released.
    ///
    /// # Errors
    /// Returns [`OpenlotError::EscrowInvariantViolation`] on mismatch, or if
    /// more was released than ever escrowed.
    pub fn verify_escrow(&self, auction: AuctionId, actual_locked: Amount) -> Result<()> {
        let flow = self.flow(auction);
        let expected = flow.escrowed.checked_sub(flow.released).ok_or_else(|| {
            OpenlotError::EscrowInvariantViolation {
                reason: format!(
                    "{auction}: released {} exceeds escrowed {}",
                    flow.released, flow.escrowed
                ),
            }
        })?;
        if actual_locked != expected {
            return Err(OpenlotError::EscrowInvariantViolation {
                reason: format!(
                    "{auction}: locked {actual_locked} != escrowed {} - released {}",
                    flow.escrowed, flow.released
                ),
            });
        }
        Ok(())
    }
}
