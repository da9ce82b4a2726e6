//! Escrow ledger: per-(auction, bidder) deposits and seller proceeds.
//!
//! A bidder holds at most one [`Deposit`] per auction. Raising a bid tops
//! up that record by the difference, so only the increment is ever locked.
//! When the auction completes the winner's deposit is claimed by the seller
//! and every other deposit becomes withdrawable by its bidder.

use std::collections::HashMap;

use openlot_types::{AccountId, Amount, AuctionId, Deposit, OpenlotError, Result};

use crate::balance_manager::BalanceManager;

/// Tracks every deposit and the proceeds each seller has received.
#[derive(Debug, Clone, Default)]
pub struct EscrowLedger {
    deposits: HashMap<(AuctionId, AccountId), Deposit>,
    /// Cumulative auction proceeds credited per seller.
    proceeds: HashMap<AccountId, Amount>,
}

impl EscrowLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise `bidder`'s deposit on `auction` to `new_total`, locking only the
    /// increment from their available balance. Returns the increment.
    ///
    /// If the lock fails (insufficient funds) the deposit is unchanged.
    ///
    /// # Errors
    /// - `InvalidAmount` if `new_total` does not exceed the held deposit
    /// - `InvalidState` if the deposit was already claimed or released
    /// - `InsufficientFunds` if the bidder cannot cover the increment
    pub fn top_up(
        &mut self,
        balances: &mut BalanceManager,
        auction: AuctionId,
        bidder: AccountId,
        new_total: Amount,
    ) -> Result<Amount> {
        let mut deposit = self
            .deposits
            .get(&(auction, bidder))
            .cloned()
            .unwrap_or_else(|| Deposit::new(auction, bidder));

        let delta = deposit.top_up_to(new_total)?;
        balances.lock(bidder, delta)?;

        tracing::debug!(
            auction = %auction,
            bidder = %bidder,
            delta = %delta,
            total = %new_total,
            "Deposit topped up"
        );
        self.deposits.insert((auction, bidder), deposit);
        Ok(delta)
    }

    /// Pay the winning deposit to the seller. The deposit is zeroed and
    /// marked claimed; it can never be withdrawn afterwards.
    ///
    /// # Errors
    /// - `InvalidState` if there is no locked deposit for the winner
    /// - `InsufficientEscrow` if the winner's escrowed balance is short
    pub fn claim(
        &mut self,
        balances: &mut BalanceManager,
        auction: AuctionId,
        winner: AccountId,
        seller: AccountId,
    ) -> Result<Amount> {
        let mut deposit = self
            .deposits
            .get(&(auction, winner))
            .cloned()
            .ok_or_else(|| OpenlotError::InvalidState {
                reason: format!("no deposit from winner {winner} on {auction}"),
            })?;

        let amount = deposit.mark_claimed()?;
        balances.consume_escrowed(winner, amount)?;
        balances.credit(seller, amount)?;

        let earned = self.proceeds.entry(seller).or_default();
        *earned = earned.checked_add(amount)?;
        self.deposits.insert((auction, winner), deposit);

        tracing::debug!(
            auction = %auction,
            winner = %winner,
            seller = %seller,
            amount = %amount,
            "Winning deposit claimed"
        );
        Ok(amount)
    }

    /// Return a losing bidder's full deposit. A second call fails rather
    /// than paying twice.
    ///
    /// # Errors
    /// - `NothingToWithdraw` if there is no live deposit
    /// - `InsufficientEscrow` if the escrowed balance is short
    pub fn withdraw(
        &mut self,
        balances: &mut BalanceManager,
        auction: AuctionId,
        bidder: AccountId,
    ) -> Result<Amount> {
        let mut deposit = self
            .deposits
            .get(&(auction, bidder))
            .cloned()
            .ok_or(OpenlotError::NothingToWithdraw { auction, bidder })?;

        let amount = deposit.mark_released()?;
        balances.unlock(bidder, amount)?;
        self.deposits.insert((auction, bidder), deposit);

        tracing::debug!(
            auction = %auction,
            bidder = %bidder,
            amount = %amount,
            "Deposit released"
        );
        Ok(amount)
    }

    /// Amount currently held for (auction, bidder). Zero if none.
    #[must_use]
    pub fn locked(&self, auction: AuctionId, bidder: AccountId) -> Amount {
        self.deposits
            .get(&(auction, bidder))
            .map_or(Amount::ZERO, |d| d.amount)
    }

    #[must_use]
    pub fn deposit(&self, auction: AuctionId, bidder: AccountId) -> Option<&Deposit> {
        self.deposits.get(&(auction, bidder))
    }

    /// Sum of all amounts currently held for an auction.
    #[must_use]
    pub fn locked_total(&self, auction: AuctionId) -> Amount {
        self.deposits
            .values()
            .filter(|d| d.auction_id == auction)
            .map(|d| d.amount)
            .sum()
    }

    /// Auctions that have ever received a deposit.
    #[must_use]
    pub fn auctions(&self) -> Vec<AuctionId> {
        let mut ids: Vec<AuctionId> = self.deposits.keys().map(|(a, _)| *a).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Cumulative auction proceeds credited to `seller`.
    #[must_use]
    pub fn proceeds(&self, seller: AccountId) -> Amount {
        self.proceeds.get(&seller).copied().unwrap_or_default()
    }
}
