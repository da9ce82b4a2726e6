//! Payment token balances.
//!
//! Tracks per-account balances with available/escrowed accounting.
//! Every mutation either succeeds in full or leaves the balance unchanged.

use std::collections::HashMap;

use openlot_types::{AccountId, Amount, BalanceEntry, OpenlotError, Result};

/// Source of truth for payment token balances.
///
/// The [`EscrowLedger`](crate::EscrowLedger) calls into it to move funds
/// between `available` and `escrowed` when bids are placed, claimed, or
/// withdrawn.
#[derive(Debug, Clone, Default)]
pub struct BalanceManager {
    balances: HashMap<AccountId, BalanceEntry>,
}

impl BalanceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring new supply into an account (faucet drip).
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the balance would not fit.
    pub fn mint(&mut self, account: AccountId, amount: Amount) -> Result<()> {
        self.credit(account, amount)
    }

    /// Add to available balance (receiving side of a transfer or claim).
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the balance would not fit.
    pub fn credit(&mut self, account: AccountId, amount: Amount) -> Result<()> {
        let entry = self.balances.entry(account).or_default();
        entry.available = entry.available.checked_add(amount)?;
        Ok(())
    }

    /// Move `amount` of available balance from `from` to `to`.
    ///
    /// # Errors
    /// - `InsufficientFunds` if `from` has less than `amount` available
    /// - `AmountOverflow` if the receiving balance would not fit
    pub fn transfer(&mut self, from: AccountId, to: AccountId, amount: Amount) -> Result<()> {
        let available = self.balance(from).available;
        let remaining = available
            .checked_sub(amount)
            .ok_or(OpenlotError::InsufficientFunds {
                needed: amount,
                available,
            })?;
        if from != to {
            // Check the receiving side before touching the sender.
            self.balance(to).available.checked_add(amount)?;
        }
        self.balances.entry(from).or_default().available = remaining;
        self.credit(to, amount)
    }

    /// Lock funds (available → escrowed).
    ///
    /// # Errors
    /// Returns `InsufficientFunds` if available < amount.
    pub fn lock(&mut self, account: AccountId, amount: Amount) -> Result<()> {
        let entry = self.balances.get_mut(&account).ok_or(
            OpenlotError::InsufficientFunds {
                needed: amount,
                available: Amount::ZERO,
            },
        )?;

        let available =
            entry
                .available
                .checked_sub(amount)
                .ok_or(OpenlotError::InsufficientFunds {
                    needed: amount,
                    available: entry.available,
                })?;
        let escrowed = entry.escrowed.checked_add(amount)?;

        entry.available = available;
        entry.escrowed = escrowed;
        Ok(())
    }

    /// Unlock funds (escrowed → available). Used when a bidder withdraws.
    ///
    /// # Errors
    /// Returns `InsufficientEscrow` if escrowed < amount.
    pub fn unlock(&mut self, account: AccountId, amount: Amount) -> Result<()> {
        let entry = self
            .balances
            .get_mut(&account)
            .ok_or(OpenlotError::InsufficientEscrow)?;

        let escrowed = entry
            .escrowed
            .checked_sub(amount)
            .ok_or(OpenlotError::InsufficientEscrow)?;
        let available = entry.available.checked_add(amount)?;

        entry.escrowed = escrowed;
        entry.available = available;
        Ok(())
    }

    /// Consume escrowed funds (winning deposit paid to the seller). Escrowed
    /// balance decreases; nothing is added back to available.
    ///
    /// # Errors
    /// Returns `InsufficientEscrow` if escrowed < amount.
    pub fn consume_escrowed(&mut self, account: AccountId, amount: Amount) -> Result<()> {
        let entry = self
            .balances
            .get_mut(&account)
            .ok_or(OpenlotError::InsufficientEscrow)?;

        entry.escrowed = entry
            .escrowed
            .checked_sub(amount)
            .ok_or(OpenlotError::InsufficientEscrow)?;
        Ok(())
    }

    #[must_use]
    pub fn balance(&self, account: AccountId) -> BalanceEntry {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    /// Total supply held across all accounts (available + escrowed).
    #[must_use]
    pub fn total_supply(&self) -> Amount {
        self.balances.values().map(BalanceEntry::total).sum()
    }
}
