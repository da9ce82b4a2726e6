//! Authoritative ledger state.
//!
//! `LedgerState` composes the Item Registry, the auction table and the
//! Escrow Ledger into one value. The execution environment never mutates
//! the committed state in place: it clones it into a draft, applies one
//! intent to the draft with [`LedgerState::apply`], checks the invariants,
//! and swaps the draft in only if everything succeeded.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use openlot_escrow::{BalanceManager, EscrowLedger, Faucet, SupplyConservation};
use openlot_types::{
    AccountId, Amount, Auction, AuctionId, AuctionPhase, BalanceEntry, Deposit, Intent, Item,
    ItemId, LedgerEvent, MarketConfig, OpenlotError, Result,
};

use crate::registry::ItemRegistry;

#[derive(Debug, Clone)]
pub struct LedgerState {
    pub(crate) registry: ItemRegistry,
    pub(crate) auctions: BTreeMap<AuctionId, Auction>,
    pub(crate) next_auction: AuctionId,
    pub(crate) balances: BalanceManager,
    pub(crate) escrow: EscrowLedger,
    pub(crate) faucet: Faucet,
    pub(crate) supply: SupplyConservation,
    pub(crate) max_auction_duration_secs: u64,
}

impl LedgerState {
    #[must_use]
    pub fn new(config: &MarketConfig) -> Self {
        Self {
            registry: ItemRegistry::new(),
            auctions: BTreeMap::new(),
            next_auction: AuctionId::FIRST,
            balances: BalanceManager::new(),
            escrow: EscrowLedger::new(),
            faucet: Faucet::new(config.faucet.clone()),
            supply: SupplyConservation::new(),
            max_auction_duration_secs: config.max_auction_duration_secs,
        }
    }

    /// Apply one intent signed by `signer`. On error the state may be half
    /// updated; callers must run this on a draft they can discard.
    pub(crate) fn apply(
        &mut self,
        signer: AccountId,
        intent: &Intent,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        match intent {
            Intent::Mint { metadata_uri } => {
                let item_id = self.registry.mint(signer, metadata_uri.clone(), now);
                Ok(LedgerEvent::ItemMinted {
                    item_id,
                    owner: signer,
                    metadata_uri: metadata_uri.clone(),
                })
            }
            Intent::List { item_id, price } => self.list(*item_id, signer, *price),
            Intent::Unlist { item_id } => self.unlist(*item_id, signer, now),
            Intent::Buy {
                item_id,
                max_payment,
            } => self.buy(*item_id, signer, *max_payment),
            Intent::CreateAuction {
                item_id,
                reserve,
                duration_secs,
            } => self.create_auction(*item_id, signer, *reserve, *duration_secs, now),
            Intent::Bid { auction_id, amount } => self.bid(*auction_id, signer, *amount, now),
            Intent::CompleteAuction { auction_id } => self.complete_auction(*auction_id, now),
            Intent::WithdrawBid { auction_id } => self.withdraw_bid(*auction_id, signer, now),
            Intent::ClaimFaucet => {
                let amount = self.faucet.claim(&mut self.balances, signer, now)?;
                self.supply.record_mint(amount)?;
                Ok(LedgerEvent::FaucetClaimed {
                    account: signer,
                    amount,
                })
            }
        }
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// # Errors
    /// Returns `ItemNotFound` for an unknown id.
    pub fn item(&self, id: ItemId) -> Result<&Item> {
        self.registry.get(id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.registry.iter()
    }

    #[must_use]
    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    /// # Errors
    /// Returns `AuctionNotFound` for an unknown id.
    pub fn auction(&self, id: AuctionId) -> Result<&Auction> {
        self.auctions.get(&id).ok_or(OpenlotError::AuctionNotFound(id))
    }

    pub fn auctions(&self) -> impl Iterator<Item = &Auction> {
        self.auctions.values()
    }

    /// # Errors
    /// Returns `AuctionNotFound` for an unknown id.
    pub fn auction_phase(&self, id: AuctionId, now: DateTime<Utc>) -> Result<AuctionPhase> {
        Ok(self.auction(id)?.phase(now))
    }

    #[must_use]
    pub fn balance(&self, account: AccountId) -> BalanceEntry {
        self.balances.balance(account)
    }

    #[must_use]
    pub fn locked(&self, auction: AuctionId, bidder: AccountId) -> Amount {
        self.escrow.locked(auction, bidder)
    }

    #[must_use]
    pub fn deposit(&self, auction: AuctionId, bidder: AccountId) -> Option<&Deposit> {
        self.escrow.deposit(auction, bidder)
    }

    /// Total ever paid out to `seller` from won auctions.
    #[must_use]
    pub fn proceeds(&self, seller: AccountId) -> Amount {
        self.escrow.proceeds(seller)
    }

    /// # Errors
    /// Returns `Configuration` if the faucet cooldown is not representable.
    pub fn next_faucet_claim(&self, account: AccountId) -> Result<Option<DateTime<Utc>>> {
        self.faucet.next_claim_at(account)
    }

    #[must_use]
    pub fn total_supply(&self) -> Amount {
        self.balances.total_supply()
    }

    // -----------------------------------------------------------------
    // Invariants
    // -----------------------------------------------------------------

    /// Sum of all balances equals everything the faucet ever minted.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` on mismatch.
    pub fn verify_supply(&self) -> Result<()> {
        self.supply.verify_supply(self.balances.total_supply())
    }

    /// Locked deposits for `auction` equal escrowed minus released.
    ///
    /// # Errors
    /// Returns `EscrowInvariantViolation` on mismatch.
    pub fn verify_escrow(&self, auction: AuctionId) -> Result<()> {
        self.supply
            .verify_escrow(auction, self.escrow.locked_total(auction))
    }

    /// Supply plus the escrow invariant of every auction that ever saw a
    /// deposit.
    ///
    /// # Errors
    /// Returns the first violation found.
    pub fn verify_invariants(&self) -> Result<()> {
        self.verify_supply()?;
        for auction in self.escrow.auctions() {
            self.verify_escrow(auction)?;
        }
        for auction in self.supply.tracked_auctions() {
            self.verify_escrow(auction)?;
        }
        Ok(())
    }
}
