//! English auction engine.
//!
//! Bids are totals, not increments. A bid must strictly exceed the current
//! net price, and only the difference between the new total and what the
//! bidder already has locked is escrowed. Completion is permissionless once
//! `end_at` has passed. Losing deposits stay locked until their owner
//! withdraws them.

use chrono::{DateTime, TimeDelta, Utc};
use openlot_types::{
    AccountId, Amount, Auction, AuctionId, AuctionPhase, ItemId, ItemStatus, LedgerEvent,
    OpenlotError, Resolution, Result, StatusKind,
};
use tracing::debug;

use crate::state::LedgerState;

impl LedgerState {
    /// Put an owned, idle item up for auction starting at `now`.
    ///
    /// # Errors
    /// - `InvalidDuration` if `duration_secs` is zero or above the configured maximum
    /// - `NotOwner` if `seller` does not own the item
    /// - `InvalidState` if the item is already listed or auctioned
    pub(crate) fn create_auction(
        &mut self,
        item_id: ItemId,
        seller: AccountId,
        reserve: Amount,
        duration_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        if duration_secs == 0 {
            return Err(OpenlotError::InvalidDuration {
                reason: "duration must be positive".into(),
            });
        }
        if duration_secs > self.max_auction_duration_secs {
            return Err(OpenlotError::InvalidDuration {
                reason: format!(
                    "{duration_secs}s exceeds maximum {}s",
                    self.max_auction_duration_secs
                ),
            });
        }
        let duration = i64::try_from(duration_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| OpenlotError::InvalidDuration {
                reason: format!("{duration_secs}s out of range"),
            })?;
        let end_at = now
            .checked_add_signed(duration)
            .ok_or_else(|| OpenlotError::InvalidDuration {
                reason: format!("{duration_secs}s from {now} overflows"),
            })?;

        let item = self.registry.get(item_id)?;
        if item.owner != seller {
            return Err(OpenlotError::NotOwner {
                item: item_id,
                caller: seller,
            });
        }
        if item.kind() != StatusKind::Default {
            return Err(OpenlotError::InvalidState {
                reason: format!("{item_id} is {}", item.kind()),
            });
        }

        let auction_id = self.next_auction;
        self.registry
            .set_status(item_id, StatusKind::Default, ItemStatus::Auctioned(auction_id))?;
        self.next_auction = auction_id.next();
        self.auctions.insert(
            auction_id,
            Auction {
                id: auction_id,
                item_id,
                seller,
                reserve,
                net_price: reserve,
                start_at: now,
                end_at,
                highest_bidder: None,
                bid_count: 0,
                resolution: None,
            },
        );

        debug!(
            auction = %auction_id,
            item = %item_id,
            reserve = %reserve,
            end_at = %end_at,
            "Auction created"
        );
        Ok(LedgerEvent::AuctionCreated {
            auction_id,
            item_id,
            seller,
            reserve,
            start_at: now,
            end_at,
        })
    }

    /// Raise `bidder`'s total on an open auction to `amount`.
    ///
    /// The check runs against the committed net price, so a bid built from
    /// a stale read fails with `BidTooLow` once another bid has landed.
    ///
    /// # Errors
    /// - `AuctionClosed` if the auction is not open at `now`
    /// - `SelfBidBlocked` if `bidder` is the seller
    /// - `BidTooLow` if `amount` does not strictly exceed the net price
    /// - `InsufficientFunds` if the bidder cannot escrow the increment
    pub(crate) fn bid(
        &mut self,
        auction_id: AuctionId,
        bidder: AccountId,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        let auction = self
            .auctions
            .get(&auction_id)
            .ok_or(OpenlotError::AuctionNotFound(auction_id))?;
        if auction.phase(now) != AuctionPhase::Open {
            return Err(OpenlotError::AuctionClosed(auction_id));
        }
        if bidder == auction.seller {
            return Err(OpenlotError::SelfBidBlocked(auction_id));
        }
        if amount <= auction.net_price {
            return Err(OpenlotError::BidTooLow {
                bid: amount,
                net_price: auction.net_price,
            });
        }
        let item_id = auction.item_id;

        // Any existing deposit is at most the net price, so the increment is
        // always positive here.
        let escrowed = self
            .escrow
            .top_up(&mut self.balances, auction_id, bidder, amount)
            .map_err(|e| match e {
                OpenlotError::InvalidAmount { reason } | OpenlotError::InvalidState { reason } => {
                    OpenlotError::Internal(format!("deposit top-up on {auction_id}: {reason}"))
                }
                other => other,
            })?;
        self.supply.record_escrow(auction_id, escrowed)?;

        let auction = self
            .auctions
            .get_mut(&auction_id)
            .ok_or(OpenlotError::AuctionNotFound(auction_id))?;
        auction.net_price = amount;
        auction.highest_bidder = Some(bidder);
        auction.bid_count = auction.bid_count.saturating_add(1);

        debug!(
            auction = %auction_id,
            bidder = %bidder,
            amount = %amount,
            escrowed = %escrowed,
            "Bid placed"
        );
        Ok(LedgerEvent::BidPlaced {
            auction_id,
            item_id,
            bidder,
            amount,
            escrowed,
        })
    }

    /// Finalize an expired auction. Anyone may call this.
    ///
    /// With a highest bidder, their deposit is paid to the seller and the
    /// item changes hands. Without one, the item simply returns to idle.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the auction is expired and unresolved.
    pub(crate) fn complete_auction(
        &mut self,
        auction_id: AuctionId,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        let auction = self
            .auctions
            .get(&auction_id)
            .ok_or(OpenlotError::AuctionNotFound(auction_id))?;
        let phase = auction.phase(now);
        if phase != AuctionPhase::ExpiredUnresolved {
            return Err(OpenlotError::InvalidState {
                reason: format!("{auction_id} is {phase}"),
            });
        }
        let (item_id, seller, net_price, highest) = (
            auction.item_id,
            auction.seller,
            auction.net_price,
            auction.highest_bidder,
        );

        let resolution = match highest {
            Some(winner) => {
                let paid = self
                    .escrow
                    .claim(&mut self.balances, auction_id, winner, seller)?;
                self.supply.record_release(auction_id, paid)?;
                if paid != net_price {
                    return Err(OpenlotError::EscrowInvariantViolation {
                        reason: format!(
                            "{auction_id}: winning deposit {paid} != net price {net_price}"
                        ),
                    });
                }
                self.registry.transfer_ownership(item_id, winner)?;
                Resolution::Sold {
                    winner,
                    price: net_price,
                }
            }
            None => Resolution::Unsold,
        };
        self.registry
            .set_status(item_id, StatusKind::Auctioned, ItemStatus::Default)?;

        let auction = self
            .auctions
            .get_mut(&auction_id)
            .ok_or(OpenlotError::AuctionNotFound(auction_id))?;
        auction.resolution = Some(resolution);

        debug!(
            auction = %auction_id,
            item = %item_id,
            winner = ?highest,
            price = %net_price,
            "Auction completed"
        );
        Ok(LedgerEvent::AuctionCompleted {
            auction_id,
            item_id,
            seller,
            winner: highest,
            price: net_price,
        })
    }

    /// Release a losing bidder's deposit after completion.
    ///
    /// # Errors
    /// - `InvalidState` if the auction has not completed
    /// - `NothingToWithdraw` for the winner, a non-bidder, or a repeat call
    pub(crate) fn withdraw_bid(
        &mut self,
        auction_id: AuctionId,
        bidder: AccountId,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        let auction = self
            .auctions
            .get(&auction_id)
            .ok_or(OpenlotError::AuctionNotFound(auction_id))?;
        let phase = auction.phase(now);
        if phase != AuctionPhase::Completed {
            return Err(OpenlotError::InvalidState {
                reason: format!("{auction_id} is {phase}"),
            });
        }
        if auction.winner() == Some(bidder) {
            return Err(OpenlotError::NothingToWithdraw {
                auction: auction_id,
                bidder,
            });
        }

        let amount = self
            .escrow
            .withdraw(&mut self.balances, auction_id, bidder)?;
        self.supply.record_release(auction_id, amount)?;

        debug!(auction = %auction_id, bidder = %bidder, amount = %amount, "Bid withdrawn");
        Ok(LedgerEvent::BidWithdrawn {
            auction_id,
            bidder,
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use openlot_types::{DepositState, Intent, MarketConfig};

    use super::*;

    fn acct(b: u8) -> AccountId {
        AccountId([b; 32])
    }

    /// Item 1 owned by acct(1); acct(2) and acct(3) funded; auction 1 open
    /// with reserve 50 for 60 seconds from the returned start time.
    fn setup() -> (LedgerState, DateTime<Utc>) {
        let mut state = LedgerState::new(&MarketConfig::default());
        let t0 = Utc::now();
        state
            .apply(acct(1), &Intent::Mint { metadata_uri: "meta://a".into() }, t0)
            .unwrap();
        state.apply(acct(2), &Intent::ClaimFaucet, t0).unwrap();
        state.apply(acct(3), &Intent::ClaimFaucet, t0).unwrap();
        state
            .create_auction(ItemId(1), acct(1), Amount(50), 60, t0)
            .unwrap();
        (state, t0)
    }

    fn after(t0: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
        t0 + TimeDelta::seconds(secs)
    }

    #[test]
    fn create_auction_validation() {
        let mut state = LedgerState::new(&MarketConfig::default());
        let now = Utc::now();
        state
            .apply(acct(1), &Intent::Mint { metadata_uri: "meta://a".into() }, now)
            .unwrap();
        assert!(matches!(
            state
                .create_auction(ItemId(1), acct(1), Amount(50), 0, now)
                .unwrap_err(),
            OpenlotError::InvalidDuration { .. }
        ));
        assert!(matches!(
            state
                .create_auction(ItemId(1), acct(1), Amount(50), u64::MAX, now)
                .unwrap_err(),
            OpenlotError::InvalidDuration { .. }
        ));
        assert!(matches!(
            state
                .create_auction(ItemId(1), acct(2), Amount(50), 60, now)
                .unwrap_err(),
            OpenlotError::NotOwner { .. }
        ));

        state
            .create_auction(ItemId(1), acct(1), Amount(50), 60, now)
            .unwrap();
        let auction = state.auction(AuctionId(1)).unwrap();
        assert_eq!(auction.net_price, Amount(50));
        assert_eq!(auction.end_at, after(now, 60));
        assert_eq!(
            state.item(ItemId(1)).unwrap().status,
            ItemStatus::Auctioned(AuctionId(1))
        );
        assert!(matches!(
            state
                .create_auction(ItemId(1), acct(1), Amount(50), 60, now)
                .unwrap_err(),
            OpenlotError::InvalidState { .. }
        ));
    }

    #[test]
    fn bids_must_strictly_increase() {
        let (mut state, t0) = setup();
        let a = AuctionId(1);
        assert!(matches!(
            state.bid(a, acct(2), Amount(50), t0).unwrap_err(),
            OpenlotError::BidTooLow { .. }
        ));
        state.bid(a, acct(2), Amount(60), t0).unwrap();
        assert!(matches!(
            state.bid(a, acct(3), Amount(60), t0).unwrap_err(),
            OpenlotError::BidTooLow { .. }
        ));
        assert_eq!(state.auction(a).unwrap().highest_bidder, Some(acct(2)));
        assert!(matches!(
            state.bid(a, acct(1), Amount(100), t0).unwrap_err(),
            OpenlotError::SelfBidBlocked(_)
        ));
    }

    #[test]
    fn raising_own_bid_escrows_delta() {
        let (mut state, t0) = setup();
        let a = AuctionId(1);
        let ev = state.bid(a, acct(2), Amount(60), t0).unwrap();
        assert!(matches!(ev, LedgerEvent::BidPlaced { escrowed: Amount(60), .. }));
        let ev = state.bid(a, acct(2), Amount(70), t0).unwrap();
        assert!(matches!(ev, LedgerEvent::BidPlaced { escrowed: Amount(10), .. }));
        assert_eq!(state.locked(a, acct(2)), Amount(70));
        assert_eq!(state.balance(acct(2)).escrowed, Amount(70));
        assert_eq!(state.auction(a).unwrap().bid_count, 2);
        state.verify_invariants().unwrap();
    }

    #[test]
    fn no_bids_after_expiry() {
        let (mut state, t0) = setup();
        assert!(matches!(
            state
                .bid(AuctionId(1), acct(2), Amount(60), after(t0, 60))
                .unwrap_err(),
            OpenlotError::AuctionClosed(_)
        ));
    }

    #[test]
    fn complete_requires_expiry() {
        let (mut state, t0) = setup();
        assert!(matches!(
            state.complete_auction(AuctionId(1), t0).unwrap_err(),
            OpenlotError::InvalidState { .. }
        ));
        state.complete_auction(AuctionId(1), after(t0, 61)).unwrap();
        assert!(matches!(
            state
                .complete_auction(AuctionId(1), after(t0, 62))
                .unwrap_err(),
            OpenlotError::InvalidState { .. }
        ));
    }

    #[test]
    fn complete_without_bids_returns_item() {
        let (mut state, t0) = setup();
        let ev = state.complete_auction(AuctionId(1), after(t0, 61)).unwrap();
        assert!(matches!(ev, LedgerEvent::AuctionCompleted { winner: None, .. }));
        let item = state.item(ItemId(1)).unwrap();
        assert_eq!(item.owner, acct(1));
        assert_eq!(item.status, ItemStatus::Default);
        assert_eq!(
            state.auction(AuctionId(1)).unwrap().resolution,
            Some(Resolution::Unsold)
        );
    }

    #[test]
    fn settle_and_withdraw() {
        let (mut state, t0) = setup();
        let a = AuctionId(1);
        state.bid(a, acct(2), Amount(60), t0).unwrap();
        state.bid(a, acct(3), Amount(80), t0).unwrap();

        assert!(matches!(
            state.withdraw_bid(a, acct(2), t0).unwrap_err(),
            OpenlotError::InvalidState { .. }
        ));

        let done = after(t0, 61);
        state.complete_auction(a, done).unwrap();
        assert_eq!(state.item(ItemId(1)).unwrap().owner, acct(3));
        assert_eq!(state.balance(acct(1)).available, Amount(80));
        assert_eq!(state.proceeds(acct(1)), Amount(80));
        assert_eq!(state.deposit(a, acct(3)).unwrap().state, DepositState::Claimed);
        assert_eq!(state.locked(a, acct(2)), Amount(60));

        assert!(matches!(
            state.withdraw_bid(a, acct(3), done).unwrap_err(),
            OpenlotError::NothingToWithdraw { .. }
        ));
        let ev = state.withdraw_bid(a, acct(2), done).unwrap();
        assert!(matches!(ev, LedgerEvent::BidWithdrawn { amount: Amount(60), .. }));
        assert!(matches!(
            state.withdraw_bid(a, acct(2), done).unwrap_err(),
            OpenlotError::NothingToWithdraw { .. }
        ));
        state.verify_invariants().unwrap();
    }
}
