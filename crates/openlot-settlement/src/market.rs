//! Fixed-price marketplace: list, unlist, buy.
//!
//! A listing holds no escrow. Nothing is at risk until a buyer acts, so the
//! owner may always unlist. `buy` moves exactly the ask price from buyer to
//! seller and hands over the item in the same draft; if the debit fails the
//! whole draft is dropped.

use chrono::{DateTime, Utc};
use openlot_types::{
    AccountId, Amount, ItemId, ItemStatus, LedgerEvent, Listing, OpenlotError, Resolution, Result,
    StatusKind,
};
use tracing::debug;

use crate::state::LedgerState;

impl LedgerState {
    /// Offer an owned, idle item at `price`.
    ///
    /// # Errors
    /// - `InvalidAmount` if `price` is zero
    /// - `NotOwner` if `seller` does not own the item
    /// - `InvalidState` if the item is already listed or auctioned
    pub(crate) fn list(
        &mut self,
        item_id: ItemId,
        seller: AccountId,
        price: Amount,
    ) -> Result<LedgerEvent> {
        if price.is_zero() {
            return Err(OpenlotError::InvalidAmount {
                reason: "listing price must be positive".into(),
            });
        }
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

        self.registry.set_status(
            item_id,
            StatusKind::Default,
            ItemStatus::Listed(Listing { seller, price }),
        )?;
        debug!(item = %item_id, seller = %seller, price = %price, "Item listed");
        Ok(LedgerEvent::ItemListed {
            item_id,
            seller,
            price,
        })
    }

    /// Withdraw a listing, or cancel an auction that never received a bid.
    ///
    /// # Errors
    /// - `NotOwner` if `seller` does not own the item
    /// - `AuctionHasBids` if the item is auctioned and a bid exists
    /// - `InvalidState` if the item is not on sale
    pub(crate) fn unlist(
        &mut self,
        item_id: ItemId,
        seller: AccountId,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        let item = self.registry.get(item_id)?;
        if item.owner != seller {
            return Err(OpenlotError::NotOwner {
                item: item_id,
                caller: seller,
            });
        }

        let status = item.status;
        match status {
            ItemStatus::Listed(_) => {
                self.registry
                    .set_status(item_id, StatusKind::Listed, ItemStatus::Default)?;
                debug!(item = %item_id, seller = %seller, "Listing withdrawn");
                Ok(LedgerEvent::ItemUnlisted { item_id, seller })
            }
            ItemStatus::Auctioned(auction_id) => {
                let auction = self
                    .auctions
                    .get_mut(&auction_id)
                    .ok_or(OpenlotError::AuctionNotFound(auction_id))?;
                if auction.has_bids() {
                    return Err(OpenlotError::AuctionHasBids(auction_id));
                }
                if auction.is_resolved() {
                    return Err(OpenlotError::Internal(format!(
                        "{item_id} still points at resolved {auction_id}"
                    )));
                }
                auction.resolution = Some(Resolution::Cancelled);
                self.registry
                    .set_status(item_id, StatusKind::Auctioned, ItemStatus::Default)?;
                debug!(
                    item = %item_id,
                    auction = %auction_id,
                    expired = now >= auction.end_at,
                    "Auction cancelled"
                );
                Ok(LedgerEvent::AuctionCancelled {
                    auction_id,
                    item_id,
                    seller,
                })
            }
            ItemStatus::Default => Err(OpenlotError::InvalidState {
                reason: format!("{item_id} is not on sale"),
            }),
        }
    }

    /// Pay the ask price of a listed item.
    ///
    /// # Errors
    /// - `InvalidState` if the item is not listed or `buyer` is the seller
    /// - `InsufficientPayment` if `max_payment` is below the ask
    /// - `InsufficientFunds` if the buyer cannot cover the ask
    pub(crate) fn buy(
        &mut self,
        item_id: ItemId,
        buyer: AccountId,
        max_payment: Amount,
    ) -> Result<LedgerEvent> {
        let item = self.registry.get(item_id)?;
        let Some(&Listing { seller, price }) = item.listing() else {
            return Err(OpenlotError::InvalidState {
                reason: format!("{item_id} is {}, not listed", item.kind()),
            });
        };
        if buyer == seller {
            return Err(OpenlotError::InvalidState {
                reason: format!("{buyer} cannot buy own listing {item_id}"),
            });
        }
        if max_payment < price {
            return Err(OpenlotError::InsufficientPayment {
                offered: max_payment,
                price,
            });
        }

        self.balances.transfer(buyer, seller, price)?;
        self.registry.transfer_ownership(item_id, buyer)?;
        self.registry
            .set_status(item_id, StatusKind::Listed, ItemStatus::Default)?;
        debug!(item = %item_id, seller = %seller, buyer = %buyer, price = %price, "Item sold");
        Ok(LedgerEvent::ItemSold {
            item_id,
            seller,
            buyer,
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};
    use openlot_types::{AuctionPhase, Intent, MarketConfig};

    use super::*;

    fn acct(b: u8) -> AccountId {
        AccountId([b; 32])
    }

    /// State with item 1 owned by acct(1) and a funded acct(2).
    fn setup() -> LedgerState {
        let mut state = LedgerState::new(&MarketConfig::default());
        let now = Utc::now();
        state
            .apply(acct(1), &Intent::Mint { metadata_uri: "meta://a".into() }, now)
            .unwrap();
        state.apply(acct(2), &Intent::ClaimFaucet, now).unwrap();
        state
    }

    #[test]
    fn list_requires_owner_and_idle_item() {
        let mut state = setup();
        let id = ItemId(1);
        assert!(matches!(
            state.list(id, acct(2), Amount(100)).unwrap_err(),
            OpenlotError::NotOwner { .. }
        ));
        assert!(matches!(
            state.list(id, acct(1), Amount::ZERO).unwrap_err(),
            OpenlotError::InvalidAmount { .. }
        ));
        state.list(id, acct(1), Amount(100)).unwrap();
        assert!(matches!(
            state.list(id, acct(1), Amount(200)).unwrap_err(),
            OpenlotError::InvalidState { .. }
        ));
    }

    #[test]
    fn unlist_returns_to_default() {
        let mut state = setup();
        let id = ItemId(1);
        state.list(id, acct(1), Amount(100)).unwrap();
        let ev = state.unlist(id, acct(1), Utc::now()).unwrap();
        assert_eq!(ev, LedgerEvent::ItemUnlisted { item_id: id, seller: acct(1) });
        assert_eq!(state.item(id).unwrap().status, ItemStatus::Default);
        assert!(matches!(
            state.unlist(id, acct(1), Utc::now()).unwrap_err(),
            OpenlotError::InvalidState { .. }
        ));
    }

    #[test]
    fn buy_moves_exact_price() {
        let mut state = setup();
        let id = ItemId(1);
        state.list(id, acct(1), Amount(100)).unwrap();
        let before = state.balance(acct(2)).available;

        state.buy(id, acct(2), Amount(150)).unwrap();
        assert_eq!(state.balance(acct(1)).available, Amount(100));
        assert_eq!(
            state.balance(acct(2)).available,
            before.checked_sub(Amount(100)).unwrap()
        );
        let item = state.item(id).unwrap();
        assert_eq!(item.owner, acct(2));
        assert_eq!(item.creator, acct(1));
        assert_eq!(item.status, ItemStatus::Default);
        state.verify_invariants().unwrap();
    }

    #[test]
    fn buy_rejections() {
        let mut state = setup();
        let id = ItemId(1);
        assert!(matches!(
            state.buy(id, acct(2), Amount(100)).unwrap_err(),
            OpenlotError::InvalidState { .. }
        ));
        state.list(id, acct(1), Amount(100)).unwrap();
        assert!(matches!(
            state.buy(id, acct(2), Amount(99)).unwrap_err(),
            OpenlotError::InsufficientPayment { .. }
        ));
        assert!(matches!(
            state.buy(id, acct(1), Amount(100)).unwrap_err(),
            OpenlotError::InvalidState { .. }
        ));
        assert!(matches!(
            state.buy(id, acct(3), Amount(100)).unwrap_err(),
            OpenlotError::InsufficientFunds { .. }
        ));
        assert_eq!(state.item(id).unwrap().kind(), StatusKind::Listed);
    }

    #[test]
    fn unlist_cancels_expired_auction_without_bids() {
        let mut state = setup();
        let id = ItemId(1);
        let t0 = Utc::now();
        let ev = state
            .create_auction(id, acct(1), Amount(50), 60, t0)
            .unwrap();
        let LedgerEvent::AuctionCreated { auction_id, .. } = ev else {
            panic!("unexpected event {ev:?}");
        };

        let later = t0 + TimeDelta::seconds(120);
        state.unlist(id, acct(1), later).unwrap();
        assert_eq!(
            state.auction_phase(auction_id, later).unwrap(),
            AuctionPhase::Completed
        );
        assert_eq!(
            state.auction(auction_id).unwrap().resolution,
            Some(Resolution::Cancelled)
        );
        assert_eq!(state.item(id).unwrap().status, ItemStatus::Default);
    }
}
