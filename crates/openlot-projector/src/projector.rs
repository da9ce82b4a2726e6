//! Event-sourced fold from the committed log into the read model.
//!
//! The projector consumes events strictly in sequence order. An event it
//! has already applied is skipped, and a jump ahead fails with `EventGap`
//! without touching the view, so the same log can be fed in any number of
//! times, from genesis or from any catch-up point.
//!
//! The read model may lag the ledger. It is for display only and must
//! never back an authorization decision.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use openlot_types::{
    AccountId, Amount, AuctionId, CommittedEvent, EventSeq, ItemId, LedgerEvent, OpenlotError,
    Resolution, Result,
};

use crate::view::{AuctionView, ItemView, ViewStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewProjector {
    items: BTreeMap<ItemId, ItemView>,
    auctions: BTreeMap<AuctionId, AuctionView>,
    deposits: BTreeMap<(AuctionId, AccountId), Amount>,
    next_seq: EventSeq,
}

impl ViewProjector {
    /// Empty view, expecting the genesis event next.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            auctions: BTreeMap::new(),
            deposits: BTreeMap::new(),
            next_seq: EventSeq::GENESIS,
        }
    }

    /// Fold a whole log into a fresh projector.
    ///
    /// # Errors
    /// Returns `EventGap` if the log is not contiguous from genesis.
    pub fn replay<'a>(events: impl IntoIterator<Item = &'a CommittedEvent>) -> Result<Self> {
        let mut projector = Self::new();
        for event in events {
            projector.apply(event)?;
        }
        Ok(projector)
    }

    /// Sequence number of the next event this projector expects.
    #[must_use]
    pub fn next_seq(&self) -> EventSeq {
        self.next_seq
    }

    /// Apply one committed event. Returns `false` if it was already applied.
    ///
    /// # Errors
    /// - `EventGap` if `event.seq` is ahead of [`Self::next_seq`]
    /// - `ItemNotFound` / `AuctionNotFound` if the event refers to something
    ///   the log never created
    pub fn apply(&mut self, committed: &CommittedEvent) -> Result<bool> {
        let seq = committed.seq;
        if seq < self.next_seq {
            return Ok(false);
        }
        if seq != self.next_seq {
            return Err(OpenlotError::EventGap {
                expected: self.next_seq,
                got: seq,
            });
        }

        // Check every referenced record up front so a bad event leaves the
        // view untouched.
        if !matches!(committed.event, LedgerEvent::ItemMinted { .. }) {
            if let Some(item_id) = committed.event.item_id() {
                self.require_item(item_id)?;
            }
            if !matches!(committed.event, LedgerEvent::AuctionCreated { .. }) {
                if let Some(auction_id) = committed.event.auction_id() {
                    self.require_auction(auction_id)?;
                }
            }
        }

        match &committed.event {
            LedgerEvent::ItemMinted {
                item_id,
                owner,
                metadata_uri,
            } => {
                self.items.insert(
                    *item_id,
                    ItemView {
                        item_id: *item_id,
                        owner: *owner,
                        creator: *owner,
                        metadata_uri: metadata_uri.clone(),
                        status: ViewStatus::Default,
                        updated_at: seq,
                    },
                );
            }
            LedgerEvent::ItemListed { item_id, price, .. } => {
                self.touch(*item_id, seq, |item| {
                    item.status = ViewStatus::Listed { price: *price };
                });
            }
            LedgerEvent::ItemUnlisted { item_id, .. } => {
                self.touch(*item_id, seq, |item| item.status = ViewStatus::Default);
            }
            LedgerEvent::ItemSold { item_id, buyer, .. } => {
                self.touch(*item_id, seq, |item| {
                    item.owner = *buyer;
                    item.status = ViewStatus::Default;
                });
            }
            LedgerEvent::AuctionCreated {
                auction_id,
                item_id,
                seller,
                reserve,
                start_at,
                end_at,
            } => {
                self.auctions.insert(
                    *auction_id,
                    AuctionView {
                        auction_id: *auction_id,
                        item_id: *item_id,
                        seller: *seller,
                        reserve: *reserve,
                        net_price: *reserve,
                        start_at: *start_at,
                        end_at: *end_at,
                        highest_bidder: None,
                        bid_count: 0,
                        outcome: None,
                    },
                );
                self.touch(*item_id, seq, |item| {
                    item.status = ViewStatus::Auctioned {
                        auction_id: *auction_id,
                        net_price: *reserve,
                        end_at: *end_at,
                        highest_bidder: None,
                    };
                });
            }
            LedgerEvent::BidPlaced {
                auction_id,
                item_id,
                bidder,
                amount,
                ..
            } => {
                if let Some(auction) = self.auctions.get_mut(auction_id) {
                    auction.net_price = *amount;
                    auction.highest_bidder = Some(*bidder);
                    auction.bid_count = auction.bid_count.saturating_add(1);
                }
                self.deposits.insert((*auction_id, *bidder), *amount);
                self.touch(*item_id, seq, |item| {
                    if let ViewStatus::Auctioned {
                        net_price,
                        highest_bidder,
                        ..
                    } = &mut item.status
                    {
                        *net_price = *amount;
                        *highest_bidder = Some(*bidder);
                    }
                });
            }
            LedgerEvent::AuctionCancelled {
                auction_id,
                item_id,
                ..
            } => {
                if let Some(auction) = self.auctions.get_mut(auction_id) {
                    auction.outcome = Some(Resolution::Cancelled);
                }
                self.touch(*item_id, seq, |item| item.status = ViewStatus::Default);
            }
            LedgerEvent::AuctionCompleted {
                auction_id,
                item_id,
                winner,
                price,
                ..
            } => {
                let outcome = match winner {
                    Some(winner) => Resolution::Sold {
                        winner: *winner,
                        price: *price,
                    },
                    None => Resolution::Unsold,
                };
                if let Some(auction) = self.auctions.get_mut(auction_id) {
                    auction.outcome = Some(outcome);
                }
                if let Some(winner) = winner {
                    self.deposits.remove(&(*auction_id, *winner));
                }
                self.touch(*item_id, seq, |item| {
                    if let Some(winner) = winner {
                        item.owner = *winner;
                    }
                    item.status = ViewStatus::Default;
                });
            }
            LedgerEvent::BidWithdrawn {
                auction_id, bidder, ..
            } => {
                self.deposits.remove(&(*auction_id, *bidder));
            }
            LedgerEvent::FaucetClaimed { .. } => {}
        }

        self.next_seq = seq.next();
        Ok(true)
    }

    fn require_item(&self, id: ItemId) -> Result<()> {
        if self.items.contains_key(&id) {
            Ok(())
        } else {
            Err(OpenlotError::ItemNotFound(id))
        }
    }

    fn require_auction(&self, id: AuctionId) -> Result<()> {
        if self.auctions.contains_key(&id) {
            Ok(())
        } else {
            Err(OpenlotError::AuctionNotFound(id))
        }
    }

    fn touch(&mut self, id: ItemId, seq: EventSeq, update: impl FnOnce(&mut ItemView)) {
        if let Some(item) = self.items.get_mut(&id) {
            update(item);
            item.updated_at = seq;
        }
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&ItemView> {
        self.items.get(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemView> {
        self.items.values()
    }

    #[must_use]
    pub fn auction(&self, id: AuctionId) -> Option<&AuctionView> {
        self.auctions.get(&id)
    }

    /// Everything currently listed or at auction, in id order.
    #[must_use]
    pub fn market_items(&self) -> Vec<&ItemView> {
        self.items.values().filter(|i| i.is_on_sale()).collect()
    }

    #[must_use]
    pub fn owned_by(&self, account: AccountId) -> Vec<&ItemView> {
        self.items.values().filter(|i| i.owner == account).collect()
    }

    /// Items `seller` currently has on sale. The seller keeps ownership
    /// until a sale settles.
    #[must_use]
    pub fn listed_by(&self, seller: AccountId) -> Vec<&ItemView> {
        self.items
            .values()
            .filter(|i| i.owner == seller && i.is_on_sale())
            .collect()
    }

    /// Amount `bidder` has escrowed on `auction` and not yet had claimed or
    /// released.
    #[must_use]
    pub fn deposit_of(&self, auction: AuctionId, bidder: AccountId) -> Amount {
        self.deposits
            .get(&(auction, bidder))
            .copied()
            .unwrap_or_default()
    }

    /// Current leader of the auction the item is in, if any.
    #[must_use]
    pub fn highest_bidder(&self, item: ItemId) -> Option<AccountId> {
        match self.items.get(&item)?.status {
            ViewStatus::Auctioned { highest_bidder, .. } => highest_bidder,
            _ => None,
        }
    }

    /// Whether the item's running auction has reached its end time.
    #[must_use]
    pub fn is_expired(&self, item: ItemId, now: DateTime<Utc>) -> bool {
        matches!(
            self.items.get(&item).map(|i| &i.status),
            Some(ViewStatus::Auctioned { end_at, .. }) if now >= *end_at
        )
    }

    /// Owners ranked by the summed price of what they have on sale,
    /// highest first. Ties break by account.
    #[must_use]
    pub fn top_sellers(&self) -> Vec<(AccountId, Amount)> {
        let mut totals: BTreeMap<AccountId, Amount> = BTreeMap::new();
        for item in self.items.values() {
            if let Some(price) = item.price() {
                let total = totals.entry(item.owner).or_default();
                *total = Amount(total.0.saturating_add(price.0));
            }
        }
        let mut ranked: Vec<(AccountId, Amount)> = totals.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }
}

impl Default for ViewProjector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use openlot_types::IntentId;

    use super::*;

    fn acct(b: u8) -> AccountId {
        AccountId([b; 32])
    }

    struct Log {
        events: Vec<CommittedEvent>,
        t0: DateTime<Utc>,
    }

    impl Log {
        fn new() -> Self {
            Self {
                events: Vec::new(),
                t0: Utc::now(),
            }
        }

        fn push(&mut self, event: LedgerEvent) -> &mut Self {
            let seq = EventSeq(self.events.len() as u64);
            self.events.push(CommittedEvent {
                seq,
                intent_id: IntentId::new(),
                committed_at: self.t0,
                event,
            });
            self
        }
    }

    fn minted(item: u64, owner: u8) -> LedgerEvent {
        LedgerEvent::ItemMinted {
            item_id: ItemId(item),
            owner: acct(owner),
            metadata_uri: format!("meta://{item}"),
        }
    }

    fn auction_log() -> Log {
        let mut log = Log::new();
        let end_at = log.t0 + TimeDelta::seconds(60);
        let start_at = log.t0;
        log.push(minted(1, 1))
            .push(LedgerEvent::AuctionCreated {
                auction_id: AuctionId(1),
                item_id: ItemId(1),
                seller: acct(1),
                reserve: Amount(50),
                start_at,
                end_at,
            })
            .push(LedgerEvent::BidPlaced {
                auction_id: AuctionId(1),
                item_id: ItemId(1),
                bidder: acct(2),
                amount: Amount(60),
                escrowed: Amount(60),
            })
            .push(LedgerEvent::BidPlaced {
                auction_id: AuctionId(1),
                item_id: ItemId(1),
                bidder: acct(3),
                amount: Amount(80),
                escrowed: Amount(80),
            });
        log
    }

    #[test]
    fn listing_and_sale() {
        let mut log = Log::new();
        log.push(minted(1, 1))
            .push(LedgerEvent::ItemListed {
                item_id: ItemId(1),
                seller: acct(1),
                price: Amount(100),
            });
        let view = ViewProjector::replay(&log.events).unwrap();
        assert_eq!(view.market_items().len(), 1);
        assert_eq!(view.listed_by(acct(1)).len(), 1);
        assert_eq!(view.item(ItemId(1)).unwrap().price(), Some(Amount(100)));

        log.push(LedgerEvent::ItemSold {
            item_id: ItemId(1),
            seller: acct(1),
            buyer: acct(2),
            price: Amount(100),
        });
        let view = ViewProjector::replay(&log.events).unwrap();
        let item = view.item(ItemId(1)).unwrap();
        assert_eq!(item.owner, acct(2));
        assert_eq!(item.creator, acct(1));
        assert_eq!(item.status, ViewStatus::Default);
        assert_eq!(item.updated_at, EventSeq(2));
        assert!(view.market_items().is_empty());
        assert_eq!(view.owned_by(acct(2)).len(), 1);
    }

    #[test]
    fn auction_progress() {
        let log = auction_log();
        let view = ViewProjector::replay(&log.events).unwrap();
        assert_eq!(view.highest_bidder(ItemId(1)), Some(acct(3)));
        assert_eq!(view.deposit_of(AuctionId(1), acct(2)), Amount(60));
        assert_eq!(view.item(ItemId(1)).unwrap().price(), Some(Amount(80)));
        assert_eq!(view.auction(AuctionId(1)).unwrap().bid_count, 2);
        assert!(!view.is_expired(ItemId(1), log.t0));
        assert!(view.is_expired(ItemId(1), log.t0 + TimeDelta::seconds(60)));
    }

    #[test]
    fn completion_and_withdrawal() {
        let mut log = auction_log();
        log.push(LedgerEvent::AuctionCompleted {
            auction_id: AuctionId(1),
            item_id: ItemId(1),
            seller: acct(1),
            winner: Some(acct(3)),
            price: Amount(80),
        });
        let view = ViewProjector::replay(&log.events).unwrap();
        assert_eq!(view.item(ItemId(1)).unwrap().owner, acct(3));
        assert_eq!(view.highest_bidder(ItemId(1)), None);
        assert_eq!(view.deposit_of(AuctionId(1), acct(3)), Amount::ZERO);
        assert_eq!(view.deposit_of(AuctionId(1), acct(2)), Amount(60));
        assert_eq!(
            view.auction(AuctionId(1)).unwrap().outcome,
            Some(Resolution::Sold {
                winner: acct(3),
                price: Amount(80)
            })
        );

        log.push(LedgerEvent::BidWithdrawn {
            auction_id: AuctionId(1),
            bidder: acct(2),
            amount: Amount(60),
        });
        let view = ViewProjector::replay(&log.events).unwrap();
        assert_eq!(view.deposit_of(AuctionId(1), acct(2)), Amount::ZERO);
    }

    #[test]
    fn cancelled_auction_returns_item_to_owner() {
        let mut log = Log::new();
        let end_at = log.t0 + TimeDelta::seconds(60);
        let start_at = log.t0;
        log.push(minted(1, 1))
            .push(LedgerEvent::AuctionCreated {
                auction_id: AuctionId(1),
                item_id: ItemId(1),
                seller: acct(1),
                reserve: Amount(50),
                start_at,
                end_at,
            });
        let view = ViewProjector::replay(&log.events).unwrap();
        assert_eq!(view.market_items().len(), 1);
        assert_eq!(view.top_sellers(), vec![(acct(1), Amount(50))]);

        log.push(LedgerEvent::AuctionCancelled {
            auction_id: AuctionId(1),
            item_id: ItemId(1),
            seller: acct(1),
        });
        let view = ViewProjector::replay(&log.events).unwrap();
        let item = view.item(ItemId(1)).unwrap();
        assert_eq!(item.owner, acct(1));
        assert_eq!(item.status, ViewStatus::Default);
        assert_eq!(item.updated_at, EventSeq(2));
        assert_eq!(
            view.auction(AuctionId(1)).unwrap().outcome,
            Some(Resolution::Cancelled)
        );
        assert_eq!(view.highest_bidder(ItemId(1)), None);
        assert!(!view.is_expired(ItemId(1), end_at));
        assert!(view.market_items().is_empty());
        assert!(view.top_sellers().is_empty());
    }

    #[test]
    fn duplicates_skipped_and_gaps_rejected() {
        let log = auction_log();
        let mut view = ViewProjector::new();
        assert!(view.apply(&log.events[0]).unwrap());
        assert!(!view.apply(&log.events[0]).unwrap());

        let before = view.clone();
        let err = view.apply(&log.events[2]).unwrap_err();
        assert!(matches!(
            err,
            OpenlotError::EventGap {
                expected: EventSeq(1),
                got: EventSeq(2)
            }
        ));
        assert_eq!(view, before);

        for ev in &log.events {
            view.apply(ev).unwrap();
        }
        assert_eq!(view, ViewProjector::replay(&log.events).unwrap());
        assert_eq!(view.next_seq(), EventSeq(4));
    }

    #[test]
    fn unknown_item_leaves_view_untouched() {
        let mut log = Log::new();
        log.push(LedgerEvent::ItemListed {
            item_id: ItemId(9),
            seller: acct(1),
            price: Amount(1),
        });
        let mut view = ViewProjector::new();
        assert!(matches!(
            view.apply(&log.events[0]).unwrap_err(),
            OpenlotError::ItemNotFound(ItemId(9))
        ));
        assert_eq!(view.next_seq(), EventSeq::GENESIS);
    }

    #[test]
    fn top_sellers_ranks_by_value_on_sale() {
        let mut log = Log::new();
        let end_at = log.t0 + TimeDelta::seconds(60);
        let start_at = log.t0;
        log.push(minted(1, 1))
            .push(minted(2, 1))
            .push(minted(3, 2))
            .push(minted(4, 3))
            .push(LedgerEvent::ItemListed {
                item_id: ItemId(1),
                seller: acct(1),
                price: Amount(30),
            })
            .push(LedgerEvent::AuctionCreated {
                auction_id: AuctionId(1),
                item_id: ItemId(2),
                seller: acct(1),
                reserve: Amount(40),
                start_at,
                end_at,
            })
            .push(LedgerEvent::ItemListed {
                item_id: ItemId(3),
                seller: acct(2),
                price: Amount(100),
            });
        let view = ViewProjector::replay(&log.events).unwrap();
        assert_eq!(
            view.top_sellers(),
            vec![(acct(2), Amount(100)), (acct(1), Amount(70))]
        );
    }
}
