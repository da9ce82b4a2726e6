//! Committed ledger events.
//!
//! Every successful intent emits one or more [`LedgerEvent`]s. The ledger
//! stamps each with a gap-free [`EventSeq`] and appends it to the log; the
//! view projector folds that log into its read model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, AuctionId, EventSeq, IntentId, ItemId};

/// A state change that has been applied to the authoritative ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    ItemMinted {
        item_id: ItemId,
        owner: AccountId,
        metadata_uri: String,
    },
    ItemListed {
        item_id: ItemId,
        seller: AccountId,
        price: Amount,
    },
    ItemUnlisted {
        item_id: ItemId,
        seller: AccountId,
    },
    ItemSold {
        item_id: ItemId,
        seller: AccountId,
        buyer: AccountId,
        price: Amount,
    },
    AuctionCreated {
        auction_id: AuctionId,
        item_id: ItemId,
        seller: AccountId,
        reserve: Amount,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    },
    BidPlaced {
        auction_id: AuctionId,
        item_id: ItemId,
        bidder: AccountId,
        /// The bidder's new total; also the auction's new net price.
        amount: Amount,
        /// Newly escrowed by this bid.
        escrowed: Amount,
    },
    /// Seller withdrew an auction that never received a bid.
    AuctionCancelled {
        auction_id: AuctionId,
        item_id: ItemId,
        seller: AccountId,
    },
    AuctionCompleted {
        auction_id: AuctionId,
        item_id: ItemId,
        seller: AccountId,
        /// `None` when the auction expired without bids.
        winner: Option<AccountId>,
        price: Amount,
    },
    BidWithdrawn {
        auction_id: AuctionId,
        bidder: AccountId,
        amount: Amount,
    },
    FaucetClaimed {
        account: AccountId,
        amount: Amount,
    },
}

impl LedgerEvent {
    /// The item this event concerns, if any.
    #[must_use]
    pub fn item_id(&self) -> Option<ItemId> {
        match self {
            Self::ItemMinted { item_id, .. }
            | Self::ItemListed { item_id, .. }
            | Self::ItemUnlisted { item_id, .. }
            | Self::ItemSold { item_id, .. }
            | Self::AuctionCreated { item_id, .. }
            | Self::BidPlaced { item_id, .. }
            | Self::AuctionCancelled { item_id, .. }
            | Self::AuctionCompleted { item_id, .. } => Some(*item_id),
            Self::BidWithdrawn { .. } | Self::FaucetClaimed { .. } => None,
        }
    }

    /// The auction this event concerns, if any.
    #[must_use]
    pub fn auction_id(&self) -> Option<AuctionId> {
        match self {
            Self::AuctionCreated { auction_id, .. }
            | Self::BidPlaced { auction_id, .. }
            | Self::AuctionCancelled { auction_id, .. }
            | Self::AuctionCompleted { auction_id, .. }
            | Self::BidWithdrawn { auction_id, .. } => Some(*auction_id),
            _ => None,
        }
    }
}

/// An event with its position in the ledger's total order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedEvent {
    pub seq: EventSeq,
    /// The intent whose commit produced this event.
    pub intent_id: IntentId,
    pub committed_at: DateTime<Utc>,
    pub event: LedgerEvent,
}
