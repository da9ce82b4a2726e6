//! Read-model records served to clients.

use chrono::{DateTime, Utc};
use openlot_types::{AccountId, Amount, AuctionId, EventSeq, ItemId, Resolution};
use serde::{Deserialize, Serialize};

/// What a client sees about an item's sale state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewStatus {
    Default,
    Listed {
        price: Amount,
    },
    Auctioned {
        auction_id: AuctionId,
        net_price: Amount,
        end_at: DateTime<Utc>,
        highest_bidder: Option<AccountId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemView {
    pub item_id: ItemId,
    pub owner: AccountId,
    pub creator: AccountId,
    pub metadata_uri: String,
    pub status: ViewStatus,
    /// Last event that touched this item.
    pub updated_at: EventSeq,
}

impl ItemView {
    /// Ask price or current net price while on sale.
    #[must_use]
    pub fn price(&self) -> Option<Amount> {
        match self.status {
            ViewStatus::Default => None,
            ViewStatus::Listed { price } => Some(price),
            ViewStatus::Auctioned { net_price, .. } => Some(net_price),
        }
    }

    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.status != ViewStatus::Default
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionView {
    pub auction_id: AuctionId,
    pub item_id: ItemId,
    pub seller: AccountId,
    pub reserve: Amount,
    pub net_price: Amount,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub highest_bidder: Option<AccountId>,
    pub bid_count: u32,
    pub outcome: Option<Resolution>,
}

impl AuctionView {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_at
    }
}
