//! Item model: a unique, non-fungible thing with an owner and a status.
//!
//! ## Status
//!
//! ```text
//!            list              createAuction
//!   Listed ◀──────  Default  ──────────────▶ Auctioned
//!          ──────▶          ◀──────────────
//!        unlist/buy          complete/unlist (no bids)
//! ```
//!
//! The status is a tagged union: a listing only exists inside
//! [`ItemStatus::Listed`] and an auction reference only inside
//! [`ItemStatus::Auctioned`], so an item can never be both.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, AuctionId, ItemId};

/// A fixed-price offer. Exists only while the item is `Listed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Equal to the item owner at creation.
    pub seller: AccountId,
    /// Ask price, always positive.
    pub price: Amount,
}

/// Current status of an item, with the data each status owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    Default,
    Listed(Listing),
    Auctioned(AuctionId),
}

impl ItemStatus {
    #[must_use]
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::Default => StatusKind::Default,
            Self::Listed(_) => StatusKind::Listed,
            Self::Auctioned(_) => StatusKind::Auctioned,
        }
    }
}

/// Discriminant of [`ItemStatus`], used for compare-and-set transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Default,
    Listed,
    Auctioned,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "DEFAULT"),
            Self::Listed => write!(f, "LISTED"),
            Self::Auctioned => write!(f, "AUCTIONED"),
        }
    }
}

/// A minted item. Never destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub owner: AccountId,
    /// The account that minted the item. Immutable.
    pub creator: AccountId,
    /// Pointer into the metadata store. Set once at mint.
    pub metadata_uri: String,
    pub status: ItemStatus,
    pub minted_at: DateTime<Utc>,
}

impl Item {
    #[must_use]
    pub fn kind(&self) -> StatusKind {
        self.status.kind()
    }

    #[must_use]
    pub fn listing(&self) -> Option<&Listing> {
        match &self.status {
            ItemStatus::Listed(listing) => Some(listing),
            _ => None,
        }
    }

    #[must_use]
    pub fn auction_id(&self) -> Option<AuctionId> {
        match self.status {
            ItemStatus::Auctioned(id) => Some(id),
            _ => None,
        }
    }
}
