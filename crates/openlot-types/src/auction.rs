//! English auction model.
//!
//! ## Phases
//!
//! ```text
//!   ┌──────┐  now >= end_at  ┌────────────────────┐  complete  ┌───────────┐
//!   │ OPEN ├────────────────▶│ EXPIRED_UNRESOLVED ├───────────▶│ COMPLETED │
//!   └──┬───┘                 └─────────┬──────────┘            └───────────┘
//!      │ unlist (no bids)              │ unlist (no bids)            ▲
//!      └───────────────────────────────┴─────────────────────────────┘
//! ```
//!
//! Only `Completed` is stored (as a [`Resolution`]). Whether an unresolved
//! auction is open or expired is recomputed from the clock on every read.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, AuctionId, ItemId};

/// Time-derived phase of an auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuctionPhase {
    /// Accepting bids.
    Open,
    /// Past `end_at`, waiting for anyone to finalize it.
    ExpiredUnresolved,
    /// Terminal.
    Completed,
}

impl fmt::Display for AuctionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::ExpiredUnresolved => write!(f, "EXPIRED_UNRESOLVED"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// How an auction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Item went to the highest bidder at the final net price.
    Sold { winner: AccountId, price: Amount },
    /// Expired without bids; item returned to its seller.
    Unsold,
    /// Seller withdrew it before any bid.
    Cancelled,
}

/// One auction run for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub id: AuctionId,
    pub item_id: ItemId,
    pub seller: AccountId,
    pub reserve: Amount,
    /// Starts at `reserve`; only ever raised by a strictly higher bid.
    pub net_price: Amount,
    pub start_at: DateTime<Utc>,
    /// Immutable. No anti-sniping extension.
    pub end_at: DateTime<Utc>,
    pub highest_bidder: Option<AccountId>,
    pub bid_count: u32,
    pub resolution: Option<Resolution>,
}

impl Auction {
    /// Phase at `now`. Pure: depends only on `now`, `end_at` and whether a
    /// resolution has been recorded.
    #[must_use]
    pub fn phase(&self, now: DateTime<Utc>) -> AuctionPhase {
        if self.resolution.is_some() {
            AuctionPhase::Completed
        } else if now >= self.end_at {
            AuctionPhase::ExpiredUnresolved
        } else {
            AuctionPhase::Open
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// A bid has been placed iff the net price moved off the reserve.
    #[must_use]
    pub fn has_bids(&self) -> bool {
        self.net_price != self.reserve
    }

    /// The account whose deposit was claimed, if the auction sold.
    #[must_use]
    pub fn winner(&self) -> Option<AccountId> {
        match self.resolution {
            Some(Resolution::Sold { winner, .. }) => Some(winner),
            _ => None,
        }
    }
}
