//! Error types for the OpenLot settlement core.
//!
//! All errors use the `OL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Item / listing errors
//! - 2xx: Auction errors
//! - 3xx: Funds / escrow errors
//! - 4xx: Intent errors
//! - 5xx: Projection errors
//! - 6xx: Metadata store errors
//! - 8xx: Invariant violations
//! - 9xx: General / internal errors
//!
//! Every rejected precondition is an expected outcome of concurrent use and
//! gets its own variant, so callers can tell a lost race (`BidTooLow`,
//! `InvalidState`) from a request that can never succeed.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{AccountId, Amount, AuctionId, EventSeq, IntentId, ItemId, StatusKind};

/// Central error enum for all OpenLot operations.
#[derive(Debug, Error)]
pub enum OpenlotError {
    // =================================================================
    // Item / Listing Errors (1xx)
    // =================================================================
    #[error("OL_ERR_100: Item not found: {0}")]
    ItemNotFound(ItemId),

    /// The caller does not own the item.
    #[error("OL_ERR_101: {caller} does not own {item}")]
    NotOwner { item: ItemId, caller: AccountId },

    /// A status or phase precondition was not met.
    #[error("OL_ERR_102: Invalid state: {reason}")]
    InvalidState { reason: String },

    /// Registry compare-and-set failed: the item was not in `expected`.
    #[error("OL_ERR_103: Invalid transition for {item}: expected {expected}, found {actual}")]
    InvalidTransition {
        item: ItemId,
        expected: StatusKind,
        actual: StatusKind,
    },

    /// Offered payment is below the ask price.
    #[error("OL_ERR_104: Payment {offered} below ask price {price}")]
    InsufficientPayment { offered: Amount, price: Amount },

    // =================================================================
    // Auction Errors (2xx)
    // =================================================================
    #[error("OL_ERR_200: Auction not found: {0}")]
    AuctionNotFound(AuctionId),

    /// Bid does not strictly exceed the current net price.
    #[error("OL_ERR_201: Bid {bid} does not exceed net price {net_price}")]
    BidTooLow { bid: Amount, net_price: Amount },

    /// The auction is no longer accepting bids.
    #[error("OL_ERR_202: Auction closed: {0}")]
    AuctionClosed(AuctionId),

    /// Unlisting is blocked once any bid exists.
    #[error("OL_ERR_203: Auction has bids: {0}")]
    AuctionHasBids(AuctionId),

    /// The seller tried to bid on their own auction.
    #[error("OL_ERR_204: Seller cannot bid on own auction {0}")]
    SelfBidBlocked(AuctionId),

    #[error("OL_ERR_205: Invalid auction duration: {reason}")]
    InvalidDuration { reason: String },

    // =================================================================
    // Funds / Escrow Errors (3xx)
    // =================================================================
    #[error("OL_ERR_300: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Amount, available: Amount },

    #[error("OL_ERR_301: Nothing to withdraw for {bidder} on {auction}")]
    NothingToWithdraw {
        auction: AuctionId,
        bidder: AccountId,
    },

    /// Escrowed balance is smaller than the deposit being paid out.
    #[error("OL_ERR_302: Insufficient escrowed balance")]
    InsufficientEscrow,

    #[error("OL_ERR_303: Faucet cooldown active until {retry_at}")]
    FaucetCooldown { retry_at: DateTime<Utc> },

    #[error("OL_ERR_304: Amount overflow")]
    AmountOverflow,

    #[error("OL_ERR_305: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("OL_ERR_306: Faucet is disabled")]
    FaucetDisabled,

    // =================================================================
    // Intent Errors (4xx)
    // =================================================================
    #[error("OL_ERR_400: Invalid signature on {intent} from {signer}")]
    InvalidSignature { intent: IntentId, signer: AccountId },

    // =================================================================
    // Projection Errors (5xx)
    // =================================================================
    /// The projector was handed an event out of order.
    #[error("OL_ERR_500: Event gap: expected {expected}, got {got}")]
    EventGap { expected: EventSeq, got: EventSeq },

    // =================================================================
    // Metadata Store Errors (6xx)
    // =================================================================
    #[error("OL_ERR_600: Metadata not found: {0}")]
    MetadataNotFound(String),

    // =================================================================
    // Invariant Violations (8xx)
    // =================================================================
    #[error("OL_ERR_800: Escrow invariant violation: {reason}")]
    EscrowInvariantViolation { reason: String },

    #[error("OL_ERR_801: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    #[error("OL_ERR_900: Internal error: {0}")]
    Internal(String),

    #[error("OL_ERR_901: Serialization error: {0}")]
    Serialization(String),

    #[error("OL_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// The ledger service task is gone.
    #[error("OL_ERR_904: Ledger service unavailable")]
    ServiceUnavailable,
}

impl OpenlotError {
    /// Whether a client should refresh its view and resubmit. These are the
    /// outcomes of losing a race against another committed intent.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InvalidState { .. } | Self::BidTooLow { .. })
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OpenlotError>;

impl From<serde_json::Error> for OpenlotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
