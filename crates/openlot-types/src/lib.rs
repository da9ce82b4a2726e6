//! # openlot-types
//!
//! Shared types, errors, and configuration for the **OpenLot** settlement core.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`ItemId`], [`AuctionId`], [`AccountId`], [`IntentId`], [`EventSeq`]
//! - **Amounts**: [`Amount`] (fixed-point minor units of the payment token)
//! - **Item model**: [`Item`], [`ItemStatus`], [`StatusKind`], [`Listing`]
//! - **Auction model**: [`Auction`], [`AuctionPhase`], [`Resolution`]
//! - **Escrow model**: [`Deposit`], [`DepositState`], [`BalanceEntry`]
//! - **Intents**: [`Intent`], [`SignedIntent`], [`Wallet`]
//! - **Events**: [`LedgerEvent`], [`CommittedEvent`]
//! - **Configuration**: [`MarketConfig`], [`FaucetConfig`]
//! - **Errors**: [`OpenlotError`] with `OL_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod auction;
pub mod balance;
pub mod config;
pub mod constants;
pub mod deposit;
pub mod error;
pub mod event;
pub mod ids;
pub mod intent;
pub mod item;

pub use amount::*;
pub use auction::*;
pub use balance::*;
pub use config::*;
pub use deposit::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use intent::*;
pub use item::*;

// Constants are accessed via `openlot_types::constants::FOO`
// (not re-exported to avoid name collisions).
