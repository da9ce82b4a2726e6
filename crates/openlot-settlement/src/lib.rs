//! # openlot-settlement
//!
//! **Ledger execution environment** for the OpenLot marketplace: the item
//! registry, fixed-price market, English auctions, and the single writer
//! that commits them.
//!
//! ## Flow
//!
//! ```text
//! SignedIntent → LedgerHandle ─mpsc─▶ LedgerService task
//!                                        │
//!                                        ▼
//!                              ExecutionEnvironment::execute
//!                               verify → dedupe → draft.apply
//!                               → check invariants → commit
//!                                        │
//!                        ┌───────────────┴───────────────┐
//!                        ▼                               ▼
//!                  event log (replay)           broadcast (live feed)
//! ```
//!
//! ## Guarantees
//!
//! - Intents are applied one at a time in submission order
//! - A rejected intent changes nothing
//! - Every precondition is checked against committed state at execution time
//! - Token supply and per-auction escrow are re-verified after every intent

mod auction;
pub mod clock;
pub mod environment;
pub mod idempotency;
mod market;
pub mod metadata;
pub mod registry;
pub mod service;
pub mod state;
pub mod telemetry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use environment::{ExecutionEnvironment, Receipt};
pub use idempotency::IntentGuard;
pub use metadata::{InMemoryMetadataStore, MetadataStore, TokenMetadata};
pub use registry::ItemRegistry;
pub use service::{LedgerHandle, LedgerService};
pub use state::LedgerState;
