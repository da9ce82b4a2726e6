//! # openlot-escrow
//!
//! **Escrow ledger**: payment token balances, per-auction bidder deposits,
//! seller proceeds, the token faucet, and conservation checks.
//!
//! ## Architecture
//!
//! 1. **BalanceManager**: available/escrowed balance per account
//! 2. **EscrowLedger**: one cumulative deposit per (auction, bidder)
//! 3. **Faucet**: rate-limited source of new supply
//! 4. **SupplyConservation**: independent running totals for invariant checks
//!
//! ## Fund Flow
//!
//! ```text
//! Faucet → available ──bid delta──▶ escrowed ──claim──▶ seller available
//!                    ◀──withdraw───
//! available ──buy──▶ seller available
//! ```
//!
//! None of these types synchronize on their own. They are plain values owned
//! by the settlement state and mutated on a draft copy that is only committed
//! when a whole intent succeeds.

pub mod balance_manager;
pub mod conservation;
pub mod escrow;
pub mod faucet;

pub use balance_manager::BalanceManager;
pub use conservation::{EscrowFlow, SupplyConservation};
pub use escrow::EscrowLedger;
pub use faucet::Faucet;
