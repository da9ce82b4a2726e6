//! # openlot-projector
//!
//! **View projector**: the read model clients poll or subscribe to.
//!
//! A pure fold over the committed event log, kept separate from the
//! authoritative mutation path. It can be rebuilt from genesis at any time
//! and converges to the ledger's state given the same event order.
//!
//! ## Pieces
//!
//! 1. **ViewProjector**: in-order, replay-safe fold plus the client queries
//! 2. **compute_view_root**: SHA-256 over the projected items
//! 3. **follow**: async task tracking a live `LedgerHandle`

pub mod digest;
pub mod follower;
pub mod projector;
pub mod view;

pub use digest::{compute_view_root, verify_view_root, view_root_hex};
pub use follower::{catch_up, follow};
pub use projector::ViewProjector;
pub use view::{AuctionView, ItemView, ViewStatus};
