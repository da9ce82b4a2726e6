//! System-wide constants for the OpenLot settlement core.

/// Decimal scale of the payment token (minor units per whole token = 10^6).
pub const TOKEN_DECIMALS: u32 = 6;

/// Default payment token symbol shown by client shells.
pub const DEFAULT_TOKEN_SYMBOL: &str = "USDC";

/// Default faucet drip: 1500 whole tokens, in minor units.
pub const DEFAULT_FAUCET_DRIP: u64 = 1_500_000_000;

/// Default faucet cooldown between two claims by the same account.
pub const DEFAULT_FAUCET_COOLDOWN_SECS: u64 = 24 * 60 * 60;

/// Longest auction that may be created (30 days).
pub const DEFAULT_MAX_AUCTION_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

/// Number of committed intent receipts remembered for idempotent resubmission.
pub const INTENT_IDEMPOTENCY_CACHE_SIZE: usize = 100_000;

/// Capacity of the committed-event broadcast channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Capacity of the ledger service command queue.
pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 256;

/// Domain separator prefixed to every signed intent payload.
pub const INTENT_DOMAIN: &[u8] = b"openlot:intent:v1:";
