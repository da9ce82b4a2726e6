//! Configuration for an OpenLot ledger.

use serde::{Deserialize, Serialize};

use crate::{Amount, OpenlotError, Result, constants};

/// Ledger-wide configuration. Every field has a default, so a JSON document
/// only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Payment token symbol (display only).
    pub token_symbol: String,
    /// Decimal scale of the payment token.
    pub token_decimals: u32,
    /// Upper bound on `CreateAuction::duration_secs`.
    pub max_auction_duration_secs: u64,
    /// Committed intent receipts kept for idempotent resubmission.
    pub intent_cache_size: usize,
    /// Buffer of the committed-event broadcast channel.
    pub event_channel_capacity: usize,
    /// Buffer of the ledger service command queue.
    pub command_queue_capacity: usize,
    pub faucet: FaucetConfig,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            token_symbol: constants::DEFAULT_TOKEN_SYMBOL.to_string(),
            token_decimals: constants::TOKEN_DECIMALS,
            max_auction_duration_secs: constants::DEFAULT_MAX_AUCTION_DURATION_SECS,
            intent_cache_size: constants::INTENT_IDEMPOTENCY_CACHE_SIZE,
            event_channel_capacity: constants::DEFAULT_EVENT_CHANNEL_CAPACITY,
            command_queue_capacity: constants::DEFAULT_COMMAND_QUEUE_CAPACITY,
            faucet: FaucetConfig::default(),
        }
    }
}

impl MarketConfig {
    /// Parse and validate a JSON config document.
    ///
    /// # Errors
    /// Returns `Configuration` if the JSON is malformed or a value is out of range.
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| OpenlotError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns `Configuration` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.token_decimals > 18 {
            return Err(OpenlotError::Configuration(format!(
                "token_decimals {} exceeds 18",
                self.token_decimals
            )));
        }
        // chrono durations are bounded by i64 milliseconds
        if self.max_auction_duration_secs == 0
            || self.max_auction_duration_secs > i64::MAX as u64 / 1000
        {
            return Err(OpenlotError::Configuration(format!(
                "max_auction_duration_secs {} out of range",
                self.max_auction_duration_secs
            )));
        }
        if self.intent_cache_size == 0 {
            return Err(OpenlotError::Configuration(
                "intent_cache_size must be > 0".into(),
            ));
        }
        if self.event_channel_capacity == 0 || self.command_queue_capacity == 0 {
            return Err(OpenlotError::Configuration(
                "channel capacities must be > 0".into(),
            ));
        }
        if self.faucet.enabled && self.faucet.drip.is_zero() {
            return Err(OpenlotError::Configuration(
                "faucet drip must be > 0 when enabled".into(),
            ));
        }
        if self.faucet.cooldown_secs > i64::MAX as u64 / 1000 {
            return Err(OpenlotError::Configuration(format!(
                "faucet cooldown_secs {} out of range",
                self.faucet.cooldown_secs
            )));
        }
        Ok(())
    }
}

/// Payment token faucet settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaucetConfig {
    pub enabled: bool,
    /// Minor units handed out per claim.
    pub drip: Amount,
    /// Minimum seconds between two claims by the same account.
    pub cooldown_secs: u64,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            drip: Amount(constants::DEFAULT_FAUCET_DRIP),
            cooldown_secs: constants::DEFAULT_FAUCET_COOLDOWN_SECS,
        }
    }
}
