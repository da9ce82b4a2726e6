//! Payment token faucet.
//!
//! Each account may claim a fixed drip once per cooldown window. This is the
//! only way new supply enters the ledger.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use openlot_types::{AccountId, Amount, FaucetConfig, OpenlotError, Result};

use crate::balance_manager::BalanceManager;

#[derive(Debug, Clone)]
pub struct Faucet {
    config: FaucetConfig,
    last_claim: HashMap<AccountId, DateTime<Utc>>,
}

impl Faucet {
    #[must_use]
    pub fn new(config: FaucetConfig) -> Self {
        Self {
            config,
            last_claim: HashMap::new(),
        }
    }

    /// Credit the drip to `account` if its cooldown has elapsed.
    ///
    /// # Errors
    /// - `FaucetDisabled` if the faucet is switched off
    /// - `FaucetCooldown` if the account claimed within the window
    /// - `Configuration` if the cooldown is not representable
    pub fn claim(
        &mut self,
        balances: &mut BalanceManager,
        account: AccountId,
        now: DateTime<Utc>,
    ) -> Result<Amount> {
        if !self.config.enabled {
            return Err(OpenlotError::FaucetDisabled);
        }
        if let Some(retry_at) = self.next_claim_at(account)? {
            if now < retry_at {
                return Err(OpenlotError::FaucetCooldown { retry_at });
            }
        }

        balances.mint(account, self.config.drip)?;
        self.last_claim.insert(account, now);
        tracing::debug!(account = %account, amount = %self.config.drip, "Faucet drip");
        Ok(self.config.drip)
    }

    /// Earliest time `account` may claim again, or `None` if it never has.
    ///
    /// # Errors
    /// Returns `Configuration` if the cooldown is not representable.
    pub fn next_claim_at(&self, account: AccountId) -> Result<Option<DateTime<Utc>>> {
        let Some(last) = self.last_claim.get(&account) else {
            return Ok(None);
        };
        let cooldown = i64::try_from(self.config.cooldown_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| {
                OpenlotError::Configuration(format!(
                    "faucet cooldown {}s out of range",
                    self.config.cooldown_secs
                ))
            })?;
        Ok(Some(*last + cooldown))
    }
}
