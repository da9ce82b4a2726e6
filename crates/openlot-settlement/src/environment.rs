//! Ledger execution environment: the single writer.
//!
//! Every mutation arrives as a [`SignedIntent`] and goes through
//! [`ExecutionEnvironment::execute`]:
//! 1. Verify the ed25519 signature
//! 2. Return the original receipt if the intent id already committed
//! 3. Clone the committed state into a draft and apply the intent to it
//! 4. Check supply conservation and the escrow invariant on the draft
//! 5. Swap the draft in, append the events to the log, broadcast them
//!
//! Any failure in steps 3 or 4 drops the draft, so a rejected intent leaves
//! no trace. All preconditions are re-checked against the state at the
//! moment of execution, never against what the client last read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use openlot_types::{
    AccountId, CommittedEvent, EventSeq, Intent, IntentId, MarketConfig, OpenlotError, Result,
    SignedIntent,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::idempotency::IntentGuard;
use crate::state::LedgerState;

/// Finality confirmation for a committed intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub intent_id: IntentId,
    pub signer: AccountId,
    pub intent: Intent,
    /// Events appended by this intent, in log order.
    pub events: Vec<CommittedEvent>,
}

impl Receipt {
    #[must_use]
    pub fn operation(&self) -> &'static str {
        self.intent.name()
    }

    /// Sequence number of the first event this intent produced.
    #[must_use]
    pub fn first_seq(&self) -> Option<EventSeq> {
        self.events.first().map(|e| e.seq)
    }
}

/// Where a committed intent landed in the log. Kept for every intent ever
/// committed so an evicted receipt can be rebuilt.
#[derive(Debug, Clone)]
struct CommittedIntent {
    signer: AccountId,
    intent: Intent,
    seq: EventSeq,
}

pub struct ExecutionEnvironment<C: Clock = SystemClock> {
    config: MarketConfig,
    clock: C,
    state: LedgerState,
    log: Vec<CommittedEvent>,
    /// Every committed intent id. Never evicted.
    committed: HashMap<IntentId, CommittedIntent>,
    /// Hot receipts in front of `committed`.
    intents: IntentGuard,
    events_tx: broadcast::Sender<CommittedEvent>,
    /// Latest time handed to an intent. Never goes backwards.
    last_now: DateTime<Utc>,
}

impl ExecutionEnvironment<SystemClock> {
    /// Environment driven by the wall clock.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` does not validate.
    pub fn new(config: MarketConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> ExecutionEnvironment<C> {
    /// # Errors
    /// Returns `Configuration` if `config` does not validate.
    pub fn with_clock(config: MarketConfig, clock: C) -> Result<Self> {
        config.validate()?;
        let (events_tx, _) = broadcast::channel(config.event_channel_capacity);
        info!(
            token = %config.token_symbol,
            decimals = config.token_decimals,
            faucet = config.faucet.enabled,
            "Ledger execution environment started"
        );
        Ok(Self {
            state: LedgerState::new(&config),
            intents: IntentGuard::new(config.intent_cache_size),
            log: Vec::new(),
            committed: HashMap::new(),
            events_tx,
            last_now: DateTime::<Utc>::MIN_UTC,
            clock,
            config,
        })
    }

    /// Apply one signed intent atomically and return its receipt.
    ///
    /// # Errors
    /// - `InvalidSignature` if the signature does not verify
    /// - `InvalidState` if the intent id was already used for a different intent
    /// - any precondition failure of the operation itself
    /// - `SupplyInvariantViolation` / `EscrowInvariantViolation` if the result
    ///   would break conservation
    pub fn execute(&mut self, signed: &SignedIntent) -> Result<Receipt> {
        if let Err(e) = signed.verify() {
            warn!(intent = %signed.id, signer = %signed.signer, error = %e, "Intent rejected");
            return Err(e);
        }

        if let Some(receipt) = self.prior_receipt(signed)? {
            debug!(intent = %signed.id, op = receipt.operation(), "Duplicate intent, returning receipt");
            return Ok(receipt);
        }

        let now = self.now();
        // Full clone plus a full supply sum, so cost per intent grows with the
        // whole state. TODO: replace with an undo journal of touched entries.
        let mut draft = self.state.clone();
        let outcome = draft
            .apply(signed.signer, &signed.intent, now)
            .and_then(|event| {
                draft.verify_supply()?;
                if let Some(auction) = event.auction_id() {
                    draft.verify_escrow(auction)?;
                }
                Ok(event)
            });
        let event = match outcome {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    intent = %signed.id,
                    signer = %signed.signer,
                    op = signed.intent.name(),
                    error = %e,
                    "Intent rejected"
                );
                return Err(e);
            }
        };

        let seq = self.next_seq()?;
        let committed = CommittedEvent {
            seq,
            intent_id: signed.id,
            committed_at: now,
            event,
        };
        self.state = draft;
        self.log.push(committed.clone());
        self.committed.insert(
            signed.id,
            CommittedIntent {
                signer: signed.signer,
                intent: signed.intent.clone(),
                seq,
            },
        );
        // No subscribers is fine; the log keeps everything for catch-up.
        let _ = self.events_tx.send(committed.clone());

        let receipt = Receipt {
            intent_id: signed.id,
            signer: signed.signer,
            intent: signed.intent.clone(),
            events: vec![committed],
        };
        self.intents.record(receipt.clone());

        info!(
            intent = %signed.id,
            signer = %signed.signer,
            op = signed.intent.name(),
            seq = %seq,
            "Intent committed"
        );
        Ok(receipt)
    }

    /// Receipt of an earlier commit of this intent id, if there was one.
    /// A cache miss falls back to the commit index and re-caches the
    /// rebuilt receipt.
    fn prior_receipt(&mut self, signed: &SignedIntent) -> Result<Option<Receipt>> {
        if let Some(receipt) = self.intents.lookup(signed.id) {
            check_same_intent(signed, receipt.signer, &receipt.intent)?;
            return Ok(Some(receipt.clone()));
        }

        let Some(entry) = self.committed.get(&signed.id) else {
            return Ok(None);
        };
        check_same_intent(signed, entry.signer, &entry.intent)?;
        let event = usize::try_from(entry.seq.0)
            .ok()
            .and_then(|i| self.log.get(i))
            .ok_or_else(|| {
                OpenlotError::Internal(format!("intent {} indexed past the log", signed.id))
            })?;
        let receipt = Receipt {
            intent_id: signed.id,
            signer: entry.signer,
            intent: entry.intent.clone(),
            events: vec![event.clone()],
        };
        self.intents.record(receipt.clone());
        Ok(Some(receipt))
    }

    /// Committed state. Authoritative.
    #[must_use]
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// All committed events with `seq >= from`.
    #[must_use]
    pub fn events_since(&self, from: EventSeq) -> &[CommittedEvent] {
        let start = usize::try_from(from.0)
            .unwrap_or(usize::MAX)
            .min(self.log.len());
        &self.log[start..]
    }

    /// Sequence number the next committed event will get.
    ///
    /// # Errors
    /// Returns `Internal` if the log length does not fit a sequence number.
    pub fn next_seq(&self) -> Result<EventSeq> {
        u64::try_from(self.log.len())
            .map(EventSeq)
            .map_err(|_| OpenlotError::Internal("event log length exceeds u64".into()))
    }

    /// Live feed of committed events. Events committed before the call are
    /// only available through [`Self::events_since`].
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CommittedEvent> {
        self.events_tx.subscribe()
    }

    /// Current clock reading as the ledger will see it: never earlier than
    /// the time given to any previous intent.
    pub fn now(&mut self) -> DateTime<Utc> {
        let now = self.clock.now().max(self.last_now);
        self.last_now = now;
        now
    }

    /// Number of receipts held in the hot cache.
    #[must_use]
    pub fn remembered_intents(&self) -> usize {
        self.intents.len()
    }

    /// Number of intents ever committed.
    #[must_use]
    pub fn committed_intents(&self) -> usize {
        self.committed.len()
    }
}

fn check_same_intent(signed: &SignedIntent, signer: AccountId, intent: &Intent) -> Result<()> {
    if signer != signed.signer || *intent != signed.intent {
        return Err(OpenlotError::InvalidState {
            reason: format!("intent id {} already used for another intent", signed.id),
        });
    }
    Ok(())
}
