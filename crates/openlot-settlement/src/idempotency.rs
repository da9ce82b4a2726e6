//! Intent idempotency guard: prevents double application of a signed intent.
//!
//! Every committed intent leaves its [`Receipt`] here. Resubmitting the same
//! `IntentId` returns the stored receipt instead of running the intent
//! again, so a client that never saw the reply to a submission can safely
//! retry it. Rejected intents are not recorded.
//!
//! The cache is bounded with FIFO eviction. It only holds full receipts; the
//! environment keeps a permanent index of committed intent ids and rebuilds
//! an evicted receipt from the log.

use std::collections::{HashMap, VecDeque};

use openlot_types::IntentId;

use crate::environment::Receipt;

pub struct IntentGuard {
    /// Receipts of committed intents.
    receipts: HashMap<IntentId, Receipt>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<IntentId>,
    max_size: usize,
}

impl IntentGuard {
    /// Create a guard holding at most `max_size` receipts (at least one).
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            receipts: HashMap::with_capacity(max_size.min(4096)),
            order: VecDeque::with_capacity(max_size.min(4096)),
            max_size,
        }
    }

    /// Receipt of an already committed intent.
    #[must_use]
    pub fn lookup(&self, id: IntentId) -> Option<&Receipt> {
        self.receipts.get(&id)
    }

    /// Remember the receipt of a freshly committed intent.
    pub fn record(&mut self, receipt: Receipt) {
        let id = receipt.intent_id;
        if self.receipts.contains_key(&id) {
            return;
        }

        // Evict oldest if at capacity.
        if self.receipts.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.receipts.remove(&oldest);
            }
        }

        self.receipts.insert(id, receipt);
        self.order.push_back(id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }
}
