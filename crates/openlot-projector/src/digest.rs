//! View root: a SHA-256 over the projected items so two projectors can
//! confirm they converged without comparing full views.
//!
//! Items are hashed in id order with their owner, creator, metadata URI and
//! sale status. Bookkeeping such as `updated_at` is left out, so a view
//! built by replay and one built by a live follower hash the same.

use openlot_types::{Amount, ItemId};
use sha2::{Digest, Sha256};

use crate::projector::ViewProjector;
use crate::view::ViewStatus;

#[must_use]
pub fn compute_view_root(view: &ViewProjector) -> [u8; 32] {
    let items: Vec<_> = view.items().collect();
    let mut hasher = Sha256::new();
    hasher.update(b"openlot:view_root:v1:");
    hasher.update((items.len() as u64).to_le_bytes());

    for item in items {
        hash_id(&mut hasher, item.item_id);
        hasher.update(item.owner.as_bytes());
        hasher.update(item.creator.as_bytes());
        hasher.update((item.metadata_uri.len() as u64).to_le_bytes());
        hasher.update(item.metadata_uri.as_bytes());
        match &item.status {
            ViewStatus::Default => hasher.update([0u8]),
            ViewStatus::Listed { price } => {
                hasher.update([1u8]);
                hash_amount(&mut hasher, *price);
            }
            ViewStatus::Auctioned {
                auction_id,
                net_price,
                end_at,
                highest_bidder,
            } => {
                hasher.update([2u8]);
                hasher.update(auction_id.0.to_le_bytes());
                hash_amount(&mut hasher, *net_price);
                hasher.update(end_at.timestamp_millis().to_le_bytes());
                match highest_bidder {
                    Some(bidder) => {
                        hasher.update([1u8]);
                        hasher.update(bidder.as_bytes());
                    }
                    None => hasher.update([0u8]),
                }
            }
        }
    }

    let result = hasher.finalize();
    let mut root = [0u8; 32];
    root.copy_from_slice(&result);
    root
}

/// Whether `view` hashes to `expected`.
#[must_use]
pub fn verify_view_root(view: &ViewProjector, expected: &[u8; 32]) -> bool {
    compute_view_root(view) == *expected
}

/// Hex form of the view root, for logs.
#[must_use]
pub fn view_root_hex(view: &ViewProjector) -> String {
    hex::encode(compute_view_root(view))
}

fn hash_id(hasher: &mut Sha256, id: ItemId) {
    hasher.update(id.0.to_le_bytes());
}

fn hash_amount(hasher: &mut Sha256, amount: Amount) {
    hasher.update(amount.0.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use openlot_types::{AccountId, CommittedEvent, EventSeq, IntentId, LedgerEvent};

    use super::*;

    fn committed(seq: u64, event: LedgerEvent) -> CommittedEvent {
        CommittedEvent {
            seq: EventSeq(seq),
            intent_id: IntentId::new(),
            committed_at: Utc::now(),
            event,
        }
    }

    fn minted(seq: u64) -> CommittedEvent {
        committed(
            seq,
            LedgerEvent::ItemMinted {
                item_id: ItemId(seq + 1),
                owner: AccountId([1; 32]),
                metadata_uri: "meta://a".into(),
            },
        )
    }

    #[test]
    fn empty_view_deterministic() {
        let a = compute_view_root(&ViewProjector::new());
        let b = compute_view_root(&ViewProjector::new());
        assert_eq!(a, b);
        assert_ne!(a, [0u8; 32]);
    }

    #[test]
    fn status_changes_root() {
        let log = vec![minted(0)];
        let before = ViewProjector::replay(&log).unwrap();
        let root = compute_view_root(&before);
        assert!(verify_view_root(&before, &root));

        let mut after = before.clone();
        after
            .apply(&committed(
                1,
                LedgerEvent::ItemListed {
                    item_id: ItemId(1),
                    seller: AccountId([1; 32]),
                    price: Amount(10),
                },
            ))
            .unwrap();
        assert!(!verify_view_root(&after, &root));
        assert_eq!(view_root_hex(&after).len(), 64);
    }

    #[test]
    fn root_ignores_event_bookkeeping() {
        // Same resulting items, reached through a different number of events.
        let direct = ViewProjector::replay(&[minted(0)]).unwrap();
        let roundabout = ViewProjector::replay(&[
            minted(0),
            committed(
                1,
                LedgerEvent::ItemListed {
                    item_id: ItemId(1),
                    seller: AccountId([1; 32]),
                    price: Amount(10),
                },
            ),
            committed(
                2,
                LedgerEvent::ItemUnlisted {
                    item_id: ItemId(1),
                    seller: AccountId([1; 32]),
                },
            ),
        ])
        .unwrap();
        assert_eq!(compute_view_root(&direct), compute_view_root(&roundabout));
    }
}
