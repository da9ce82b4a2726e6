//! Item registry: identity, metadata pointer, owner, and status of every
//! minted item.
//!
//! Items are never deleted. Status changes go through a compare-and-set
//! ([`ItemRegistry::set_status`]) so a transition only applies if the item
//! is still in the status the caller validated against. Ownership can only
//! be moved from inside this crate, by a settling sale or auction.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use openlot_types::{AccountId, Item, ItemId, ItemStatus, OpenlotError, Result, StatusKind};

#[derive(Debug, Clone)]
pub struct ItemRegistry {
    items: BTreeMap<ItemId, Item>,
    next_id: ItemId,
}

impl ItemRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            next_id: ItemId::FIRST,
        }
    }

    /// Create an item owned (and created) by `owner`, in `Default` status.
    pub fn mint(&mut self, owner: AccountId, metadata_uri: String, now: DateTime<Utc>) -> ItemId {
        let id = self.next_id;
        self.next_id = id.next();
        self.items.insert(
            id,
            Item {
                id,
                owner,
                creator: owner,
                metadata_uri,
                status: ItemStatus::Default,
                minted_at: now,
            },
        );
        id
    }

    /// # Errors
    /// Returns `ItemNotFound` if no such item was minted.
    pub fn get(&self, id: ItemId) -> Result<&Item> {
        self.items.get(&id).ok_or(OpenlotError::ItemNotFound(id))
    }

    /// Move the item from `from` to `to`.
    ///
    /// # Errors
    /// - `ItemNotFound` if no such item was minted
    /// - `InvalidTransition` if the item is not currently in `from`
    pub fn set_status(&mut self, id: ItemId, from: StatusKind, to: ItemStatus) -> Result<()> {
        let item = self
            .items
            .get_mut(&id)
            .ok_or(OpenlotError::ItemNotFound(id))?;
        let actual = item.kind();
        if actual != from {
            return Err(OpenlotError::InvalidTransition {
                item: id,
                expected: from,
                actual,
            });
        }
        item.status = to;
        Ok(())
    }

    /// Hand the item to `new_owner`. Settlement paths only.
    pub(crate) fn transfer_ownership(&mut self, id: ItemId, new_owner: AccountId) -> Result<()> {
        let item = self
            .items
            .get_mut(&id)
            .ok_or(OpenlotError::ItemNotFound(id))?;
        item.owner = new_owner;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for ItemRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use openlot_types::{Amount, AuctionId, Listing};

    use super::*;

    fn acct(b: u8) -> AccountId {
        AccountId([b; 32])
    }

    #[test]
    fn mint_assigns_monotonic_ids() {
        let mut reg = ItemRegistry::new();
        let a = reg.mint(acct(1), "meta://a".into(), Utc::now());
        let b = reg.mint(acct(2), "meta://b".into(), Utc::now());
        assert_eq!(a, ItemId(1));
        assert_eq!(b, ItemId(2));
        assert_eq!(reg.len(), 2);

        let item = reg.get(a).unwrap();
        assert_eq!(item.owner, acct(1));
        assert_eq!(item.creator, acct(1));
        assert_eq!(item.status, ItemStatus::Default);
        assert_eq!(item.metadata_uri, "meta://a");
    }

    #[test]
    fn set_status_is_compare_and_set() {
        let mut reg = ItemRegistry::new();
        let id = reg.mint(acct(1), "meta://a".into(), Utc::now());
        let listed = ItemStatus::Listed(Listing {
            seller: acct(1),
            price: Amount(100),
        });

        reg.set_status(id, StatusKind::Default, listed).unwrap();
        assert_eq!(reg.get(id).unwrap().kind(), StatusKind::Listed);

        let err = reg
            .set_status(id, StatusKind::Default, ItemStatus::Auctioned(AuctionId(1)))
            .unwrap_err();
        assert!(matches!(
            err,
            OpenlotError::InvalidTransition {
                expected: StatusKind::Default,
                actual: StatusKind::Listed,
                ..
            }
        ));
        assert_eq!(reg.get(id).unwrap().status, listed);
    }

    #[test]
    fn transfer_keeps_creator() {
        let mut reg = ItemRegistry::new();
        let id = reg.mint(acct(1), "meta://a".into(), Utc::now());
        reg.transfer_ownership(id, acct(2)).unwrap();
        let item = reg.get(id).unwrap();
        assert_eq!(item.owner, acct(2));
        assert_eq!(item.creator, acct(1));
    }

    #[test]
    fn unknown_item() {
        let mut reg = ItemRegistry::new();
        assert!(matches!(
            reg.get(ItemId(9)).unwrap_err(),
            OpenlotError::ItemNotFound(ItemId(9))
        ));
        assert!(reg.transfer_ownership(ItemId(9), acct(1)).is_err());
        assert!(reg.is_empty());
    }
}
