//! Metadata store: content-addressed storage for item descriptions.
//!
//! The ledger only ever sees the URI returned by [`MetadataStore::store`].
//! It never parses or validates what the URI points at.

use std::collections::HashMap;

use openlot_types::{OpenlotError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// What a client shell renders for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub description: String,
    /// Pointer to the image blob (already uploaded elsewhere).
    pub image_ref: String,
}

pub trait MetadataStore {
    /// Persist `metadata`, returning a retrievable URI.
    fn store(&mut self, metadata: &TokenMetadata) -> Result<String>;

    /// Load what was stored under `uri`.
    fn fetch(&self, uri: &str) -> Result<TokenMetadata>;
}

const URI_SCHEME: &str = "meta://";

/// In-process store keyed by the SHA-256 of the canonical JSON encoding.
/// Storing identical metadata twice yields the same URI.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadataStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl InMemoryMetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn store(&mut self, metadata: &TokenMetadata) -> Result<String> {
        let bytes = serde_json::to_vec(metadata)?;
        let digest = hex::encode(Sha256::digest(&bytes));
        self.blobs.entry(digest.clone()).or_insert(bytes);
        Ok(format!("{URI_SCHEME}{digest}"))
    }

    fn fetch(&self, uri: &str) -> Result<TokenMetadata> {
        let bytes = uri
            .strip_prefix(URI_SCHEME)
            .and_then(|digest| self.blobs.get(digest))
            .ok_or_else(|| OpenlotError::MetadataNotFound(uri.to_string()))?;
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TokenMetadata {
        TokenMetadata {
            name: "Lighthouse".into(),
            description: "Oil on canvas".into(),
            image_ref: "blob://lighthouse.png".into(),
        }
    }

    #[test]
    fn store_then_fetch() {
        let mut store = InMemoryMetadataStore::new();
        let uri = store.store(&sample()).unwrap();
        assert!(uri.starts_with("meta://"));
        assert_eq!(uri.len(), "meta://".len() + 64);
        assert_eq!(store.fetch(&uri).unwrap(), sample());
    }

    #[test]
    fn identical_content_same_uri() {
        let mut store = InMemoryMetadataStore::new();
        let a = store.store(&sample()).unwrap();
        let b = store.store(&sample()).unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);

        let mut other = sample();
        other.name = "Harbour".into();
        assert_ne!(store.store(&other).unwrap(), a);
    }

    #[test]
    fn unknown_uri() {
        let store = InMemoryMetadataStore::new();
        assert!(matches!(
            store.fetch("meta://00").unwrap_err(),
            OpenlotError::MetadataNotFound(_)
        ));
        assert!(matches!(
            store.fetch("https://elsewhere").unwrap_err(),
            OpenlotError::MetadataNotFound(_)
        ));
    }
}
