//! Signed intents: the only way to ask the ledger to change state.
//!
//! The acting account of every operation (seller, buyer, bidder, caller)
//! is the intent's signer. The signature covers
//! `"openlot:intent:v1:" || intent_id || signer || canonical JSON(intent)`.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::{
    AccountId, Amount, AuctionId, IntentId, ItemId, OpenlotError, Result, constants,
};

/// A requested state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Intent {
    /// Create a new item owned by the signer.
    Mint { metadata_uri: String },
    /// Offer an owned item at a fixed price.
    List { item_id: ItemId, price: Amount },
    /// Withdraw a listing, or an auction that has no bids.
    Unlist { item_id: ItemId },
    /// Pay the ask price of a listed item. `max_payment` guards against a
    /// price the buyer never saw.
    Buy { item_id: ItemId, max_payment: Amount },
    CreateAuction {
        item_id: ItemId,
        reserve: Amount,
        duration_secs: u64,
    },
    /// Raise the signer's bid to `amount` (a total, not an increment).
    Bid { auction_id: AuctionId, amount: Amount },
    /// Finalize an expired auction. Anyone may sign this.
    CompleteAuction { auction_id: AuctionId },
    /// Recover a losing deposit from a completed auction.
    WithdrawBid { auction_id: AuctionId },
    /// Take the periodic faucet drip of the payment token.
    ClaimFaucet,
}

impl Intent {
    /// Stable operation name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mint { .. } => "mint",
            Self::List { .. } => "list",
            Self::Unlist { .. } => "unlist",
            Self::Buy { .. } => "buy",
            Self::CreateAuction { .. } => "create_auction",
            Self::Bid { .. } => "bid",
            Self::CompleteAuction { .. } => "complete_auction",
            Self::WithdrawBid { .. } => "withdraw_bid",
            Self::ClaimFaucet => "claim_faucet",
        }
    }
}

/// An intent plus the proof that its signer authorized it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedIntent {
    pub id: IntentId,
    pub signer: AccountId,
    pub intent: Intent,
    /// Ed25519 signature over [`SignedIntent::signing_payload`].
    pub signature: Vec<u8>,
}

impl SignedIntent {
    /// Canonical bytes covered by the signature.
    ///
    /// # Errors
    /// Returns `Serialization` if the intent cannot be encoded.
    pub fn signing_payload(id: IntentId, signer: AccountId, intent: &Intent) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(intent)
            .map_err(|e| OpenlotError::Serialization(e.to_string()))?;
        let mut payload = Vec::with_capacity(constants::INTENT_DOMAIN.len() + 48 + body.len());
        payload.extend_from_slice(constants::INTENT_DOMAIN);
        payload.extend_from_slice(id.0.as_bytes());
        payload.extend_from_slice(signer.as_bytes());
        payload.extend_from_slice(&body);
        Ok(payload)
    }

    /// Check the signature against the signer's public key.
    ///
    /// # Errors
    /// Returns `InvalidSignature` if the key is malformed, the signature has
    /// the wrong length, or verification fails.
    pub fn verify(&self) -> Result<()> {
        let invalid = || OpenlotError::InvalidSignature {
            intent: self.id,
            signer: self.signer,
        };
        let key = VerifyingKey::from_bytes(self.signer.as_bytes()).map_err(|_| invalid())?;
        let bytes: [u8; 64] = self.signature.as_slice().try_into().map_err(|_| invalid())?;
        let signature = Signature::from_bytes(&bytes);
        let payload = Self::signing_payload(self.id, self.signer, &self.intent)?;
        key.verify(&payload, &signature).map_err(|_| invalid())
    }
}

/// Client-side signing key for one account.
pub struct Wallet {
    key: SigningKey,
}

impl Wallet {
    #[must_use]
    pub fn from_secret_bytes(secret: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&secret),
        }
    }

    /// Fresh random wallet.
    #[cfg(any(test, feature = "test-helpers"))]
    #[must_use]
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    #[must_use]
    pub fn account(&self) -> AccountId {
        AccountId(self.key.verifying_key().to_bytes())
    }

    /// Sign an intent under a fresh intent id.
    ///
    /// # Errors
    /// Returns `Serialization` if the intent cannot be encoded.
    pub fn sign(&self, intent: Intent) -> Result<SignedIntent> {
        self.sign_with_id(IntentId::new(), intent)
    }

    /// Sign an intent under a caller-chosen id (used when re-signing a retry).
    ///
    /// # Errors
    /// Returns `Serialization` if the intent cannot be encoded.
    pub fn sign_with_id(&self, id: IntentId, intent: Intent) -> Result<SignedIntent> {
        let signer = self.account();
        let payload = SignedIntent::signing_payload(id, signer, &intent)?;
        let signature = self.key.sign(&payload).to_bytes().to_vec();
        Ok(SignedIntent {
            id,
            signer,
            intent,
            signature,
        })
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("account", &self.account())
            .finish_non_exhaustive()
    }
}
