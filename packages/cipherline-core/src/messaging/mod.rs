//! # Messaging Module
//!
//! Composing and processing signed, encrypted messages.
//!
//! ## Compose
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  compose(sender_private, receiver_public, text, ctx)                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. canonical = {"sender","receiver","msg","ts"}  (fixed order JSON)   │
//! │  2. hash      = SHA3-256(canonical)                                    │
//! │  3. signature = ECDSA(sender_private, hash)                            │
//! │  4. key       = shared_secret(sender_private, receiver_public)         │
//! │  5. body      = cipher.seal(key, UTF-8 text) → hex                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Process
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  process(message, sender_public, local_private) → ClassifiedMessage    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  unknown version / bad hex / open fails / not UTF-8 ──► corrupted      │
//! │                                                                         │
//! │  text      = cipher.open(shared_secret(local, sender), body)           │
//! │  computed  = SHA3-256(canonical(declared sender, receiver, ts, text))  │
//! │  integrity = computed == message.message_hash                          │
//! │  signature = verify(sender_public, computed, message.signature)        │
//! │                                                                         │
//! │  integrity && signature ──► verified                                   │
//! │  otherwise              ──► unverified                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The signature is always checked against the *recomputed* hash. The
//! transmitted hash is advisory: it is compared, never trusted. Processing
//! never returns an error; every failure is a classification.

mod canonical;

pub use canonical::{CanonicalPayload, CANONICAL_VERSION};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{
    shared_secret, sign, verify, CipherSuite, Hash256, PrivateKey, PublicKey, Signature,
};
use crate::error::{Error, Result};
use crate::identity::validate_username;

fn default_version() -> u32 {
    CANONICAL_VERSION
}

/// A signed, encrypted message as submitted and delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Canonical payload version
    #[serde(default = "default_version")]
    pub version: u32,
    pub sender_username: String,
    pub receiver_username: String,
    /// Ciphertext, hex-encoded
    pub encrypted_message: String,
    /// SHA3-256 of the canonical payload, 64 hex characters
    pub message_hash: String,
    pub signature: Signature,
    /// ISO-8601 timestamp, as bound into the canonical payload
    pub timestamp: String,
}

impl Message {
    /// Check the message shape before accepting it
    pub fn validate(&self) -> Result<()> {
        if self.version != CANONICAL_VERSION {
            return Err(Error::Validation(format!(
                "Unsupported message version: {}",
                self.version
            )));
        }
        validate_username(&self.sender_username)?;
        validate_username(&self.receiver_username)?;
        if self.encrypted_message.len() % 2 != 0
            || !self.encrypted_message.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(Error::Validation("encrypted_message must be hex".into()));
        }
        Hash256::from_hex(&self.message_hash)?;
        self.signature.validate()?;
        crate::time::parse_iso8601(&self.timestamp)?;
        Ok(())
    }
}

/// Who a message is from, who it is to, and when it was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContext {
    pub sender: String,
    pub receiver: String,
    /// ISO-8601 timestamp string
    pub timestamp: String,
}

impl MessageContext {
    /// Context with an explicit ISO-8601 timestamp
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Context stamped with the current time
    pub fn now(sender: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self::new(sender, receiver, crate::time::now_iso8601())
    }
}

/// Outcome of processing a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Decrypted, hash matches and signature verifies
    Verified,
    /// Decrypted, but the hash or the signature check failed
    Unverified,
    /// Could not be decrypted into text
    Corrupted,
}

/// A processed message ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedMessage {
    pub id: Uuid,
    pub sender: String,
    pub receiver: String,
    pub text: String,
    pub timestamp: String,
    pub status: MessageStatus,
    /// Hash recomputed from the decrypted text, if decryption succeeded
    pub computed_hash: Option<String>,
    pub integrity_ok: bool,
    pub signature_ok: bool,
    pub error: Option<String>,
}

impl ClassifiedMessage {
    /// A `corrupted` entry carrying the error text in place of the body
    pub fn corrupted(message: &Message, error: &Error) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: message.sender_username.clone(),
            receiver: message.receiver_username.clone(),
            text: format!("[Error] Failed to decrypt / process message: {}", error),
            timestamp: message.timestamp.clone(),
            status: MessageStatus::Corrupted,
            computed_hash: None,
            integrity_ok: false,
            signature_ok: false,
            error: Some(error.to_string()),
        }
    }

    /// Status is [`MessageStatus::Verified`]
    pub fn is_verified(&self) -> bool {
        self.status == MessageStatus::Verified
    }
}

/// Acknowledgement of a submitted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgement {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
}

/// Composes and processes messages under one cipher suite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageProtocol {
    cipher: CipherSuite,
}

impl MessageProtocol {
    /// Protocol sealing bodies with `cipher`
    pub fn new(cipher: CipherSuite) -> Self {
        Self { cipher }
    }

    /// The suite in use
    pub fn cipher_suite(&self) -> CipherSuite {
        self.cipher
    }

    /// Build a signed, encrypted message
    pub fn compose(
        &self,
        sender_private_key: &PrivateKey,
        receiver_public_key: &PublicKey,
        plaintext: &str,
        context: &MessageContext,
    ) -> Result<Message> {
        let payload = CanonicalPayload::new(
            &context.sender,
            &context.receiver,
            plaintext,
            &context.timestamp,
        );
        let hash = payload.hash()?;
        let signature = sign(sender_private_key, &hash)?;

        let key = shared_secret(sender_private_key, receiver_public_key);
        let ciphertext = self.cipher.cipher().seal(&key, plaintext.as_bytes())?;

        tracing::debug!(
            sender = %context.sender,
            receiver = %context.receiver,
            cipher = %self.cipher,
            "Message composed"
        );

        Ok(Message {
            version: CANONICAL_VERSION,
            sender_username: context.sender.clone(),
            receiver_username: context.receiver.clone(),
            encrypted_message: hex::encode(ciphertext),
            message_hash: hash.to_hex(),
            signature,
            timestamp: context.timestamp.clone(),
        })
    }

    /// Decrypt, recompute and classify a message
    pub fn process(
        &self,
        message: &Message,
        sender_public_key: &PublicKey,
        local_private_key: &PrivateKey,
    ) -> ClassifiedMessage {
        let plaintext = match self.decrypt(message, sender_public_key, local_private_key) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    sender = %message.sender_username,
                    error = %e,
                    "Message corrupted"
                );
                return ClassifiedMessage::corrupted(message, &e);
            }
        };

        let payload = CanonicalPayload::new(
            &message.sender_username,
            &message.receiver_username,
            &plaintext,
            &message.timestamp,
        );
        let computed = payload.hash().ok();

        let integrity_ok = computed
            .map(|h| h.to_hex().eq_ignore_ascii_case(&message.message_hash))
            .unwrap_or(false);
        let signature_ok = computed
            .map(|h| verify(sender_public_key, &h, &message.signature))
            .unwrap_or(false);

        let (status, error) = match (integrity_ok, signature_ok) {
            (true, true) => (MessageStatus::Verified, None),
            (false, _) => (
                MessageStatus::Unverified,
                Some(Error::IntegrityMismatch.to_string()),
            ),
            (true, false) => (
                MessageStatus::Unverified,
                Some(Error::SignatureInvalid.to_string()),
            ),
        };

        if status == MessageStatus::Unverified {
            tracing::warn!(
                sender = %message.sender_username,
                integrity_ok,
                signature_ok,
                "Message failed verification"
            );
        }

        ClassifiedMessage {
            id: Uuid::new_v4(),
            sender: message.sender_username.clone(),
            receiver: message.receiver_username.clone(),
            text: plaintext,
            timestamp: message.timestamp.clone(),
            status,
            computed_hash: computed.map(|h| h.to_hex()),
            integrity_ok,
            signature_ok,
            error,
        }
    }

    fn decrypt(
        &self,
        message: &Message,
        sender_public_key: &PublicKey,
        local_private_key: &PrivateKey,
    ) -> Result<String> {
        if message.version != CANONICAL_VERSION {
            return Err(Error::DecryptionFailed(format!(
                "Unsupported message version: {}",
                message.version
            )));
        }
        let ciphertext = hex::decode(&message.encrypted_message)
            .map_err(|e| Error::DecryptionFailed(format!("Ciphertext is not hex: {}", e)))?;

        let key = shared_secret(local_private_key, sender_public_key);
        let plaintext = self.cipher.cipher().open(&key, &ciphertext)?;

        String::from_utf8(plaintext)
            .map_err(|_| Error::DecryptionFailed("Plaintext is not valid UTF-8".into()))
    }
}

/// Compose with the default cipher suite
pub fn compose(
    sender_private_key: &PrivateKey,
    receiver_public_key: &PublicKey,
    plaintext: &str,
    context: &MessageContext,
) -> Result<Message> {
    MessageProtocol::default().compose(sender_private_key, receiver_public_key, plaintext, context)
}

/// Process with the default cipher suite
pub fn process(
    message: &Message,
    sender_public_key: &PublicKey,
    local_private_key: &PrivateKey,
) -> ClassifiedMessage {
    MessageProtocol::default().process(message, sender_public_key, local_private_key)
}

// ============================================================================
// TESTS
// ============================================================================
