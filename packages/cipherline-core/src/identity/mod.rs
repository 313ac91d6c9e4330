//! # Identity Module
//!
//! A user's identity is a username plus the keypair derived from their
//! password.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         IDENTITY                                        │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Identity (client only)            PublicIdentity (shareable)          │
//! │  ┌───────────────────────┐         ┌───────────────────────┐           │
//! │  │ username              │────────►│ username              │           │
//! │  │ private key (secret)  │         │ publicKey (130 hex)   │           │
//! │  │ public key            │────────►│                       │           │
//! │  └───────────────────────┘         └───────────────────────┘           │
//! │                                                                         │
//! │  The private key never leaves the client. Logging in from a new        │
//! │  device re-derives it from the password.                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::crypto::{hash_str, shared_secret, sign, KeyPair, PublicKey, SharedKey, Signature};
use crate::error::{Error, Result};
use crate::trust;

/// Minimum username length
pub const USERNAME_MIN_LEN: usize = 3;

/// Maximum username length
pub const USERNAME_MAX_LEN: usize = 32;

/// Check a username: 3-32 characters of `[A-Za-z0-9_.-]`
pub fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(Error::Validation(format!(
            "Username must be {}-{} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(Error::Validation(
            "Username may only contain letters, digits, '_', '.' and '-'".into(),
        ));
    }
    Ok(())
}

/// A local user identity
pub struct Identity {
    username: String,
    keypair: KeyPair,
}

impl Identity {
    /// Derive the identity for a username and password
    pub fn from_password(username: &str, password: &str) -> Result<Self> {
        validate_username(username)?;
        Ok(Self {
            username: username.to_string(),
            keypair: KeyPair::from_password(password)?,
        })
    }

    /// Wrap an existing keypair
    pub fn from_keypair(username: &str, keypair: KeyPair) -> Result<Self> {
        validate_username(username)?;
        Ok(Self {
            username: username.to_string(),
            keypair,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    pub fn public_key(&self) -> &PublicKey {
        self.keypair.public_key()
    }

    /// The part of the identity that is registered with the server
    pub fn public_identity(&self) -> PublicIdentity {
        PublicIdentity {
            username: self.username.clone(),
            public_key: *self.keypair.public_key(),
        }
    }

    /// Sign `SHA3-256(nonce_hex)` to answer a login challenge
    pub fn answer_challenge(&self, nonce_hex: &str) -> Result<Signature> {
        sign(self.keypair.private_key(), &hash_str(nonce_hex))
    }

    /// Shared key with a peer
    pub fn shared_key_with(&self, peer: &PublicKey) -> SharedKey {
        shared_secret(self.keypair.private_key(), peer)
    }

    /// Fingerprint of this identity's public key
    pub fn fingerprint(&self) -> String {
        trust::fingerprint(self.keypair.public_key())
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("public_key", self.keypair.public_key())
            .finish_non_exhaustive()
    }
}

/// Username and public key, as returned by `getPublicKey`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub username: String,
    pub public_key: PublicKey,
}
