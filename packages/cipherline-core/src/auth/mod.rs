//! # Authentication Module
//!
//! Password-free challenge-response login against registered public keys.
//!
//! ## Login Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     CHALLENGE-RESPONSE LOGIN                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Client                                 AuthService                     │
//! │  ──────                                 ───────────                     │
//! │                                                                         │
//! │  register(username, Q) ───────────────► directory[username] = Q        │
//! │                                         (409 if taken)                  │
//! │                                                                         │
//! │  challenge(username) ─────────────────► nonce = random(≥16 bytes)      │
//! │                      ◄──────────────── challenges[username] = nonce    │
//! │                                         (replaces any earlier nonce)    │
//! │                                                                         │
//! │  sig = sign(d, SHA3(nonce_hex))                                        │
//! │                                                                         │
//! │  verify(username, sig) ───────────────► ┌ lock(username) ────────────┐ │
//! │                                         │ read nonce (missing/expired │ │
//! │                                         │   → ChallengeMissing)       │ │
//! │                                         │ verify(Q, SHA3(nonce), sig) │ │
//! │                                         │   bad → SignatureInvalid,   │ │
//! │                                         │         nonce kept          │ │
//! │                                         │ delete nonce                │ │
//! │                                         └ unlock ─────────────────────┘ │
//! │                      ◄──────────────── { accessToken, refreshToken }   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `challenge` and `verify` for one username run under the same lock, so two
//! concurrent verifications can never both consume one nonce.
//!
//! ## Stores
//!
//! The service owns no global state. Users, challenges and credential
//! issuance are injected through [`UserDirectory`], [`ChallengeStore`] and
//! [`CredentialIssuer`].

mod challenge;
mod credentials;
mod directory;

pub use challenge::{Challenge, ChallengeStore, MemoryChallengeStore};
pub use credentials::{CredentialIssuer, OpaqueTokenIssuer, SessionCredentials};
pub use directory::{MemoryUserDirectory, UserDirectory, UserRecord};

use std::sync::Arc;

use crate::config::AuthConfig;
use crate::crypto::{hash_str, verify, PublicKey, Signature};
use crate::error::{Error, Result};
use crate::identity::{validate_username, PublicIdentity};
use crate::locks::StripedLocks;

/// Registration, challenge issuance and challenge verification
pub struct AuthService {
    config: AuthConfig,
    directory: Arc<dyn UserDirectory>,
    challenges: Arc<dyn ChallengeStore>,
    issuer: Arc<dyn CredentialIssuer>,
    locks: StripedLocks,
}

impl AuthService {
    /// Create a service backed by in-memory stores
    pub fn new(config: AuthConfig) -> Result<Self> {
        let issuer = OpaqueTokenIssuer::new(config.token_bytes);
        Self::with_stores(
            config,
            Arc::new(MemoryUserDirectory::new()),
            Arc::new(MemoryChallengeStore::new()),
            Arc::new(issuer),
        )
    }

    /// Create a service over caller-provided stores
    pub fn with_stores(
        config: AuthConfig,
        directory: Arc<dyn UserDirectory>,
        challenges: Arc<dyn ChallengeStore>,
        issuer: Arc<dyn CredentialIssuer>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            directory,
            challenges,
            issuer,
            locks: StripedLocks::default(),
        })
    }

    /// Settings this service was built with
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Register a username with its public key
    ///
    /// Fails with [`Error::Conflict`] if the username is already taken.
    pub fn register(&self, username: &str, public_key: PublicKey) -> Result<()> {
        validate_username(username)?;

        self.directory.insert_new(UserRecord {
            username: username.to_string(),
            public_key,
            created_at: crate::time::now(),
        })?;

        tracing::info!(username, "User registered");
        Ok(())
    }

    /// Issue a fresh nonce for a registered username
    ///
    /// Any earlier outstanding nonce for the username is replaced.
    pub fn challenge(&self, username: &str) -> Result<Challenge> {
        validate_username(username)?;

        let _guard = self.locks.lock(username);
        if self.directory.get(username)?.is_none() {
            return Err(Error::NotFound(format!("User not found: {}", username)));
        }

        let challenge = Challenge::issue(username, self.config.nonce_bytes);
        self.challenges.put(challenge.clone())?;

        tracing::debug!(username, "Challenge issued");
        Ok(challenge)
    }

    /// Check a signature over the outstanding nonce and issue credentials
    ///
    /// The nonce is consumed only on success. A bad signature leaves it in
    /// place so the user can retry until it expires or is replaced.
    pub fn verify(&self, username: &str, signature: &Signature) -> Result<SessionCredentials> {
        validate_username(username)?;
        signature.validate()?;

        let _guard = self.locks.lock(username);

        let Some(user) = self.directory.get(username)? else {
            tracing::debug!(username, "Verify for unknown user");
            return Err(Error::ChallengeMissing);
        };
        let Some(challenge) = self.challenges.get(username)? else {
            tracing::debug!(username, "Verify without outstanding challenge");
            return Err(Error::ChallengeMissing);
        };

        if challenge.is_expired(crate::time::now(), self.config.challenge_ttl()) {
            self.challenges.delete(username)?;
            tracing::debug!(username, "Challenge expired");
            return Err(Error::ChallengeMissing);
        }

        let nonce_hash = hash_str(&challenge.nonce);
        if !verify(&user.public_key, &nonce_hash, signature) {
            tracing::warn!(username, "Challenge signature rejected");
            return Err(Error::SignatureInvalid);
        }

        self.challenges.delete(username)?;
        let credentials = self.issuer.issue(username)?;

        tracing::info!(username, "User authenticated");
        Ok(credentials)
    }

    /// Look up a user's registered public key
    pub fn public_key(&self, username: &str) -> Result<PublicIdentity> {
        validate_username(username)?;
        self.directory
            .get(username)?
            .map(|user| PublicIdentity {
                username: user.username,
                public_key: user.public_key,
            })
            .ok_or_else(|| Error::NotFound(format!("User not found: {}", username)))
    }
}

// ============================================================================
// TESTS
// ============================================================================
