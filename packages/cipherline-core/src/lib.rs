//! # Cipherline Core
//!
//! Cryptographic identity and secure messaging for a password-login chat
//! system: deterministic keys from a password, challenge-response login,
//! signed and encrypted messages, and trust-on-first-use key pinning.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CIPHERLINE CORE MODULES                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                        client (async)                            │  │
//! │  │  KeyServer trait · LocalKeyServer · ChatClient                   │  │
//! │  └───────┬──────────────────────┬──────────────────────┬────────────┘  │
//! │          │                      │                      │               │
//! │  ┌───────▼───────┐     ┌────────▼────────┐    ┌────────▼────────┐      │
//! │  │     auth      │     │   messaging     │    │     trust       │      │
//! │  │               │     │                 │    │                 │      │
//! │  │ - register    │     │ - compose       │    │ - save/observe  │      │
//! │  │ - challenge   │     │ - process       │    │ - trust/reject  │      │
//! │  │ - verify      │     │ - classify      │    │ - fingerprint   │      │
//! │  └───────┬───────┘     └────────┬────────┘    └────────┬────────┘      │
//! │          │                      │                      │               │
//! │  ┌───────▼──────────────────────▼──────────────────────▼────────────┐  │
//! │  │  identity          crypto                                        │  │
//! │  │  - Identity        - keys (secp256k1)   - agreement (ECDH)       │  │
//! │  │  - PublicIdentity  - signing (ECDSA)    - cipher (XOR / AES-GCM) │  │
//! │  │                    - hash (SHA3-256)                             │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  Ambient: error · config · time                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error type, codes and the redacted boundary form
//! - [`config`] - Protocol settings and environment overrides
//! - [`crypto`] - Keys, signatures, key agreement, ciphers, hashing
//! - [`identity`] - Username plus password-derived keypair
//! - [`auth`] - Registration and challenge-response login
//! - [`messaging`] - Signed, encrypted messages and their classification
//! - [`trust`] - Pinned contact keys and change detection
//! - [`client`] - Async client flows over a key server
//!
//! ## Security Notes
//!
//! - Keys are derived from the password with a single unsalted SHA3-256.
//!   Anyone who guesses the password has the key. This is kept so a user
//!   can log in from any device with only a password.
//! - The default `XorKeystream` cipher is neither randomized nor
//!   authenticated. `CipherSuite::Aes256Gcm` is available when both ends
//!   support it.
//! - A message's transmitted hash is never trusted. Receivers recompute it
//!   from the decrypted text and check the signature against that.

#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod auth;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
mod locks;
pub mod messaging;
pub mod time;
pub mod trust;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use auth::{AuthService, SessionCredentials};
pub use client::{ChatClient, KeyServer, LocalKeyServer};
pub use config::{AuthConfig, ProtocolConfig};
pub use crypto::{CipherSuite, KeyPair, PublicKey, Signature};
pub use error::{Error, ErrorResponse, Result};
pub use identity::{Identity, PublicIdentity};
pub use messaging::{ClassifiedMessage, Message, MessageContext, MessageProtocol, MessageStatus};
pub use trust::{KeyObservation, TrustRecord, TrustStore};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Cipherline Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
