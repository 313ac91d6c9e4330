//! # Key Agreement
//!
//! ECDH over secp256k1, expanded through SHA3-256 into symmetric key
//! material.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       SHARED KEY DERIVATION                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Alice: d_A × Q_B ─┐                                                   │
//! │                    ├──► same point S                                   │
//! │  Bob:   d_B × Q_A ─┘                                                   │
//! │                                                                         │
//! │  S.x ──► lower-case hex, leading zeros stripped ──► SHA3-256           │
//! │      ──► 32-byte shared key                                            │
//! │                                                                         │
//! │  Optional, for authenticated ciphers:                                  │
//! │  shared key ──► HKDF-SHA256(info) ──► 32-byte cipher subkey            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The x-coordinate is stripped of leading zeros before hashing so the key
//! matches peers that render the coordinate as an integer. Both sides must
//! encode it identically or every message between them is garbage.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::hash::hash_str;
use super::keys::{PrivateKey, PublicKey};
use crate::error::{Error, Result};

/// Size of derived key material in bytes
pub const KEY_SIZE: usize = 32;

/// Symmetric key material shared by two parties
///
/// Zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; KEY_SIZE]);

impl SharedKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Expand into a purpose-bound subkey with HKDF-SHA256
    pub fn derive_subkey(&self, info: &[u8]) -> Result<CipherKey> {
        let hkdf = Hkdf::<Sha256>::new(None, &self.0);
        let mut key = [0u8; KEY_SIZE];
        hkdf.expand(info, &mut key)
            .map_err(|_| Error::KeyDerivationFailed("HKDF expansion failed".into()))?;
        Ok(CipherKey(key))
    }
}

impl PartialEq for SharedKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SharedKey {}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedKey(<redacted>)")
    }
}

/// A subkey for one cipher suite
#[derive(ZeroizeOnDrop)]
pub struct CipherKey([u8; KEY_SIZE]);

impl CipherKey {
    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Derive the shared key between a local private key and a peer's public key
///
/// `shared_secret(a, B) == shared_secret(b, A)` for any two keypairs.
pub fn shared_secret(private_key: &PrivateKey, peer_public_key: &PublicKey) -> SharedKey {
    let shared = k256::ecdh::diffie_hellman(private_key.scalar(), peer_public_key.as_affine());
    let mut x_hex = hex::encode(shared.raw_secret_bytes());
    let encoded = match x_hex.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let key = SharedKey(hash_str(encoded).into_bytes());
    x_hex.zeroize();
    key
}
