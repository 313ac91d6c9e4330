//! SHA3-256 hashing.
//!
//! Every "256-bit hash" in the protocol is SHA3-256: password to scalar,
//! nonce hash, canonical payload hash, shared-secret expansion and key
//! fingerprints. On the wire a hash is 64 lower-case hex characters.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};

use crate::error::{Error, Result};

/// Size of a digest in bytes
pub const HASH_SIZE: usize = 32;

/// Length of a hex-encoded digest
pub const HASH_HEX_LEN: usize = HASH_SIZE * 2;

/// A 256-bit digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash256([u8; HASH_SIZE]);

impl Hash256 {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Consume into the raw bytes
    pub fn into_bytes(self) -> [u8; HASH_SIZE] {
        self.0
    }

    /// Encode as 64 lower-case hex characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from exactly 64 hex characters
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != HASH_HEX_LEN {
            return Err(Error::Validation(format!(
                "Hash must be {} hex characters, got {}",
                HASH_HEX_LEN,
                hex_str.len()
            )));
        }
        let mut bytes = [0u8; HASH_SIZE];
        hex::decode_to_slice(hex_str, &mut bytes)
            .map_err(|e| Error::Validation(format!("Invalid hash hex: {}", e)))?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Computes the SHA3-256 hash of arbitrary data.
pub fn sha3_256(data: &[u8]) -> Hash256 {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    Hash256(hasher.finalize().into())
}

/// Hashes the UTF-8 bytes of a string.
///
/// This is how text inputs (passwords, nonce hex, canonical payloads,
/// public key hex) enter the protocol.
pub fn hash_str(text: &str) -> Hash256 {
    sha3_256(text.as_bytes())
}

// ============================================================================
// TESTS
// ============================================================================
