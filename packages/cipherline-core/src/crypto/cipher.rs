//! # Symmetric Ciphers
//!
//! The confidentiality layer is a seal/open contract over a [`SharedKey`].
//! Everything around it (canonical hashing, signing, classification) is
//! independent of which cipher is plugged in.
//!
//! ## Suites
//!
//! | Suite          | Randomized | Authenticated | Output                  |
//! |----------------|------------|---------------|-------------------------|
//! | `XorKeystream` | no         | no            | `len(pt)` bytes         |
//! | `Aes256Gcm`    | yes        | yes           | `nonce ‖ ct ‖ tag`      |
//!
//! `XorKeystream` is the wire-compatible reference: the 32 key bytes repeat
//! to cover the plaintext. It is deterministic and malleable, so equal
//! plaintexts under one key produce equal ciphertexts and bit flips pass
//! straight through. Opening with the wrong key yields garbage, not an
//! error; the hash comparison in `messaging` catches that.
//!
//! `Aes256Gcm` keys AES-256-GCM with an HKDF-SHA256 subkey of the shared
//! key and a fresh 96-bit nonce per message. Tampering makes `open` fail.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::agreement::SharedKey;
use crate::error::{Error, Result};

/// AES-GCM nonce size in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes
pub const TAG_SIZE: usize = 16;

/// HKDF info string for the AES-GCM subkey
const AES_GCM_INFO: &[u8] = b"cipherline-message-aes256gcm-v1";

/// Seal/open contract for message bodies
pub trait MessageCipher: Send + Sync {
    /// Encrypt a plaintext under the shared key
    fn seal(&self, key: &SharedKey, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt a ciphertext under the shared key
    fn open(&self, key: &SharedKey, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// Which cipher protects message bodies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CipherSuite {
    /// Repeating-key XOR
    #[default]
    XorKeystream,
    /// AES-256-GCM with a random nonce
    Aes256Gcm,
}

impl CipherSuite {
    /// The cipher implementing this suite
    pub fn cipher(self) -> &'static dyn MessageCipher {
        match self {
            CipherSuite::XorKeystream => &XorKeystreamCipher,
            CipherSuite::Aes256Gcm => &AesGcmCipher,
        }
    }

    /// Stable name used in config and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            CipherSuite::XorKeystream => "xor_keystream",
            CipherSuite::Aes256Gcm => "aes256_gcm",
        }
    }
}

impl std::fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CipherSuite {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "xor_keystream" | "xor" => Ok(CipherSuite::XorKeystream),
            "aes256_gcm" | "aes_gcm" | "aes" => Ok(CipherSuite::Aes256Gcm),
            other => Err(Error::InvalidConfig(format!("Unknown cipher suite: {}", other))),
        }
    }
}

// ============================================================================
// XOR KEYSTREAM
// ============================================================================

/// Repeating-key XOR over the shared key bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct XorKeystreamCipher;

impl XorKeystreamCipher {
    fn apply(key: &SharedKey, data: &[u8]) -> Vec<u8> {
        data.iter()
            .zip(key.as_bytes().iter().cycle())
            .map(|(byte, k)| byte ^ k)
            .collect()
    }
}

impl MessageCipher for XorKeystreamCipher {
    fn seal(&self, key: &SharedKey, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(Self::apply(key, plaintext))
    }

    fn open(&self, key: &SharedKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(Self::apply(key, ciphertext))
    }
}

// ============================================================================
// AES-256-GCM
// ============================================================================

/// AES-256-GCM keyed from the shared key
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCipher;

impl AesGcmCipher {
    fn cipher(key: &SharedKey) -> Result<Aes256Gcm> {
        let subkey = key.derive_subkey(AES_GCM_INFO)?;
        Aes256Gcm::new_from_slice(subkey.as_bytes())
            .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))
    }
}

impl MessageCipher for AesGcmCipher {
    fn seal(&self, key: &SharedKey, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = Self::cipher(key)?;

        let mut nonce = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(AesNonce::from_slice(&nonce), plaintext)
            .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn open(&self, key: &SharedKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
            return Err(Error::DecryptionFailed(format!(
                "Ciphertext too short: {} bytes",
                ciphertext.len()
            )));
        }
        let (nonce, body) = ciphertext.split_at(NONCE_SIZE);
        let cipher = Self::cipher(key).map_err(|e| Error::DecryptionFailed(e.to_string()))?;

        cipher
            .decrypt(AesNonce::from_slice(nonce), body)
            .map_err(|_| {
                Error::DecryptionFailed("Decryption failed: authentication tag mismatch".into())
            })
    }
}

// ============================================================================
// TESTS
// ============================================================================
