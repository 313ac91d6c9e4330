//! # Digital Signatures
//!
//! ECDSA over secp256k1 on pre-computed SHA3-256 digests.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       SIGN / VERIFY                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  caller: data ──► SHA3-256 ──► hash (32 bytes)                         │
//! │                                   │                                     │
//! │        sign(private, hash) ───────┴──► { r, s }   (64 hex chars each)  │
//! │                                                                         │
//! │        verify(public, hash, {r, s}) ──► true / false                   │
//! │          • r, s must be in [1, n-1]        (else false)                │
//! │          • high-s is normalized first                                  │
//! │          • never panics, never errors                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never hashes for the caller. Signing uses RFC 6979 nonces,
//! so the same key and hash always produce the same signature.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::Signature as EcdsaSignature;
use serde::{Deserialize, Serialize};

use super::hash::Hash256;
use super::keys::{PrivateKey, PublicKey};
use crate::error::{Error, Result};

/// Maximum length of one hex-encoded signature component
pub const SCALAR_HEX_LEN: usize = 64;

/// An ECDSA signature as it travels on the wire
///
/// Both components are hex strings. Signers in the wild sometimes drop
/// leading zeros, so anything from 1 to 64 hex characters is accepted and
/// left-padded.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// The `r` component
    pub r: String,
    /// The `s` component
    pub s: String,
}

impl Signature {
    /// Create from component hex strings
    pub fn new(r: impl Into<String>, s: impl Into<String>) -> Self {
        Self {
            r: r.into(),
            s: s.into(),
        }
    }

    /// Check the structured `{r, s}` shape before any curve arithmetic
    pub fn validate(&self) -> Result<()> {
        validate_component("r", &self.r)?;
        validate_component("s", &self.s)
    }

    /// Decode both components into 32-byte big-endian scalars
    fn to_scalar_bytes(&self) -> Option<([u8; 32], [u8; 32])> {
        Some((decode_component(&self.r)?, decode_component(&self.s)?))
    }

    fn from_ecdsa(signature: &EcdsaSignature) -> Self {
        let (r, s) = signature.split_bytes();
        Self {
            r: hex::encode(r),
            s: hex::encode(s),
        }
    }
}

fn validate_component(name: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.len() > SCALAR_HEX_LEN {
        return Err(Error::Validation(format!(
            "Signature component '{}' must be 1-{} hex characters",
            name, SCALAR_HEX_LEN
        )));
    }
    if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::Validation(format!(
            "Signature component '{}' is not hex",
            name
        )));
    }
    Ok(())
}

fn decode_component(value: &str) -> Option<[u8; 32]> {
    if value.is_empty() || value.len() > SCALAR_HEX_LEN {
        return None;
    }
    let padded = format!("{:0>width$}", value, width = SCALAR_HEX_LEN);
    let mut out = [0u8; 32];
    hex::decode_to_slice(padded, &mut out).ok()?;
    Some(out)
}

/// Sign a pre-computed digest
pub fn sign(private_key: &PrivateKey, hash: &Hash256) -> Result<Signature> {
    let signature: EcdsaSignature = private_key
        .signing_key()
        .sign_prehash(hash.as_bytes())
        .map_err(|e| Error::SigningFailed(e.to_string()))?;
    Ok(Signature::from_ecdsa(&signature))
}

/// Verify a signature over a pre-computed digest
///
/// Returns `false` for malformed hex, out-of-range scalars, the wrong key or
/// the wrong hash. Pure; never panics.
pub fn verify(public_key: &PublicKey, hash: &Hash256, signature: &Signature) -> bool {
    let Some((r, s)) = signature.to_scalar_bytes() else {
        return false;
    };
    let Ok(parsed) = EcdsaSignature::from_scalars(r, s) else {
        return false;
    };
    let parsed = parsed.normalize_s().unwrap_or(parsed);

    public_key
        .verifying_key()
        .verify_prehash(hash.as_bytes(), &parsed)
        .is_ok()
}

// ============================================================================
// TESTS
// ============================================================================
