//! # Key Management
//!
//! Password-derived secp256k1 keypairs.
//!
//! ## Key Derivation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       PASSWORD → KEYPAIR                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  password (UTF-8)                                                      │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  SHA3-256 ──► 32-byte digest, read as a big-endian integer             │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  mod n (secp256k1 order) ──► private scalar d (64 hex chars, padded)   │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  d × G ──► public point Q, SEC1 uncompressed: 04 ‖ X ‖ Y (130 hex)     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Note
//!
//! There is no salt and no slow hash. The same password always yields the
//! same identity on any device, which is what lets a user log in from
//! anywhere with just a password. Changing the derivation changes every
//! registered public key, so it is kept as-is for compatibility.

use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{AffinePoint, NonZeroScalar, Scalar, U256};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::ZeroizeOnDrop;

use crate::crypto::hash::hash_str;
use crate::error::{Error, Result};

/// Size of a private scalar in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Size of an uncompressed SEC1 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 65;

/// Length of a hex-encoded private key
pub const PRIVATE_KEY_HEX_LEN: usize = PRIVATE_KEY_SIZE * 2;

/// Length of a hex-encoded uncompressed public key
pub const PUBLIC_KEY_HEX_LEN: usize = PUBLIC_KEY_SIZE * 2;

/// A secp256k1 private scalar
///
/// Never leaves the owning client. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct PrivateKey {
    #[zeroize(skip)] // k256::ecdsa::SigningKey zeroizes its own scalar
    signing: SigningKey,
}

impl PrivateKey {
    /// Generate a random private key from the OS RNG
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::random(&mut OsRng),
        }
    }

    /// Decode from 64 hex characters
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != PRIVATE_KEY_HEX_LEN {
            return Err(Error::InvalidKey(format!(
                "Private key must be {} hex characters",
                PRIVATE_KEY_HEX_LEN
            )));
        }
        let bytes = hex::decode(hex_str)
            .map_err(|e| Error::InvalidKey(format!("Invalid private key hex: {}", e)))?;
        let signing = SigningKey::from_slice(&bytes)
            .map_err(|_| Error::InvalidKey("Private key is zero or not below the curve order".into()))?;
        Ok(Self { signing })
    }

    /// Encode as 64 lower-case hex characters (left-padded)
    ///
    /// ## Security Warning
    ///
    /// Only use this for local storage. Never log or transmit the result.
    pub fn to_hex(&self) -> String {
        hex::encode(self.signing.to_bytes())
    }

    /// The public point `d × G`
    pub fn public_key(&self) -> PublicKey {
        PublicKey(k256::PublicKey::from_secret_scalar(
            self.signing.as_nonzero_scalar(),
        ))
    }

    /// Get reference to the ECDSA signing key
    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing
    }

    /// Get the raw non-zero scalar (for ECDH)
    pub(crate) fn scalar(&self) -> &NonZeroScalar {
        self.signing.as_nonzero_scalar()
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A secp256k1 public point
///
/// Safe to share. Serialized as uncompressed SEC1 hex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey(k256::PublicKey);

impl PublicKey {
    /// Decode from 130 hex characters of uncompressed SEC1 (`04 ‖ X ‖ Y`)
    ///
    /// Rejects compressed encodings, the identity and off-curve points.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != PUBLIC_KEY_HEX_LEN {
            return Err(Error::InvalidKey(format!(
                "Public key must be {} hex characters (uncompressed point)",
                PUBLIC_KEY_HEX_LEN
            )));
        }
        let bytes = hex::decode(hex_str)
            .map_err(|e| Error::InvalidKey(format!("Invalid public key hex: {}", e)))?;
        if bytes[0] != 0x04 {
            return Err(Error::InvalidKey(
                "Public key must use the uncompressed 0x04 prefix".into(),
            ));
        }
        k256::PublicKey::from_sec1_bytes(&bytes)
            .map(Self)
            .map_err(|_| Error::InvalidKey("Public key is not a valid secp256k1 point".into()))
    }

    /// Encode as uncompressed SEC1 hex (130 characters)
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_uncompressed_bytes())
    }

    /// Uncompressed SEC1 bytes
    pub fn to_uncompressed_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Verifying key for ECDSA
    pub(crate) fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey::from(&self.0)
    }

    /// Affine point for ECDH
    pub(crate) fn as_affine(&self) -> &AffinePoint {
        self.0.as_affine()
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Private key together with its public point
///
/// The public half is always `private × G`; both are computed together so
/// they cannot drift apart.
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Derive the keypair for a password
    pub fn from_password(password: &str) -> Result<Self> {
        Ok(Self::from_private(derive_private_key(password)?))
    }

    /// Generate a random keypair
    ///
    /// For throwaway identities only; a user-facing identity comes from
    /// [`KeyPair::from_password`].
    pub fn generate() -> Self {
        Self::from_private(PrivateKey::generate())
    }

    /// Wrap an existing private key
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    /// The private half
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    /// The public half
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }
}

/// Derive the private scalar for a password
///
/// `SHA3-256(password) mod n`. Deterministic. A digest that reduces to
/// zero has no valid key and is rejected.
pub fn derive_private_key(password: &str) -> Result<PrivateKey> {
    let digest = hash_str(password);
    let scalar = <Scalar as Reduce<U256>>::reduce(U256::from_be_slice(digest.as_bytes()));

    let scalar: Option<NonZeroScalar> = NonZeroScalar::new(scalar).into();
    let scalar = scalar.ok_or_else(|| {
        Error::KeyDerivationFailed("Password hash reduces to the zero scalar".into())
    })?;

    Ok(PrivateKey {
        signing: SigningKey::from(scalar),
    })
}

/// Derive the full keypair for a password
pub fn generate_keypair(password: &str) -> Result<KeyPair> {
    KeyPair::from_password(password)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::sha3_256;

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_private_key("correct horse battery staple").unwrap();
        let b = derive_private_key("correct horse battery staple").unwrap();
        assert_eq!(a.to_hex(), b.to_hex());
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_different_passwords_give_different_keys() {
        let a = derive_private_key("password-one").unwrap();
        let b = derive_private_key("password-two").unwrap();
        assert_ne!(a.to_hex(), b.to_hex());
    }

    #[test]
    fn test_private_key_is_padded_reduced_digest() {
        // The SHA3-256 digest of "abc" starts with 0x3a, well below n, so the
        // reduction leaves it unchanged.
        let key = derive_private_key("abc").unwrap();
        assert_eq!(key.to_hex(), sha3_256(b"abc").to_hex());
        assert_eq!(key.to_hex().len(), PRIVATE_KEY_HEX_LEN);
    }

    #[test]
    fn test_password_vectors() {
        let alice = generate_keypair("alice").unwrap();
        assert_eq!(
            alice.private_key().to_hex(),
            "a7dcef9aef26202fce82a7c7d6672afb3a149db207d90a07e437d5abc7fc99ed"
        );
        assert_eq!(
            alice.public_key().to_hex(),
            "04d290ae830882bbe531953924bf7eb62bd4c536bad17c5c86b167dbe3589beb1a\
             06adeb22156499094e79f06e6bcf8d1e4fa57e1d6381b2e4debebbbe8afa0a79"
        );

        let bob = generate_keypair("bob").unwrap();
        assert_eq!(
            bob.private_key().to_hex(),
            "b5d577dc9ce59725e29886632e69ecdf3b6ca49c0a14f4315a2404fc1508672d"
        );
        assert_eq!(
            bob.public_key().to_hex(),
            "04ba877fa8901fb0b0ec92dd3d90436d9df3895bdcacf15881bace214bb4874ff9\
             c7e6e21227038916d36b032177a1624b7fbae202f4e04cc7d4d60efab0dba61c"
        );
    }

    #[test]
    fn test_public_key_is_base_point_multiple() {
        let pair = generate_keypair("hunter2").unwrap();
        let expected = k256::PublicKey::from_secret_scalar(pair.private_key().scalar());
        assert_eq!(pair.public_key(), &PublicKey(expected));
    }

    #[test]
    fn test_public_key_hex_is_uncompressed() {
        let pair = KeyPair::generate();
        let hex = pair.public_key().to_hex();
        assert_eq!(hex.len(), PUBLIC_KEY_HEX_LEN);
        assert!(hex.starts_with("04"));
        assert_eq!(PublicKey::from_hex(&hex).unwrap(), *pair.public_key());
    }

    #[test]
    fn test_public_key_rejects_compressed_and_garbage() {
        let pair = KeyPair::generate();
        let compressed = hex::encode(pair.public_key().0.to_encoded_point(true).as_bytes());
        assert!(PublicKey::from_hex(&compressed).is_err());

        let mut not_on_curve = String::from("04");
        not_on_curve.push_str(&"11".repeat(64));
        assert!(PublicKey::from_hex(&not_on_curve).is_err());

        assert!(PublicKey::from_hex("not hex").is_err());
    }

    #[test]
    fn test_private_key_hex_round_trip() {
        let key = PrivateKey::generate();
        let restored = PrivateKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(restored.public_key(), key.public_key());
    }

    #[test]
    fn test_private_key_rejects_zero() {
        assert!(PrivateKey::from_hex(&"00".repeat(32)).is_err());
    }

    #[test]
    fn test_public_key_serialization() {
        let pair = KeyPair::generate();
        let json = serde_json::to_string(pair.public_key()).unwrap();
        let restored: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(&restored, pair.public_key());
    }

    #[test]
    fn test_private_key_debug_is_redacted() {
        let key = derive_private_key("secret").unwrap();
        assert!(!format!("{:?}", key).contains(&key.to_hex()));
    }
}
