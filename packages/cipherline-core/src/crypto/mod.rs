//! # Cryptography Module
//!
//! Every cryptographic primitive used by Cipherline Core.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  password ──► SHA3-256 ──► mod n ──► private scalar d                  │
//! │                                         │                               │
//! │                                         ▼                               │
//! │                                 public point Q = d × G                 │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌────────────┐  │
//! │  │   keys       │  │   signing    │  │  agreement   │  │   cipher   │  │
//! │  │              │  │              │  │              │  │            │  │
//! │  │ derive d, Q  │  │ ECDSA over   │  │ ECDH x-coord │  │ seal/open  │  │
//! │  │ hex codecs   │  │ a 32-byte    │  │ → SHA3-256   │  │ XOR or     │  │
//! │  │              │  │ pre-hash     │  │ → SharedKey  │  │ AES-GCM    │  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └────────────┘  │
//! │                                                                         │
//! │  Curve: secp256k1 (k256)          Hash: SHA3-256 (sha3)                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Secret Handling
//!
//! - Private scalars and shared keys are zeroized on drop
//! - `Debug` output of secret types is redacted
//! - Nothing in this module logs

mod agreement;
mod cipher;
mod hash;
mod keys;
mod signing;

pub use agreement::{shared_secret, CipherKey, SharedKey, KEY_SIZE};
pub use cipher::{AesGcmCipher, CipherSuite, MessageCipher, XorKeystreamCipher};
pub use hash::{hash_str, sha3_256, Hash256, HASH_HEX_LEN, HASH_SIZE};
pub use keys::{
    derive_private_key, generate_keypair, KeyPair, PrivateKey, PublicKey, PRIVATE_KEY_HEX_LEN,
    PUBLIC_KEY_HEX_LEN,
};
pub use signing::{sign, verify, Signature};
