//! # Error Handling
//!
//! Error types for Cipherline Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Request Errors                                                    │
//! │  │   └── Validation            - Malformed request shape (400)         │
//! │  │                                                                      │
//! │  ├── Directory Errors                                                  │
//! │  │   ├── NotFound              - Unknown username/contact (404)        │
//! │  │   └── Conflict              - Duplicate registration (409)          │
//! │  │                                                                      │
//! │  ├── Authentication Errors                                             │
//! │  │   ├── ChallengeMissing      - No nonce or no public key (401)       │
//! │  │   ├── SignatureInvalid      - Nonce signature rejected (401)        │
//! │  │   └── AuthenticationFailed  - Redacted form of the two above        │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── InvalidKey            - Bad key encoding / off-curve point    │
//! │  │   ├── KeyDerivationFailed   - Degenerate password scalar            │
//! │  │   ├── SigningFailed         - ECDSA signing failed                  │
//! │  │   ├── EncryptionFailed      - Cipher seal failed                    │
//! │  │   ├── DecryptionFailed      - Malformed ciphertext / tag mismatch   │
//! │  │   └── IntegrityMismatch     - Recomputed hash disagrees             │
//! │  │                                                                      │
//! │  ├── Trust Errors                                                      │
//! │  │   └── KeyChangeUnresolved   - Contact key changed, not yet trusted  │
//! │  │                                                                      │
//! │  └── Storage / Internal Errors                                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Oracle Hardening
//!
//! Inside the crate `ChallengeMissing` and `SignatureInvalid` stay distinct
//! so callers and tests can reason about them. At the outer boundary
//! ([`ErrorResponse`]) both collapse into one indistinguishable
//! "authentication failed" answer.

use thiserror::Error;

/// Result type alias for Cipherline Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Cipherline Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Request Errors (100-199)
    // ========================================================================

    /// Malformed request shape
    #[error("Invalid request: {0}")]
    Validation(String),

    // ========================================================================
    // Directory Errors (200-299)
    // ========================================================================

    /// Unknown username or contact
    #[error("Not found: {0}")]
    NotFound(String),

    /// Username already registered
    #[error("User with this username already exists: {0}")]
    Conflict(String),

    // ========================================================================
    // Authentication Errors (300-399)
    // ========================================================================

    /// No outstanding nonce, or no registered public key, for the username
    #[error("No outstanding challenge for this user.")]
    ChallengeMissing,

    /// Signature over the nonce hash did not verify
    #[error("Challenge signature is invalid.")]
    SignatureInvalid,

    /// Redacted authentication failure (boundary form)
    #[error("Authentication failed.")]
    AuthenticationFailed,

    /// Operation needs an authenticated session
    #[error("Not logged in.")]
    NotAuthenticated,

    // ========================================================================
    // Crypto Errors (400-499)
    // ========================================================================

    /// Invalid key format or point
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Key derivation failed
    #[error("Failed to derive keys: {0}")]
    KeyDerivationFailed(String),

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Recomputed hash disagrees with the signed binding
    #[error("Message integrity check failed.")]
    IntegrityMismatch,

    // ========================================================================
    // Trust Errors (500-599)
    // ========================================================================

    /// The contact's public key changed and has not been re-trusted
    #[error("Public key for {0} changed and has not been confirmed.")]
    KeyChangeUnresolved(String),

    // ========================================================================
    // Storage Errors (600-699)
    // ========================================================================

    /// Failed to read from storage
    #[error("Failed to read from storage: {0}")]
    StorageReadError(String),

    /// Failed to write to storage
    #[error("Failed to write to storage: {0}")]
    StorageWriteError(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are organized by category:
    /// - 100-199: Request validation
    /// - 200-299: Directory
    /// - 300-399: Authentication
    /// - 400-499: Crypto
    /// - 500-599: Trust
    /// - 600-699: Storage
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            Error::Validation(_) => 100,

            Error::NotFound(_) => 200,
            Error::Conflict(_) => 201,

            Error::ChallengeMissing => 300,
            Error::SignatureInvalid => 301,
            Error::AuthenticationFailed => 302,
            Error::NotAuthenticated => 303,

            Error::InvalidKey(_) => 400,
            Error::KeyDerivationFailed(_) => 401,
            Error::SigningFailed(_) => 402,
            Error::EncryptionFailed(_) => 403,
            Error::DecryptionFailed(_) => 404,
            Error::IntegrityMismatch => 405,

            Error::KeyChangeUnresolved(_) => 500,

            Error::StorageReadError(_) => 600,
            Error::StorageWriteError(_) => 601,

            Error::InvalidConfig(_) => 900,
            Error::Internal(_) => 901,
            Error::SerializationError(_) => 902,
            Error::DeserializationError(_) => 903,
        }
    }

    /// HTTP-style status for the conceptual endpoints
    pub fn status(&self) -> u16 {
        match self {
            Error::Validation(_)
            | Error::InvalidKey(_)
            | Error::DeserializationError(_) => 400,
            Error::ChallengeMissing
            | Error::SignatureInvalid
            | Error::AuthenticationFailed
            | Error::NotAuthenticated => 401,
            Error::NotFound(_) => 404,
            Error::Conflict(_) | Error::KeyChangeUnresolved(_) => 409,
            Error::DecryptionFailed(_) | Error::IntegrityMismatch => 422,
            _ => 500,
        }
    }

    /// Whether this is one of the authentication failures
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Error::ChallengeMissing | Error::SignatureInvalid | Error::AuthenticationFailed
        )
    }

    /// Collapse distinguishable authentication failures into one
    pub fn redacted(self) -> Self {
        if self.is_authentication_failure() {
            Error::AuthenticationFailed
        } else {
            self
        }
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::StorageReadError(err.to_string())
    }
}

// ============================================================================
// BOUNDARY ERROR REPRESENTATION
// ============================================================================

/// Error shape handed to an outer transport
///
/// Authentication failures are redacted so the caller cannot tell a
/// missing challenge from a bad signature.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ErrorResponse {
    /// Numeric error code
    pub code: i32,
    /// HTTP-style status
    pub status: u16,
    /// Human-readable error message
    pub message: String,
}

impl From<Error> for ErrorResponse {
    fn from(err: Error) -> Self {
        let err = err.redacted();
        Self {
            code: err.code(),
            status: err.status(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
