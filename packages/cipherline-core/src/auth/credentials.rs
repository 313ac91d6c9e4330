//! Session credentials handed out after a successful login.
//!
//! The token format belongs to whoever issues them. The reference issuer
//! produces random hex strings and keeps no state.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_TOKEN_BYTES;
use crate::error::Result;

/// Opaque bearer credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCredentials {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Issues credentials once a login signature has been accepted
pub trait CredentialIssuer: Send + Sync {
    fn issue(&self, username: &str) -> Result<SessionCredentials>;
}

/// Random hex tokens
#[derive(Debug, Clone)]
pub struct OpaqueTokenIssuer {
    token_bytes: usize,
}

impl OpaqueTokenIssuer {
    pub fn new(token_bytes: usize) -> Self {
        Self { token_bytes }
    }

    fn token(&self) -> String {
        let mut bytes = vec![0u8; self.token_bytes];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

impl Default for OpaqueTokenIssuer {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_BYTES)
    }
}

impl CredentialIssuer for OpaqueTokenIssuer {
    fn issue(&self, _username: &str) -> Result<SessionCredentials> {
        Ok(SessionCredentials {
            access_token: self.token(),
            refresh_token: self.token(),
        })
    }
}
