//! Protocol configuration.
//!
//! Plain structs with documented defaults. Values can be overridden from
//! `CIPHERLINE_*` environment variables.

use std::env;
use std::time::Duration;

use crate::crypto::CipherSuite;
use crate::error::{Error, Result};

/// Default nonce length in bytes
pub const DEFAULT_NONCE_BYTES: usize = 32;

/// Shortest nonce the protocol accepts
pub const MIN_NONCE_BYTES: usize = 16;

/// Default lifetime of an outstanding challenge (5 minutes)
pub const DEFAULT_CHALLENGE_TTL_SECS: u64 = 300;

/// Default size of each opaque session token in bytes
pub const DEFAULT_TOKEN_BYTES: usize = 32;

/// Authentication settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Random bytes per challenge nonce
    pub nonce_bytes: usize,
    /// Seconds an issued challenge stays answerable
    pub challenge_ttl_secs: u64,
    /// Random bytes per access/refresh token
    pub token_bytes: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            nonce_bytes: DEFAULT_NONCE_BYTES,
            challenge_ttl_secs: DEFAULT_CHALLENGE_TTL_SECS,
            token_bytes: DEFAULT_TOKEN_BYTES,
        }
    }
}

impl AuthConfig {
    /// Challenge lifetime as a [`Duration`]
    pub fn challenge_ttl(&self) -> Duration {
        Duration::from_secs(self.challenge_ttl_secs)
    }

    /// Reject settings the protocol cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.nonce_bytes < MIN_NONCE_BYTES {
            return Err(Error::InvalidConfig(format!(
                "nonce_bytes must be at least {}, got {}",
                MIN_NONCE_BYTES, self.nonce_bytes
            )));
        }
        if self.challenge_ttl_secs == 0 {
            return Err(Error::InvalidConfig(
                "challenge_ttl_secs must be greater than zero".into(),
            ));
        }
        if self.token_bytes < 16 {
            return Err(Error::InvalidConfig(format!(
                "token_bytes must be at least 16, got {}",
                self.token_bytes
            )));
        }
        Ok(())
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Authentication settings
    pub auth: AuthConfig,
    /// Cipher protecting message bodies
    pub cipher: CipherSuite,
}

impl ProtocolConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                        | Field                    |
    /// |---------------------------------|--------------------------|
    /// | `CIPHERLINE_NONCE_BYTES`        | `auth.nonce_bytes`       |
    /// | `CIPHERLINE_CHALLENGE_TTL_SECS` | `auth.challenge_ttl_secs`|
    /// | `CIPHERLINE_TOKEN_BYTES`        | `auth.token_bytes`       |
    /// | `CIPHERLINE_CIPHER`             | `cipher`                 |
    ///
    /// Unset variables keep their defaults. The result is validated.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup("CIPHERLINE_NONCE_BYTES") {
            config.auth.nonce_bytes = parse_var("CIPHERLINE_NONCE_BYTES", &value)?;
        }
        if let Some(value) = lookup("CIPHERLINE_CHALLENGE_TTL_SECS") {
            config.auth.challenge_ttl_secs = parse_var("CIPHERLINE_CHALLENGE_TTL_SECS", &value)?;
        }
        if let Some(value) = lookup("CIPHERLINE_TOKEN_BYTES") {
            config.auth.token_bytes = parse_var("CIPHERLINE_TOKEN_BYTES", &value)?;
        }
        if let Some(value) = lookup("CIPHERLINE_CIPHER") {
            config.cipher = value.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the protocol cannot run with
    pub fn validate(&self) -> Result<()> {
        self.auth.validate()
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{} has an invalid value: {:?}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ProtocolConfig::default();
        assert_eq!(config.auth.nonce_bytes, 32);
        assert_eq!(config.auth.challenge_ttl(), Duration::from_secs(300));
        assert_eq!(config.cipher, CipherSuite::XorKeystream);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_short_nonce_rejected() {
        let config = AuthConfig {
            nonce_bytes: 8,
            ..AuthConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = AuthConfig {
            challenge_ttl_secs: 0,
            ..AuthConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lookup_overrides() {
        let config = ProtocolConfig::from_lookup(lookup(&[
            ("CIPHERLINE_NONCE_BYTES", "24"),
            ("CIPHERLINE_CHALLENGE_TTL_SECS", "60"),
            ("CIPHERLINE_CIPHER", "aes256_gcm"),
        ]))
        .unwrap();

        assert_eq!(config.auth.nonce_bytes, 24);
        assert_eq!(config.auth.challenge_ttl_secs, 60);
        assert_eq!(config.auth.token_bytes, DEFAULT_TOKEN_BYTES);
        assert_eq!(config.cipher, CipherSuite::Aes256Gcm);
    }

    #[test]
    fn test_lookup_rejects_bad_values() {
        assert!(ProtocolConfig::from_lookup(lookup(&[("CIPHERLINE_NONCE_BYTES", "lots")])).is_err());
        assert!(ProtocolConfig::from_lookup(lookup(&[("CIPHERLINE_NONCE_BYTES", "4")])).is_err());
        assert!(ProtocolConfig::from_lookup(lookup(&[("CIPHERLINE_CIPHER", "rot13")])).is_err());
    }
}
