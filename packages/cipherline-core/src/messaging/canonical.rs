//! Canonical signed payload.
//!
//! Version 1 is compact JSON with keys in a fixed order:
//!
//! ```text
//! {"sender":"alice","receiver":"bob","msg":"hi","ts":"2025-01-01T00:00:00.000Z"}
//! ```
//!
//! `ts` is the wire timestamp string exactly as declared, never re-rendered.
//! serde_json escapes strings the same way `JSON.stringify` does, so both
//! ends agree byte for byte.

use serde::Serialize;

use crate::crypto::{hash_str, Hash256};
use crate::error::Result;

/// Current canonical payload version
pub const CANONICAL_VERSION: u32 = 1;

/// The fields bound by a message signature
///
/// Field order here is the wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanonicalPayload<'a> {
    pub sender: &'a str,
    pub receiver: &'a str,
    pub msg: &'a str,
    pub ts: &'a str,
}

impl<'a> CanonicalPayload<'a> {
    pub fn new(sender: &'a str, receiver: &'a str, msg: &'a str, ts: &'a str) -> Self {
        Self {
            sender,
            receiver,
            msg,
            ts,
        }
    }

    /// Serialize to the canonical JSON text
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// SHA3-256 of the canonical JSON text
    pub fn hash(&self) -> Result<Hash256> {
        Ok(hash_str(&self.to_json()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_and_compactness() {
        let payload = CanonicalPayload::new("alice", "bob", "hi", "2025-01-01T00:00:00.000Z");
        assert_eq!(
            payload.to_json().unwrap(),
            r#"{"sender":"alice","receiver":"bob","msg":"hi","ts":"2025-01-01T00:00:00.000Z"}"#
        );
    }

    #[test]
    fn test_escaping_matches_json_stringify() {
        let payload = CanonicalPayload::new("a", "b", "say \"hi\"\n\tnow \u{1}", "t");
        assert_eq!(
            payload.to_json().unwrap(),
            r#"{"sender":"a","receiver":"b","msg":"say \"hi\"\n\tnow \u0001","ts":"t"}"#
        );
    }

    #[test]
    fn test_non_ascii_is_not_escaped() {
        let payload = CanonicalPayload::new("a", "b", "héllo 👋", "t");
        assert!(payload.to_json().unwrap().contains("héllo 👋"));
    }

    #[test]
    fn test_hash_binds_every_field() {
        let base = CanonicalPayload::new("alice", "bob", "hi", "t1");
        let hash = base.hash().unwrap();
        assert_ne!(hash, CanonicalPayload { sender: "carol", ..base }.hash().unwrap());
        assert_ne!(hash, CanonicalPayload { receiver: "carol", ..base }.hash().unwrap());
        assert_ne!(hash, CanonicalPayload { msg: "hI", ..base }.hash().unwrap());
        assert_ne!(hash, CanonicalPayload { ts: "t2", ..base }.hash().unwrap());
    }
}
