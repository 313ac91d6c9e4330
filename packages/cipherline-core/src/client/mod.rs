//! # Client Module
//!
//! The network-facing half of the protocol. Everything that waits on a
//! server goes through the async [`KeyServer`] trait; the cryptography
//! itself stays synchronous.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         CLIENT SESSION                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ChatClient                          KeyServer                          │
//! │  ──────────                          ─────────                          │
//! │  register()      ── public identity ──► register                        │
//! │  login()         ── username ─────────► challenge ──► nonce             │
//! │                  ── sign(SHA3(nonce)) ► verify    ──► credentials       │
//! │  send(to, text)  ── username ─────────► public_key ─┐                   │
//! │                     TrustStore.observe ◄────────────┘                   │
//! │                     (refuse if a key change is pending)                 │
//! │                  ── compose ──────────► submit_message ──► ack          │
//! │  sync()          ─────────────────────► fetch_messages                  │
//! │                     for each: fetch sender key, observe, process        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No call has a timeout; that is left to the transport.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::{AuthService, SessionCredentials};
use crate::crypto::{PublicKey, Signature};
use crate::error::{Error, Result};
use crate::identity::{Identity, PublicIdentity};
use crate::messaging::{Acknowledgement, ClassifiedMessage, Message, MessageContext, MessageProtocol};
use crate::trust::{KeyObservation, TrustStore};

/// The server-side endpoints a client talks to
#[async_trait]
pub trait KeyServer: Send + Sync {
    /// Store a username with its public key
    async fn register(&self, identity: PublicIdentity) -> Result<()>;

    /// Request a login nonce (hex)
    async fn challenge(&self, username: &str) -> Result<String>;

    /// Answer the outstanding nonce; issues credentials on success
    async fn verify(&self, username: &str, signature: Signature) -> Result<SessionCredentials>;

    /// Revoke an access token
    async fn logout(&self, access_token: &str) -> Result<()>;

    async fn public_key(&self, username: &str) -> Result<PublicIdentity>;

    /// Accept a message from the token's owner for delivery
    async fn submit_message(&self, access_token: &str, message: Message) -> Result<Acknowledgement>;

    /// Take every message waiting for the token's owner
    async fn fetch_messages(&self, access_token: &str) -> Result<Vec<Message>>;
}

// ============================================================================
// IN-PROCESS SERVER
// ============================================================================

/// A [`KeyServer`] running in the same process
///
/// Wraps an [`AuthService`], remembers which access token belongs to whom
/// and keeps one inbox per receiver.
pub struct LocalKeyServer {
    auth: AuthService,
    sessions: DashMap<String, String>,
    inboxes: DashMap<String, Vec<Message>>,
}

impl LocalKeyServer {
    /// Server with no sessions and empty inboxes
    pub fn new(auth: AuthService) -> Self {
        Self {
            auth,
            sessions: DashMap::new(),
            inboxes: DashMap::new(),
        }
    }

    /// The wrapped authentication service
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// Messages currently waiting for `username`
    pub fn inbox(&self, username: &str) -> Vec<Message> {
        self.inboxes
            .get(username)
            .map(|m| m.value().clone())
            .unwrap_or_default()
    }

    /// Place a message in an inbox without any checks
    ///
    /// Stands in for a relay that delivers whatever it is handed.
    pub fn deliver_raw(&self, message: Message) {
        self.inboxes
            .entry(message.receiver_username.clone())
            .or_default()
            .push(message);
    }

    fn session_owner(&self, access_token: &str) -> Result<String> {
        self.sessions
            .get(access_token)
            .map(|u| u.value().clone())
            .ok_or(Error::NotAuthenticated)
    }
}

#[async_trait]
impl KeyServer for LocalKeyServer {
    async fn register(&self, identity: PublicIdentity) -> Result<()> {
        self.auth.register(&identity.username, identity.public_key)
    }

    async fn challenge(&self, username: &str) -> Result<String> {
        Ok(self.auth.challenge(username)?.nonce)
    }

    async fn verify(&self, username: &str, signature: Signature) -> Result<SessionCredentials> {
        let credentials = self.auth.verify(username, &signature)?;
        self.sessions
            .insert(credentials.access_token.clone(), username.to_string());
        Ok(credentials)
    }

    async fn logout(&self, access_token: &str) -> Result<()> {
        let (_, username) = self
            .sessions
            .remove(access_token)
            .ok_or(Error::NotAuthenticated)?;
        tracing::info!(username = %username, "Session revoked");
        Ok(())
    }

    async fn public_key(&self, username: &str) -> Result<PublicIdentity> {
        self.auth.public_key(username)
    }

    async fn submit_message(&self, access_token: &str, message: Message) -> Result<Acknowledgement> {
        let owner = self.session_owner(access_token)?;
        message.validate()?;
        if owner != message.sender_username {
            return Err(Error::Validation(
                "sender_username does not match the authenticated user".into(),
            ));
        }
        self.auth.public_key(&message.receiver_username)?;

        let ack = Acknowledgement {
            id: Uuid::new_v4(),
            received_at: crate::time::now(),
        };
        tracing::debug!(
            id = %ack.id,
            sender = %message.sender_username,
            receiver = %message.receiver_username,
            "Message accepted"
        );
        self.deliver_raw(message);
        Ok(ack)
    }

    async fn fetch_messages(&self, access_token: &str) -> Result<Vec<Message>> {
        let owner = self.session_owner(access_token)?;
        Ok(self
            .inboxes
            .remove(&owner)
            .map(|(_, messages)| messages)
            .unwrap_or_default())
    }
}

// ============================================================================
// CHAT CLIENT
// ============================================================================

/// A processed message plus what the trust store made of its sender's key
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message: ClassifiedMessage,
    /// `None` when the sender's key could not be fetched
    pub sender_key: Option<KeyObservation>,
    /// The sender's key is pinned with no change pending
    pub sender_trusted: bool,
}

impl ReceivedMessage {
    /// Verified, and the sender's key is not in an unresolved change
    pub fn is_trusted(&self) -> bool {
        self.message.is_verified() && self.sender_trusted
    }
}

/// One user's view of the protocol
pub struct ChatClient<S: KeyServer> {
    server: Arc<S>,
    identity: Identity,
    trust: TrustStore,
    protocol: MessageProtocol,
    credentials: Mutex<Option<SessionCredentials>>,
}

impl<S: KeyServer> ChatClient<S> {
    /// A logged-out client for `identity`
    pub fn new(server: Arc<S>, identity: Identity, trust: TrustStore, protocol: MessageProtocol) -> Self {
        Self {
            server,
            identity,
            trust,
            protocol,
            credentials: Mutex::new(None),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// This client's pinned contact keys
    pub fn trust(&self) -> &TrustStore {
        &self.trust
    }

    /// Publish this identity's public key
    pub async fn register(&self) -> Result<()> {
        self.server.register(self.identity.public_identity()).await
    }

    /// Challenge, sign and verify; keeps the issued credentials
    pub async fn login(&self) -> Result<()> {
        let username = self.identity.username();
        let nonce = self.server.challenge(username).await?;
        let signature = self.identity.answer_challenge(&nonce)?;
        let credentials = self.server.verify(username, signature).await?;

        *self.credentials.lock().await = Some(credentials);
        tracing::info!(username, "Logged in");
        Ok(())
    }

    /// Drop the credentials and revoke the access token on the server
    ///
    /// Logging out while logged out does nothing.
    pub async fn logout(&self) -> Result<()> {
        let Some(credentials) = self.credentials.lock().await.take() else {
            return Ok(());
        };
        self.server.logout(&credentials.access_token).await?;
        tracing::info!(username = self.identity.username(), "Logged out");
        Ok(())
    }

    pub async fn is_logged_in(&self) -> bool {
        self.credentials.lock().await.is_some()
    }

    async fn access_token(&self) -> Result<String> {
        self.credentials
            .lock()
            .await
            .as_ref()
            .map(|c| c.access_token.clone())
            .ok_or(Error::NotAuthenticated)
    }

    /// Fetch a contact's key and record it in the trust store
    pub async fn fetch_contact_key(&self, contact: &str) -> Result<(PublicKey, KeyObservation)> {
        let remote = self.server.public_key(contact).await?;
        let observation = self.trust.observe(contact, &remote.public_key)?;
        Ok((remote.public_key, observation))
    }

    /// Encrypt, sign and submit a message
    ///
    /// Refuses with [`Error::KeyChangeUnresolved`] while the receiver's key
    /// change has not been resolved with [`TrustStore::trust`] or
    /// [`TrustStore::reject`].
    pub async fn send(&self, to: &str, text: &str) -> Result<Acknowledgement> {
        let token = self.access_token().await?;
        let (receiver_key, _) = self.fetch_contact_key(to).await?;

        if !self.trust.is_trusted(to, &receiver_key)? {
            tracing::warn!(contact = to, "Refusing to send: key change unresolved");
            return Err(Error::KeyChangeUnresolved(to.to_string()));
        }

        let context = MessageContext::now(self.identity.username(), to);
        let message = self.protocol.compose(
            self.identity.keypair().private_key(),
            &receiver_key,
            text,
            &context,
        )?;
        self.server.submit_message(&token, message).await
    }

    /// Process one delivered message
    ///
    /// Never fails. A sender whose key cannot be fetched yields a
    /// `corrupted` entry carrying the error.
    pub async fn receive(&self, message: &Message) -> ReceivedMessage {
        let sender = message.sender_username.as_str();

        let (sender_key, observation) = match self.fetch_contact_key(sender).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(sender, error = %e, "Sender key unavailable");
                return ReceivedMessage {
                    message: ClassifiedMessage::corrupted(message, &e),
                    sender_key: None,
                    sender_trusted: false,
                };
            }
        };

        let sender_trusted = match self.trust.is_trusted(sender, &sender_key) {
            Ok(trusted) => trusted,
            Err(e) => {
                tracing::warn!(sender, error = %e, "Trust lookup failed");
                false
            }
        };

        let classified =
            self.protocol
                .process(message, &sender_key, self.identity.keypair().private_key());
        ReceivedMessage {
            message: classified,
            sender_key: Some(observation),
            sender_trusted,
        }
    }

    /// Fetch and process everything waiting
    ///
    /// Only fetching can fail. Every fetched message comes back classified.
    pub async fn sync(&self) -> Result<Vec<ReceivedMessage>> {
        let token = self.access_token().await?;
        let messages = self.server.fetch_messages(&token).await?;

        let mut received = Vec::with_capacity(messages.len());
        for message in &messages {
            received.push(self.receive(message).await);
        }
        Ok(received)
    }
}

// ============================================================================
// TESTS
// ============================================================================
