//! Cipherline command-line tool
//!
//! Thin front end over `cipherline-core`:
//!
//! - `keygen`         derive a keypair from a password
//! - `fingerprint`    fingerprint a public key for out-of-band comparison
//! - `sign-challenge` answer a login nonce
//! - `compose`        build a signed, encrypted message (JSON on stdout)
//! - `open`           process a message (JSON on stdin or a file)
//! - `demo`           run the whole protocol in-process
//!
//! Passwords can come from `CIPHERLINE_PASSWORD` instead of the command line.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use serde_json::json;

use cipherline_core::crypto::{CipherSuite, KeyPair, PublicKey};
use cipherline_core::messaging::{Message, MessageContext, MessageProtocol};
use cipherline_core::trust::{display_fingerprint, fingerprint, KeyObservation, TrustStore};
use cipherline_core::{AuthService, ChatClient, Identity, LocalKeyServer, ProtocolConfig};

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "cipherline", version, about = "Cipherline identity and messaging tools")]
struct Args {
    /// Cipher suite for message bodies (xor_keystream | aes256_gcm)
    #[arg(long, global = true, env = "CIPHERLINE_CIPHER")]
    cipher: Option<CipherSuite>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive a keypair from a password
    Keygen {
        #[arg(long, env = "CIPHERLINE_PASSWORD", hide_env_values = true)]
        password: String,
        /// Also print the private key
        #[arg(long)]
        show_private: bool,
    },

    /// Fingerprint a public key
    Fingerprint {
        /// Uncompressed public key, 130 hex characters
        public_key: String,
    },

    /// Sign SHA3-256(nonce) with the password's key
    SignChallenge {
        #[arg(long, env = "CIPHERLINE_PASSWORD", hide_env_values = true)]
        password: String,
        /// Nonce as issued by the server (hex)
        #[arg(long)]
        nonce: String,
    },

    /// Compose a signed, encrypted message
    Compose {
        #[arg(long, env = "CIPHERLINE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Receiver's public key (130 hex characters)
        #[arg(long)]
        to_key: String,
        #[arg(long)]
        text: String,
    },

    /// Decrypt and classify a message
    Open {
        #[arg(long, env = "CIPHERLINE_PASSWORD", hide_env_values = true)]
        password: String,
        /// Sender's public key (130 hex characters)
        #[arg(long)]
        sender_key: String,
        /// Message JSON file; reads stdin when omitted
        #[arg(long)]
        message: Option<PathBuf>,
    },

    /// Run register, login, send, receive and a key rotation in-process
    Demo,
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cipherline=info,cipherline_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = ProtocolConfig::from_env().wrap_err("invalid CIPHERLINE_* configuration")?;
    if let Some(cipher) = args.cipher {
        config.cipher = cipher;
    }
    tracing::debug!(cipher = %config.cipher, "Configuration loaded");

    match args.command {
        Command::Keygen {
            password,
            show_private,
        } => keygen(&password, show_private),
        Command::Fingerprint { public_key } => print_fingerprint(&public_key),
        Command::SignChallenge { password, nonce } => sign_challenge(&password, &nonce),
        Command::Compose {
            password,
            from,
            to,
            to_key,
            text,
        } => compose(&config, &password, &from, &to, &to_key, &text),
        Command::Open {
            password,
            sender_key,
            message,
        } => open(&config, &password, &sender_key, message),
        Command::Demo => demo(config).await,
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn parse_key(hex: &str) -> Result<PublicKey> {
    Ok(PublicKey::from_hex(hex.trim())?)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn keygen(password: &str, show_private: bool) -> Result<()> {
    let pair = KeyPair::from_password(password)?;
    let fp = fingerprint(pair.public_key());

    let mut out = json!({
        "publicKey": pair.public_key().to_hex(),
        "fingerprint": fp,
        "fingerprintDisplay": display_fingerprint(&fp),
    });
    if show_private {
        out["privateKey"] = json!(pair.private_key().to_hex());
    }
    print_json(&out)
}

fn print_fingerprint(public_key: &str) -> Result<()> {
    let key = parse_key(public_key)?;
    let fp = fingerprint(&key);
    print_json(&json!({
        "fingerprint": fp,
        "fingerprintDisplay": display_fingerprint(&fp),
    }))
}

fn sign_challenge(password: &str, nonce: &str) -> Result<()> {
    let nonce = nonce.trim();
    if nonce.is_empty() || hex::decode(nonce).is_err() {
        return Err(eyre!("nonce must be a hex string"));
    }
    let pair = KeyPair::from_password(password)?;
    let signature = cipherline_core::crypto::sign(
        pair.private_key(),
        &cipherline_core::crypto::hash_str(nonce),
    )?;
    print_json(&signature)
}

fn compose(
    config: &ProtocolConfig,
    password: &str,
    from: &str,
    to: &str,
    to_key: &str,
    text: &str,
) -> Result<()> {
    let sender = Identity::from_password(from, password)?;
    let receiver_key = parse_key(to_key)?;

    let message = MessageProtocol::new(config.cipher).compose(
        sender.keypair().private_key(),
        &receiver_key,
        text,
        &MessageContext::now(from, to),
    )?;
    print_json(&message)
}

fn open(
    config: &ProtocolConfig,
    password: &str,
    sender_key: &str,
    message: Option<PathBuf>,
) -> Result<()> {
    let raw = match message {
        Some(path) => std::fs::read_to_string(&path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin()).wrap_err("failed to read stdin")?,
    };
    let message: Message = serde_json::from_str(&raw).wrap_err("message is not valid JSON")?;

    let pair = KeyPair::from_password(password)?;
    let sender = parse_key(sender_key)?;
    let classified = MessageProtocol::new(config.cipher).process(&message, &sender, pair.private_key());
    print_json(&classified)
}

async fn demo(config: ProtocolConfig) -> Result<()> {
    let server = Arc::new(LocalKeyServer::new(AuthService::new(config.auth.clone())?));
    let protocol = MessageProtocol::new(config.cipher);

    let alice = ChatClient::new(
        Arc::clone(&server),
        Identity::from_password("alice", "alice-demo-password")?,
        TrustStore::in_memory(),
        protocol,
    );
    let bob = ChatClient::new(
        Arc::clone(&server),
        Identity::from_password("bob", "bob-demo-password")?,
        TrustStore::in_memory(),
        protocol,
    );

    alice.register().await?;
    bob.register().await?;
    println!("registered alice ({})", display_fingerprint(&alice.identity().fingerprint()));
    println!("registered bob   ({})", display_fingerprint(&bob.identity().fingerprint()));

    // Bob tries to answer a challenge issued for alice.
    let nonce = server.auth().challenge("alice")?.nonce;
    let forged = bob.identity().answer_challenge(&nonce)?;
    match server.auth().verify("alice", &forged) {
        Ok(_) => return Err(eyre!("bob logged in as alice")),
        Err(e) => println!("bob answering alice's challenge: {}", e.redacted()),
    }

    alice.login().await?;
    bob.login().await?;
    println!("alice and bob logged in");

    let ack = alice.send("bob", "Hi Bob, this is Alice.").await?;
    println!("alice -> bob accepted as {}", ack.id);

    for received in bob.sync().await? {
        println!(
            "bob received {:?} from {} (trusted: {}): {:?}",
            received.message.status,
            received.message.sender,
            received.is_trusted(),
            received.message.text
        );
    }

    // Alice's pinned key for bob goes stale, as if bob had re-registered.
    let stale = KeyPair::generate();
    alice.trust().trust("bob", stale.public_key())?;
    match alice.send("bob", "are you still you?").await {
        Err(cipherline_core::Error::KeyChangeUnresolved(contact)) => {
            println!("alice refuses to send: key for {} changed", contact)
        }
        other => return Err(eyre!("expected a key change refusal, got {:?}", other)),
    }

    let (current, observation) = alice.fetch_contact_key("bob").await?;
    if !matches!(observation, KeyObservation::Changed { .. } | KeyObservation::Unchanged) {
        return Err(eyre!("unexpected observation {:?}", observation));
    }
    alice.trust().trust("bob", &current)?;
    alice.send("bob", "confirmed out of band").await?;
    println!("alice re-trusted bob after comparing {}", display_fingerprint(&fingerprint(&current)));

    alice.logout().await?;
    bob.logout().await?;
    println!("alice and bob logged out");

    Ok(())
}
