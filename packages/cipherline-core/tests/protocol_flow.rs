//! End-to-end protocol flows through the public API.

use std::sync::Arc;

use cipherline_core::auth::{AuthService, MemoryChallengeStore, MemoryUserDirectory, OpaqueTokenIssuer};
use cipherline_core::crypto::{
    derive_private_key, hash_str, shared_secret, sign, verify, CipherSuite, KeyPair,
};
use cipherline_core::messaging::{self, MessageContext, MessageProtocol, MessageStatus};
use cipherline_core::trust::{fingerprint, FileTrustRepository, KeyObservation, TrustStore};
use cipherline_core::{
    AuthConfig, ChatClient, Error, ErrorResponse, Identity, KeyServer, LocalKeyServer,
};

fn auth() -> AuthService {
    AuthService::new(AuthConfig::default()).unwrap()
}

#[test]
fn bob_cannot_answer_alices_challenge() {
    let auth = auth();
    let alice = Identity::from_password("alice", "alice's password").unwrap();
    let bob = Identity::from_password("bob", "bob's password").unwrap();
    auth.register("alice", *alice.public_key()).unwrap();

    let nonce = auth.challenge("alice").unwrap().nonce;
    assert!(nonce.len() >= 32);

    let bobs_answer = bob.answer_challenge(&nonce).unwrap();
    let err = auth.verify("alice", &bobs_answer).unwrap_err();
    assert!(matches!(err, Error::SignatureInvalid));

    // At the boundary the failure does not say which check failed.
    let response = ErrorResponse::from(err);
    assert_eq!(response, ErrorResponse::from(Error::ChallengeMissing));
    assert_eq!(response.status, 401);

    // Alice can still log in with the same nonce.
    let answer = alice.answer_challenge(&nonce).unwrap();
    assert!(auth.verify("alice", &answer).is_ok());
}

#[test]
fn replayed_login_signature_is_challenge_missing() {
    let auth = auth();
    let alice = Identity::from_password("alice", "pw").unwrap();
    auth.register("alice", *alice.public_key()).unwrap();

    let nonce = auth.challenge("alice").unwrap().nonce;
    let answer = alice.answer_challenge(&nonce).unwrap();
    auth.verify("alice", &answer).unwrap();

    assert!(matches!(
        auth.verify("alice", &answer),
        Err(Error::ChallengeMissing)
    ));
}

#[test]
fn shared_stores_are_injected() {
    let directory = Arc::new(MemoryUserDirectory::new());
    let challenges = Arc::new(MemoryChallengeStore::new());
    let auth = AuthService::with_stores(
        AuthConfig::default(),
        directory.clone(),
        challenges.clone(),
        Arc::new(OpaqueTokenIssuer::default()),
    )
    .unwrap();

    let alice = Identity::from_password("alice", "pw").unwrap();
    auth.register("alice", *alice.public_key()).unwrap();
    auth.challenge("alice").unwrap();

    assert_eq!(directory.len(), 1);
    assert_eq!(challenges.len(), 1);
}

#[test]
fn key_derivation_properties() {
    for password in ["", "a", "correct horse battery staple", "пароль", "🔑🔑🔑"] {
        let first = derive_private_key(password).unwrap();
        let second = derive_private_key(password).unwrap();
        assert_eq!(first.to_hex(), second.to_hex());
        assert_eq!(first.to_hex().len(), 64);
        assert_eq!(first.public_key(), KeyPair::from_password(password).unwrap().public_key().clone());
    }
}

#[test]
fn signatures_and_agreement_hold_for_random_pairs() {
    for i in 0..8 {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let hash = hash_str(&format!("message {}", i));

        let signature = sign(a.private_key(), &hash).unwrap();
        assert!(verify(a.public_key(), &hash, &signature));
        assert!(!verify(b.public_key(), &hash, &signature));

        assert_eq!(
            shared_secret(a.private_key(), b.public_key()),
            shared_secret(b.private_key(), a.public_key())
        );
    }
}

#[test]
fn compose_process_round_trip_both_suites() {
    let alice = KeyPair::from_password("alice").unwrap();
    let bob = KeyPair::from_password("bob").unwrap();
    let texts = ["", "hi", "a longer message that wraps the thirty-two byte key twice over", "emoji 🎉 and ünïcödé"];

    for suite in [CipherSuite::XorKeystream, CipherSuite::Aes256Gcm] {
        let protocol = MessageProtocol::new(suite);
        for text in texts {
            let context = MessageContext::now("alice", "bob");
            let message = protocol
                .compose(alice.private_key(), bob.public_key(), text, &context)
                .unwrap();
            let result = protocol.process(&message, alice.public_key(), bob.private_key());
            assert_eq!(result.status, MessageStatus::Verified, "{} / {:?}", suite, text);
            assert_eq!(result.text, text);
        }
    }
}

#[test]
fn single_byte_tamper_is_never_verified() {
    let alice = KeyPair::generate();
    let bob = KeyPair::generate();

    for suite in [CipherSuite::XorKeystream, CipherSuite::Aes256Gcm] {
        let protocol = MessageProtocol::new(suite);
        let message = protocol
            .compose(
                alice.private_key(),
                bob.public_key(),
                "pay carol 10 coins",
                &MessageContext::now("alice", "bob"),
            )
            .unwrap();
        let bytes = hex::decode(&message.encrypted_message).unwrap();

        for index in 0..bytes.len() {
            for mask in [0x01u8, 0x80, 0xff] {
                let mut tampered = bytes.clone();
                tampered[index] ^= mask;
                let mut forged = message.clone();
                forged.encrypted_message = hex::encode(&tampered);

                let result = protocol.process(&forged, alice.public_key(), bob.private_key());
                assert_ne!(result.status, MessageStatus::Verified);
            }
        }
    }
}

#[test]
fn process_with_mismatched_suites_never_panics() {
    let alice = KeyPair::generate();
    let bob = KeyPair::generate();
    let message = MessageProtocol::new(CipherSuite::XorKeystream)
        .compose(
            alice.private_key(),
            bob.public_key(),
            "hello",
            &MessageContext::now("alice", "bob"),
        )
        .unwrap();

    let result = MessageProtocol::new(CipherSuite::Aes256Gcm).process(
        &message,
        alice.public_key(),
        bob.private_key(),
    );
    assert_eq!(result.status, MessageStatus::Corrupted);
}

#[test]
fn trust_rotation() {
    let store = TrustStore::in_memory();
    let key_a = *KeyPair::generate().public_key();
    let key_b = *KeyPair::generate().public_key();

    assert_eq!(
        store.save("bob", &key_a, &fingerprint(&key_a)).unwrap(),
        KeyObservation::FirstSeen
    );
    assert!(store
        .save("bob", &key_b, &fingerprint(&key_b))
        .unwrap()
        .is_change());
    assert_eq!(
        store.get("bob").unwrap().unwrap().previous_public_key,
        Some(key_a)
    );

    store.trust("bob", &key_b).unwrap();
    let record = store.get("bob").unwrap().unwrap();
    assert_eq!(record.previous_public_key, None);
    assert!(!record.key_changed);
}

#[test]
fn async_client_flow_with_file_backed_trust() {
    tokio_test::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let server = Arc::new(LocalKeyServer::new(auth()));

        let alice = ChatClient::new(
            Arc::clone(&server),
            Identity::from_password("alice", "alice-pw").unwrap(),
            TrustStore::new(Arc::new(
                FileTrustRepository::open(dir.path().join("alice-trust.json")).unwrap(),
            )),
            MessageProtocol::default(),
        );
        let bob = ChatClient::new(
            Arc::clone(&server),
            Identity::from_password("bob", "bob-pw").unwrap(),
            TrustStore::in_memory(),
            MessageProtocol::default(),
        );

        alice.register().await.unwrap();
        bob.register().await.unwrap();
        alice.login().await.unwrap();
        bob.login().await.unwrap();

        let ack = alice.send("bob", "first").await.unwrap();
        bob.sync().await.unwrap();
        let second = alice.send("bob", "second").await.unwrap();
        assert_ne!(ack.id, second.id);

        let received = bob.sync().await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].message.text, "second");
        assert_eq!(received[0].sender_key, Some(KeyObservation::Unchanged));
        assert!(received[0].is_trusted());

        let reopened = FileTrustRepository::open(dir.path().join("alice-trust.json")).unwrap();
        let record = cipherline_core::trust::TrustRepository::get(&reopened, "bob")
            .unwrap()
            .unwrap();
        assert_eq!(&record.public_key, bob.identity().public_key());

        assert_eq!(
            server.public_key("alice").await.unwrap(),
            alice.identity().public_identity()
        );
    });
}

#[test]
fn default_process_entry_points_match_protocol() {
    let alice = KeyPair::generate();
    let bob = KeyPair::generate();
    let message = messaging::compose(
        alice.private_key(),
        bob.public_key(),
        "free functions",
        &MessageContext::new("alice", "bob", "2025-06-01T08:30:00.000Z"),
    )
    .unwrap();
    assert!(message.validate().is_ok());
    assert!(messaging::process(&message, alice.public_key(), bob.private_key()).is_verified());
}
