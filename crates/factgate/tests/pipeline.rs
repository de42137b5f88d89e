//! End-to-end tests of key issuance, signing and authorization.

use std::sync::Arc;

use serde_json::json;

use factgate::core::{compute_hash, verify_envelope, verify_signature};
use factgate::store::{FactStore, SqliteKeyTable};
use factgate::{
    AuthorizationRules, FactEnvelope, GateConfig, GateError, Identity, Keystore,
    UnsignedFactPolicy, DEVICE_FACT_TYPE,
};
use factgate_testkit::{empty_fact, fact, fact_with, identity_of, tampered_fact, user, TestFixture};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Key issuance
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_use_issues_one_key() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let table = Arc::new(SqliteKeyTable::open(dir.path().join("keys.db"))?);
    let keystore = Keystore::new(table.clone());
    let identity = Identity::new("google", "42");

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let keystore = keystore.clone();
            let identity = identity.clone();
            tokio::spawn(async move { keystore.get_or_create_public_key(&identity).await })
        })
        .collect();

    let mut keys = Vec::new();
    for task in tasks {
        keys.push(task.await??);
    }

    assert!(keys.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(table.row_count(&identity).await?, 1);
    Ok(())
}

#[tokio::test]
async fn device_key_is_stable_and_device_fact_is_canonical() -> anyhow::Result<()> {
    let keystore = Keystore::new(Arc::new(SqliteKeyTable::open_memory()?));
    let device = Identity::new("local", "device-1");

    let first = keystore.get_or_create_public_key(&device).await?;
    let second = keystore.get_or_create_public_key(&device).await?;
    assert_eq!(first, second);

    let device_fact = keystore.get_device_fact(&device).await?;
    assert_eq!(device_fact.fact_type, DEVICE_FACT_TYPE);
    assert_eq!(device_fact.fields["publicKey"], json!(first));
    assert_eq!(
        device_fact.hash,
        compute_hash(&device_fact.fields, &device_fact.predecessors)
    );

    let signatures = keystore.sign(Some(&device), &device_fact).await?.signatures();
    assert_eq!(signatures.len(), 1);
    assert_eq!(signatures[0].public_key, first);
    verify_signature(&device_fact, &signatures[0])?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Signing
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn signing_without_a_key_fails() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let gate = fixture.open_gate()?;
    let stranger = Identity::new("google", "nobody");

    let result = gate
        .keystore()
        .sign(Some(&stranger), &empty_fact("Note"))
        .await;
    assert!(matches!(result, Err(GateError::KeystoreNotFound(_))));

    let result = gate
        .pipeline()
        .save(Some(&stranger), vec![empty_fact("Note")])
        .await;
    assert!(matches!(result, Err(GateError::KeystoreNotFound(_))));
    assert!(fixture.store.is_empty());
    Ok(())
}

#[tokio::test]
async fn anonymous_save_persists_unsigned() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let gate = fixture.open_gate()?;
    let note = fact("Note", json!({ "text": "hello" }));

    let saved = gate.pipeline().save(None, vec![note.clone()]).await?;
    assert_eq!(saved, vec![FactEnvelope::unsigned(note.clone())]);
    assert!(fixture.key_table.is_empty());
    assert_eq!(
        fixture.store.envelope(&note.reference())?,
        Some(FactEnvelope::unsigned(note))
    );
    Ok(())
}

#[tokio::test]
async fn saved_signatures_verify() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let gate = fixture.open_gate()?;
    let ada = user("ada");
    let session = gate.with_session(ada.clone());
    let login = session.login().await?;

    let blog = fact("Blog", json!({ "name": "notes" }));
    let post = fact_with("Blog.Post", json!({ "title": "hello" }), &[("blog", &blog)]);
    let saved = session
        .save(vec![
            FactEnvelope::unsigned(blog.clone()),
            FactEnvelope::unsigned(post.clone()),
        ])
        .await?;

    assert_eq!(saved.len(), 2);
    for envelope in &saved {
        assert_eq!(verify_envelope(envelope)?, 1);
        assert_eq!(
            envelope.signatures[0].public_key,
            login.user_fact.fields["publicKey"]
        );
    }

    // The user fact is signed by the user.
    let stored = fixture
        .store
        .envelope(&login.user_fact.reference())?
        .expect("user fact stored at login");
    assert_eq!(verify_envelope(&stored)?, 1);
    assert_eq!(
        gate.keystore().find_user_fact(&identity_of(&ada)).await?,
        Some(login.user_fact)
    );
    Ok(())
}

#[tokio::test]
async fn hash_mismatch_is_persisted_unsigned() -> anyhow::Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let gate = fixture.open_gate()?;
    let session = gate.with_session(user("ada"));
    session.login().await?;

    let good = fact("Note", json!({ "text": "fine" }));
    let bad = tampered_fact("Note", json!({ "text": "forged" }));
    let saved = session
        .save(vec![
            FactEnvelope::unsigned(bad.clone()),
            FactEnvelope::unsigned(good.clone()),
        ])
        .await?;

    assert_eq!(saved.len(), 2);
    let stored_bad = fixture.store.envelope(&bad.reference())?.expect("persisted");
    assert!(!stored_bad.is_signed());
    let stored_good = fixture.store.envelope(&good.reference())?.expect("persisted");
    assert!(stored_good.is_signed());
    Ok(())
}

#[tokio::test]
async fn hash_mismatch_is_dropped_under_reject_policy() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let gate = fixture
        .builder()
        .config(GateConfig {
            unsigned_fact_policy: UnsignedFactPolicy::Reject,
            ..GateConfig::default()
        })
        .build()?;
    let session = gate.with_session(user("ada"));
    session.login().await?;

    let bad = tampered_fact("Note", json!({ "text": "forged" }));
    let saved = session.save(vec![FactEnvelope::unsigned(bad.clone())]).await?;

    assert!(saved.is_empty());
    assert_eq!(fixture.store.envelope(&bad.reference())?, None);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn policy_keeps_public_and_drops_secret() -> anyhow::Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let gate = fixture.gate_with_rules(AuthorizationRules::new().any("Public").no("Secret"))?;
    let session = gate.with_session(user("ada"));
    let login = session.login().await?;

    let public = fact("Public", json!({ "text": "hi" }));
    let secret = fact("Secret", json!({ "text": "psst" }));
    let saved = session
        .save(vec![
            FactEnvelope::unsigned(secret.clone()),
            FactEnvelope::unsigned(public.clone()),
        ])
        .await?;

    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].fact, public);
    assert_eq!(
        saved[0].signatures[0].public_key,
        login.user_fact.fields["publicKey"]
    );
    assert_eq!(fixture.store.envelope(&secret.reference())?, None);
    assert!(fixture
        .store
        .which_exist(&[secret.reference()])
        .await?
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn policy_checks_the_acting_user() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let gate = fixture.gate_with_rules(
        AuthorizationRules::new()
            .any("Blog")
            .by_predecessor("Blog.Post", "author"),
    )?;

    let ada = gate.with_session(user("ada"));
    let bob = gate.with_session(user("bob"));
    let ada_fact = ada.login().await?.user_fact;
    bob.login().await?;

    let blog = fact("Blog", json!({ "name": "notes" }));
    let post = fact_with(
        "Blog.Post",
        json!({ "title": "hello" }),
        &[("blog", &blog), ("author", &ada_fact)],
    );
    let envelopes = vec![
        FactEnvelope::unsigned(blog.clone()),
        FactEnvelope::unsigned(post.clone()),
    ];

    let by_bob = bob.save(envelopes.clone()).await?;
    assert_eq!(by_bob.len(), 1);
    assert_eq!(by_bob[0].fact, blog);

    let by_ada = ada.save(envelopes).await?;
    assert_eq!(by_ada.len(), 2);
    assert!(fixture.store.envelope(&post.reference())?.is_some());
    Ok(())
}

#[tokio::test]
async fn forged_copy_cannot_ride_on_an_authorized_hash() -> anyhow::Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let gate = fixture.gate_with_rules(
        AuthorizationRules::new().when("Note", |fact, _| fact.fields["text"] == "ok"),
    )?;
    let session = gate.with_session(user("ada"));
    session.login().await?;

    let genuine = fact("Note", json!({ "text": "ok" }));
    let mut forged = fact("Note", json!({ "text": "evil" }));
    forged.hash = genuine.hash.clone();

    let alone = session.save(vec![FactEnvelope::unsigned(forged.clone())]).await?;
    assert!(alone.is_empty());

    let saved = session
        .save(vec![
            FactEnvelope::unsigned(forged),
            FactEnvelope::unsigned(genuine.clone()),
        ])
        .await?;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].fact, genuine);

    let stored = fixture.store.envelope(&genuine.reference())?.expect("persisted");
    assert_eq!(stored.fact.fields["text"], "ok");
    assert!(stored.is_signed());
    Ok(())
}

#[tokio::test]
async fn policy_save_before_login_is_unknown_identity() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let gate = fixture.gate_with_rules(AuthorizationRules::new().any("Public"))?;
    let session = gate.with_session(user("ada"));

    let result = session
        .save(vec![FactEnvelope::unsigned(empty_fact("Public"))])
        .await;
    assert!(matches!(result, Err(GateError::UnknownIdentity(_))));
    assert!(fixture.key_table.is_empty());
    Ok(())
}

#[tokio::test]
async fn anonymous_callers_reach_the_evaluator() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let gate = fixture.gate_with_rules(
        AuthorizationRules::new()
            .any("Public")
            .when("Guestbook", |_, user_fact| user_fact.is_none()),
    )?;

    let public = empty_fact("Public");
    let guestbook = empty_fact("Guestbook");
    let private = empty_fact("Private");
    let saved = gate
        .pipeline()
        .save(None, vec![public.clone(), guestbook.clone(), private])
        .await?;

    let facts: Vec<_> = saved.into_iter().map(|envelope| envelope.fact).collect();
    assert_eq!(facts, vec![public, guestbook]);
    Ok(())
}
