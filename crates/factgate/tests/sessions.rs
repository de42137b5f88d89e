//! Compositions per execution context, including forwarding upstream.

use std::sync::Arc;

use serde_json::json;

use factgate::store::{FactStore, Query};
use factgate::sync::MemoryTransport;
use factgate::{
    AuthorizationRules, ExecutionContext, FactEnvelope, FactGate, GateConfig, GateError,
    RequestUser, DEVICE_FACT_TYPE, USER_FACT_TYPE,
};
use factgate_testkit::{empty_fact, fact, fact_with, identity_of, user, TestFixture};

/// A downstream gate forwarding to an upstream gate that serves `peer`.
fn forwarding(upstream: &FactGate, downstream: &TestFixture, peer: RequestUser) -> anyhow::Result<FactGate> {
    let service = upstream.peer_service(peer);
    let transport = MemoryTransport::serve(Arc::new(service));
    Ok(downstream.builder().upstream(Arc::new(transport)).build()?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Device
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn device_has_no_login() -> anyhow::Result<()> {
    let gate = TestFixture::new().open_gate()?;
    let device = gate.authentication(ExecutionContext::Device)?;

    assert_eq!(device.kind(), "device");
    assert!(matches!(device.login().await, Err(GateError::NotLoggedIn)));
    assert!(matches!(
        device.which_exist(&[]).await,
        Err(GateError::NotImplemented(_))
    ));
    Ok(())
}

#[tokio::test]
async fn device_saves_bypass_policy() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let gate = fixture.gate_with_rules(AuthorizationRules::new().no("Secret"))?;
    let secret = empty_fact("Secret");

    let saved = gate
        .device()
        .save(vec![FactEnvelope::unsigned(secret.clone())])
        .await?;
    assert_eq!(saved, vec![FactEnvelope::unsigned(secret.clone())]);
    assert!(fixture.store.envelope(&secret.reference())?.is_some());
    Ok(())
}

#[tokio::test]
async fn configured_device_identity_is_used() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let config = GateConfig::from_json(r#"{ "deviceIdentity": { "provider": "local", "id": "device-1" } }"#)?;
    let gate = fixture.builder().config(config).build()?;

    let local = gate.device().local().await?;
    let key = gate
        .keystore()
        .find_public_key(&factgate::Identity::new("local", "device-1"))
        .await?;
    assert_eq!(local.fact_type, DEVICE_FACT_TYPE);
    assert_eq!(local.fields["publicKey"], json!(key));

    // Idempotent: the same fact, stored once.
    assert_eq!(gate.device().local().await?, local);
    assert_eq!(fixture.store.len(), 1);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_login_returns_profile() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let gate = fixture.open_gate()?;
    let ada = user("ada");
    let session = gate.authentication(ExecutionContext::User(ada.clone()))?;

    let login = session.login().await?;
    assert_eq!(session.kind(), "session");
    assert_eq!(login.user_fact.fact_type, USER_FACT_TYPE);
    assert_eq!(login.profile.display_name, "User ada");

    // A second login reuses the key.
    assert_eq!(session.login().await?.user_fact, login.user_fact);
    assert_eq!(
        gate.keystore().find_user_fact(&identity_of(&ada)).await?,
        Some(login.user_fact)
    );
    Ok(())
}

#[tokio::test]
async fn session_save_needs_a_stored_user_fact() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let gate = fixture.open_gate()?;
    let ada = user("ada");
    let session = gate.with_session(ada.clone());

    // A key alone does not count as a login.
    gate.keystore().get_or_create_public_key(&identity_of(&ada)).await?;
    let note = fact("Note", json!({ "text": "hi" }));
    let result = session.save(vec![FactEnvelope::unsigned(note.clone())]).await;
    assert!(matches!(result, Err(GateError::UnknownIdentity(_))));
    assert!(fixture.store.is_empty());

    session.login().await?;
    assert_eq!(session.save(vec![FactEnvelope::unsigned(note)]).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn session_local_is_the_device_fact() -> anyhow::Result<()> {
    let gate = TestFixture::new().open_gate()?;
    let session = gate.with_session(user("ada"));

    assert_eq!(session.local().await?, gate.device().local().await?);
    Ok(())
}

#[tokio::test]
async fn session_reads_through_the_feed() -> anyhow::Result<()> {
    let gate = TestFixture::new().open_gate()?;
    let session = gate.with_session(user("ada"));
    session.login().await?;

    let blog = fact("Blog", json!({ "name": "notes" }));
    let post = fact_with("Blog.Post", json!({ "title": "hello" }), &[("blog", &blog)]);
    session
        .save(vec![
            FactEnvelope::unsigned(blog.clone()),
            FactEnvelope::unsigned(post.clone()),
        ])
        .await?;

    let posts = Query::new().successor("Blog.Post", "blog");
    assert_eq!(
        session.query(&blog.reference(), &posts).await?,
        vec![vec![post.reference()]]
    );
    assert_eq!(session.read(&[blog.reference()], &posts).await?, vec![post.clone()]);
    assert_eq!(
        session.load(&[post.reference()]).await?,
        vec![blog, post]
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Remote
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upstream_context_needs_an_upstream() -> anyhow::Result<()> {
    let gate = TestFixture::new().open_gate()?;
    assert!(matches!(
        gate.authentication(ExecutionContext::Upstream),
        Err(GateError::NoUpstream)
    ));
    Ok(())
}

#[tokio::test]
async fn remote_forwards_to_upstream_session() -> anyhow::Result<()> {
    let upstream_fixture = TestFixture::new();
    let upstream = upstream_fixture.gate_with_rules(AuthorizationRules::new().any("Public"))?;
    let ada = user("ada");

    let downstream_fixture = TestFixture::new();
    let downstream = forwarding(&upstream, &downstream_fixture, ada.clone())?;
    let remote = downstream.authentication(ExecutionContext::Upstream)?;
    assert_eq!(remote.kind(), "remote");

    let login = remote.login().await?;
    assert_eq!(
        upstream.keystore().find_user_fact(&identity_of(&ada)).await?,
        Some(login.user_fact.clone())
    );
    // Keys live upstream only.
    assert!(downstream_fixture.key_table.is_empty());

    let public = fact("Public", json!({ "text": "hi" }));
    let saved = remote
        .save(vec![FactEnvelope::unsigned(public.clone())])
        .await?;
    assert_eq!(saved.len(), 1);
    assert_eq!(
        saved[0].signatures[0].public_key,
        login.user_fact.fields["publicKey"]
    );

    let upstream_copy = upstream_fixture.store.envelope(&public.reference())?;
    let local_copy = downstream_fixture.store.envelope(&public.reference())?;
    assert!(upstream_copy.is_some());
    assert_eq!(upstream_copy, local_copy);
    Ok(())
}

#[tokio::test]
async fn remote_rejection_stays_out_of_local_store() -> anyhow::Result<()> {
    let upstream_fixture = TestFixture::new();
    let upstream = upstream_fixture.gate_with_rules(AuthorizationRules::new().any("Public"))?;
    let downstream_fixture = TestFixture::new();
    let downstream = forwarding(&upstream, &downstream_fixture, user("ada"))?;
    let remote = downstream.authentication(ExecutionContext::Upstream)?;

    // Not logged in upstream yet.
    let public = empty_fact("Public");
    let result = remote.save(vec![FactEnvelope::unsigned(public.clone())]).await;
    assert!(matches!(result, Err(GateError::Store(_))));
    assert!(downstream_fixture.store.is_empty());
    assert!(upstream_fixture.store.is_empty());
    Ok(())
}

#[tokio::test]
async fn remote_has_no_local_device() -> anyhow::Result<()> {
    let upstream = TestFixture::new().open_gate()?;
    let downstream = forwarding(&upstream, &TestFixture::new(), user("ada"))?;
    let remote = downstream.authentication(ExecutionContext::Upstream)?;

    assert!(matches!(remote.local().await, Err(GateError::LocalUnavailable)));
    Ok(())
}

#[tokio::test]
async fn remote_saves_are_authorized_upstream() -> anyhow::Result<()> {
    let upstream_fixture = TestFixture::new();
    let upstream = upstream_fixture.gate_with_rules(AuthorizationRules::new().no("Secret"))?;
    let downstream_fixture = TestFixture::new();
    let downstream = forwarding(&upstream, &downstream_fixture, user("ada"))?;
    let remote = downstream.authentication(ExecutionContext::Upstream)?;
    remote.login().await?;

    let secret = empty_fact("Secret");
    let saved = remote.save(vec![FactEnvelope::unsigned(secret.clone())]).await?;
    assert!(saved.is_empty());
    assert_eq!(upstream_fixture.store.envelope(&secret.reference())?, None);
    assert_eq!(downstream_fixture.store.envelope(&secret.reference())?, None);
    Ok(())
}

#[tokio::test]
async fn remote_loads_fall_back_to_upstream() -> anyhow::Result<()> {
    let upstream_fixture = TestFixture::new();
    let upstream = upstream_fixture.open_gate()?;
    let blog = fact("Blog", json!({ "name": "notes" }));
    upstream
        .device()
        .save(vec![FactEnvelope::unsigned(blog.clone())])
        .await?;

    let downstream_fixture = TestFixture::new();
    let downstream = forwarding(&upstream, &downstream_fixture, user("ada"))?;
    let remote = downstream.authentication(ExecutionContext::Upstream)?;

    // Reads need no login.
    assert_eq!(remote.load(&[blog.reference()]).await?, vec![blog.clone()]);
    assert!(downstream_fixture
        .store
        .which_exist(&[blog.reference()])
        .await?
        .is_empty());
    Ok(())
}
