//! Integration tests for bootstrap, login, registration and logout.
//!
//! Every test runs a real client against the in-process mock backend and
//! checks the in-memory session and the persisted record together.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use estate_client::{
    ClientConfig, Credentials, EstateClient, FileStore, LoginError, MemoryNavigator, RegisterError,
    RegistrationProfile,
};
use estate_core::Role;
use estate_integration_tests::{MockBackend, TestContext, USERNAME_TAKEN};

const BOB_SESSION: [(&str, &str); 4] = [
    ("access", "a1"),
    ("refresh", "r1"),
    ("role", "buyer"),
    ("username", "bob"),
];

// =============================================================================
// Bootstrap Tests
// =============================================================================

#[tokio::test]
async fn test_bootstrap_restores_persisted_session() {
    let ctx = TestContext::new(&BOB_SESSION, "/").await;

    let snapshot = ctx.client.session().snapshot().await;
    assert!(snapshot.bootstrapped);
    assert!(snapshot.has_refresh_token);

    let identity = snapshot.identity.unwrap();
    assert_eq!(identity.username.as_str(), "bob");
    assert_eq!(identity.role, Role::Buyer);
}

#[tokio::test]
async fn test_bootstrap_without_record_is_anonymous() {
    let ctx = TestContext::anonymous().await;

    let snapshot = ctx.client.session().snapshot().await;
    assert!(snapshot.bootstrapped);
    assert!(!snapshot.is_authenticated());
    assert!(!snapshot.has_refresh_token);
}

#[tokio::test]
async fn test_bootstrap_ignores_record_with_unknown_role() {
    let ctx = TestContext::new(
        &[("access", "a1"), ("role", "landlord"), ("username", "bob")],
        "/",
    )
    .await;

    assert!(!ctx.client.session().is_authenticated().await);
}

#[tokio::test]
async fn test_session_survives_restart_with_file_store() {
    let backend = MockBackend::start().await.unwrap();
    backend.add_user("carol", "correct-horse", Role::Owner);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let first = EstateClient::new(
        ClientConfig::new(&backend.base_url()).unwrap(),
        Arc::new(FileStore::new(&path)),
        Arc::new(MemoryNavigator::default()),
    )
    .await
    .unwrap();
    let credentials = Credentials::new("carol", "correct-horse").unwrap();
    first.auth().login(&credentials, Role::Owner).await.unwrap();
    drop(first);

    let second = EstateClient::new(
        ClientConfig::new(&backend.base_url()).unwrap(),
        Arc::new(FileStore::new(&path)),
        Arc::new(MemoryNavigator::default()),
    )
    .await
    .unwrap();

    let snapshot = second.session().snapshot().await;
    assert!(snapshot.has_refresh_token);
    let identity = snapshot.identity.unwrap();
    assert_eq!(identity.username.as_str(), "carol");
    assert_eq!(identity.role, Role::Owner);

    let response = second.api().get("properties/").await.unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn test_corrupt_session_file_recovers_through_logout_and_login() {
    let backend = MockBackend::start().await.unwrap();
    backend.add_user("bob", "hunter22", Role::Buyer);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{truncated").unwrap();

    let client = EstateClient::new(
        ClientConfig::new(&backend.base_url()).unwrap(),
        Arc::new(FileStore::new(&path)),
        Arc::new(MemoryNavigator::default()),
    )
    .await
    .unwrap();
    assert!(!client.session().is_authenticated().await);

    client.auth().logout().await;
    assert_ne!(std::fs::read_to_string(&path).unwrap(), "{truncated");

    let credentials = Credentials::new("bob", "hunter22").unwrap();
    client.auth().login(&credentials, Role::Buyer).await.unwrap();
    client.favorites().add(1).unwrap();

    let restarted = EstateClient::new(
        ClientConfig::new(&backend.base_url()).unwrap(),
        Arc::new(FileStore::new(&path)),
        Arc::new(MemoryNavigator::default()),
    )
    .await
    .unwrap();
    let identity = restarted.session().identity().await.unwrap();
    assert_eq!(identity.username.as_str(), "bob");
    assert_eq!(restarted.favorites().ids().unwrap(), ["1"]);
}

// =============================================================================
// Login Tests
// =============================================================================

#[tokio::test]
async fn test_login_establishes_session_and_persists_every_field() {
    let ctx = TestContext::anonymous().await;
    ctx.backend.add_user("bob", "hunter22", Role::Buyer);

    let credentials = Credentials::new("bob", "hunter22").unwrap();
    let identity = ctx.client.auth().login(&credentials, Role::Buyer).await.unwrap();

    assert_eq!(identity.username.as_str(), "bob");
    assert_eq!(identity.role, Role::Buyer);
    assert_eq!(ctx.client.session().identity().await, Some(identity));

    assert!(ctx.stored("access").is_some());
    assert!(ctx.stored("refresh").is_some());
    assert_eq!(ctx.stored("role").as_deref(), Some("buyer"));
    assert_eq!(ctx.stored("username").as_deref(), Some("bob"));

    assert_eq!(ctx.backend.requests_to("accounts/login/").len(), 1);
    assert!(ctx.backend.requests_to("accounts/admin-login/").is_empty());
}

#[tokio::test]
async fn test_rejected_login_leaves_session_and_store_untouched() {
    let ctx = TestContext::new(&BOB_SESSION, "/").await;
    ctx.backend.add_user("bob", "hunter22", Role::Buyer);
    let before = ctx.client.session().snapshot().await;

    let credentials = Credentials::new("bob", "wrong-password").unwrap();
    let err = ctx
        .client
        .auth()
        .login(&credentials, Role::Buyer)
        .await
        .unwrap_err();

    assert!(err.is_rejection());
    assert!(matches!(
        &err,
        LoginError::Rejected { status: 401, message }
            if message == "No active account found with the given credentials"
    ));
    assert_eq!(ctx.client.session().snapshot().await, before);
    assert_eq!(ctx.stored("access").as_deref(), Some("a1"));
    assert_eq!(ctx.stored("refresh").as_deref(), Some("r1"));
    assert_eq!(ctx.stored("role").as_deref(), Some("buyer"));
    assert_eq!(ctx.stored("username").as_deref(), Some("bob"));
}

#[tokio::test]
async fn test_admin_login_uses_admin_endpoint() {
    let ctx = TestContext::anonymous().await;
    ctx.backend.add_user("alice", "s3cret-pass", Role::Admin);

    let credentials = Credentials::new("alice", "s3cret-pass").unwrap();
    let identity = ctx.client.auth().login(&credentials, Role::Admin).await.unwrap();

    assert!(identity.is_admin());
    assert_eq!(ctx.backend.requests_to("accounts/admin-login/").len(), 1);
    assert!(ctx.backend.requests_to("accounts/login/").is_empty());
}

#[tokio::test]
async fn test_admin_login_refused_for_buyer_account() {
    let ctx = TestContext::anonymous().await;
    ctx.backend.add_user("bob", "hunter22", Role::Buyer);

    let credentials = Credentials::new("bob", "hunter22").unwrap();
    let err = ctx
        .client
        .auth()
        .login(&credentials, Role::Admin)
        .await
        .unwrap_err();

    assert!(matches!(err, LoginError::Rejected { status: 403, .. }));
    assert!(!ctx.client.session().is_authenticated().await);
    assert!(ctx.stored("access").is_none());
}

#[tokio::test]
async fn test_login_takes_role_from_response() {
    let ctx = TestContext::anonymous().await;
    ctx.backend.add_user("carol", "correct-horse", Role::Owner);

    let credentials = Credentials::new("carol", "correct-horse").unwrap();
    let identity = ctx.client.auth().login(&credentials, Role::Buyer).await.unwrap();

    assert_eq!(identity.role, Role::Owner);
    assert_eq!(ctx.stored("role").as_deref(), Some("owner"));
}

#[tokio::test]
async fn test_login_replaces_previous_session() {
    let ctx = TestContext::new(&BOB_SESSION, "/").await;
    ctx.backend.add_user("carol", "correct-horse", Role::Owner);

    let credentials = Credentials::new("carol", "correct-horse").unwrap();
    ctx.client.auth().login(&credentials, Role::Owner).await.unwrap();

    let identity = ctx.client.session().identity().await.unwrap();
    assert_eq!(identity.username.as_str(), "carol");
    assert_ne!(ctx.stored("access").as_deref(), Some("a1"));
    assert_ne!(ctx.stored("refresh").as_deref(), Some("r1"));
}

// =============================================================================
// Registration Tests
// =============================================================================

#[tokio::test]
async fn test_register_creates_account_without_logging_in() {
    let ctx = TestContext::anonymous().await;

    let profile = RegistrationProfile::new("dave", "dave@example.com", "long-enough").unwrap();
    ctx.client.auth().register(&profile).await.unwrap();

    assert!(ctx.backend.has_user("dave"));
    assert!(!ctx.client.session().is_authenticated().await);
    assert!(ctx.stored("access").is_none());
}

#[tokio::test]
async fn test_register_surfaces_field_errors() {
    let ctx = TestContext::anonymous().await;
    ctx.backend.add_user("bob", "hunter22", Role::Buyer);

    let profile = RegistrationProfile::new("bob", "bob@example.com", "long-enough").unwrap();
    let err = ctx.client.auth().register(&profile).await.unwrap_err();

    assert!(matches!(err, RegisterError::Rejected { status: 400, .. }));
    assert_eq!(err.field("username"), [USERNAME_TAKEN]);
    assert!(err.field("email").is_empty());
    assert!(err.to_string().contains(USERNAME_TAKEN));
}

#[tokio::test]
async fn test_register_reports_password_rules() {
    let ctx = TestContext::anonymous().await;

    let profile = RegistrationProfile::new("erin", "erin@example.com", "short").unwrap();
    let err = ctx.client.auth().register(&profile).await.unwrap_err();

    assert_eq!(err.field("password").len(), 1);
    assert!(!ctx.backend.has_user("erin"));
}

// =============================================================================
// Logout Tests
// =============================================================================

#[tokio::test]
async fn test_logout_clears_session_and_tokens_but_keeps_favourites() {
    let ctx = TestContext::new(&BOB_SESSION, "/").await;
    ctx.client.favorites().add(7).unwrap();

    ctx.client.auth().logout().await;

    let snapshot = ctx.client.session().snapshot().await;
    assert!(!snapshot.is_authenticated());
    assert!(!snapshot.has_refresh_token);
    assert!(snapshot.bootstrapped);
    for key in ["access", "refresh", "role", "username"] {
        assert!(ctx.stored(key).is_none(), "{key} should be cleared");
    }
    assert_eq!(ctx.client.favorites().ids().unwrap(), ["7"]);
}

#[tokio::test]
async fn test_logout_when_anonymous_is_harmless() {
    let ctx = TestContext::anonymous().await;

    ctx.client.auth().logout().await;
    ctx.client.auth().logout().await;

    assert!(!ctx.client.session().is_authenticated().await);
    assert!(ctx.navigator.redirects().is_empty());
}
