//! Password reset tokens.

use chrono::{Duration, Utc};

use authgate_auth::{AuthError, RedeemOutcome};
use authgate_database::{SessionBackend, SessionPurpose, SessionRecord};

use crate::common::{NEW_PASSWORD, PASSWORD, TestApp};

#[tokio::test]
async fn test_reset_replaces_password_and_revokes_sessions() {
    let app = TestApp::new();
    let bob = app.create_test_user("bob").await;
    let old = app.manager.login("bob", PASSWORD).await.unwrap();

    let reset = app.manager.password_reset("bob").await.unwrap().unwrap();
    assert!(reset.expires_at <= Utc::now() + Duration::minutes(5));

    app.manager
        .complete_password_reset("bob", &reset.token, NEW_PASSWORD)
        .await
        .unwrap();

    assert_eq!(app.active_sessions(&bob).await, 0);
    assert!(app.manager.login("bob", PASSWORD).await.is_err());
    assert!(app.manager.login("bob", NEW_PASSWORD).await.is_ok());

    let err = app
        .manager
        .refresh(&old.access_token, &old.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::LoginRequired));
}

#[tokio::test]
async fn test_expired_reset_token_is_not_a_hijack() {
    let app = TestApp::new();
    let bob = app.create_test_user("bob").await;
    let session = app.manager.login("bob", PASSWORD).await.unwrap();

    // Issued eleven minutes ago with a five minute lifetime.
    let record = SessionRecord::new(
        "expired-reset-token".to_string(),
        bob.id,
        SessionPurpose::PasswordReset,
        Utc::now() - Duration::minutes(11),
        Duration::minutes(5),
    );
    app.backend.insert(&record).await.unwrap();

    let outcome = app
        .manager
        .sessions()
        .redeem("expired-reset-token", bob.id, SessionPurpose::PasswordReset)
        .await
        .unwrap();
    assert_eq!(outcome, RedeemOutcome::ReLoginRequired);

    // The unrelated refresh session survives.
    assert_eq!(app.active_sessions(&bob).await, 1);
    assert!(app.bearer(&session.access_token).is_ok());
}

#[tokio::test]
async fn test_reset_token_is_single_use() {
    let app = TestApp::new();
    let cleo = app.create_test_user("cleo").await;
    let reset = app.manager.password_reset("cleo").await.unwrap().unwrap();

    app.manager
        .complete_password_reset("cleo", &reset.token, NEW_PASSWORD)
        .await
        .unwrap();

    let err = app
        .manager
        .complete_password_reset("cleo", &reset.token, PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ResetRejected));
    assert!(app.manager.login("cleo", NEW_PASSWORD).await.is_ok());
    assert_eq!(app.active_sessions(&cleo).await, 1);
}

#[tokio::test]
async fn test_reset_unknown_user() {
    let app = TestApp::new();
    assert!(app.manager.password_reset("ghost").await.unwrap().is_none());
    assert!(app.backend.is_empty());

    let err = app
        .manager
        .complete_password_reset("ghost", "whatever", NEW_PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ResetRejected));
}

#[tokio::test]
async fn test_foreign_reset_token_only_revokes_its_holder() {
    let app = TestApp::new();
    let victim = app.create_test_user("victim").await;
    let mallory = app.create_test_user("mallory").await;
    let victim_session = app.manager.login("victim", PASSWORD).await.unwrap();
    app.manager.login("mallory", PASSWORD).await.unwrap();

    let reset = app.manager.password_reset("mallory").await.unwrap().unwrap();
    let err = app
        .manager
        .complete_password_reset("victim", &reset.token, NEW_PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ResetRejected));

    assert_eq!(app.active_sessions(&mallory).await, 0);
    assert_eq!(app.active_sessions(&victim).await, 1);
    app.manager
        .refresh(&victim_session.access_token, &victim_session.refresh_token)
        .await
        .unwrap();
    assert!(app.manager.login("victim", PASSWORD).await.is_ok());
    assert!(app.manager.login("victim", NEW_PASSWORD).await.is_err());
}
