//! Login, token use, refresh rotation and replay detection.

use chrono::Duration;

use authgate_auth::{AuthError, CredentialError, TokenError};
use authgate_core::error::{AppError, ErrorKind};

use crate::common::{PASSWORD, TestApp};

#[tokio::test]
async fn test_login_then_use_access_token() {
    let app = TestApp::new();
    let alice = app.create_test_user("alice").await;

    let tokens = app.manager.login("alice", PASSWORD).await.unwrap();
    let claims = app.bearer(&tokens.access_token).unwrap();

    assert_eq!(claims.id, alice.id);
    assert_eq!(claims.username, "alice");
    assert!(!claims.is_staff);
    assert!(tokens.refresh_expires_at > tokens.access_expires_at);
    assert_eq!(app.active_sessions(&alice).await, 1);
}

#[tokio::test]
async fn test_expired_access_token_refreshes_once() {
    let app = TestApp::with_access_ttl(Duration::seconds(-30));
    let alice = app.create_test_user("alice").await;

    let first = app.manager.login("alice", PASSWORD).await.unwrap();
    assert!(matches!(
        app.bearer(&first.access_token),
        Err(AuthError::Unauthorized(TokenError::Expired))
    ));

    let second = app
        .manager
        .refresh(&first.access_token, &first.refresh_token)
        .await
        .unwrap();
    assert_ne!(second.refresh_token, first.refresh_token);
    assert_eq!(app.active_sessions(&alice).await, 1);

    // Replaying the consumed refresh token revokes the whole family.
    let err = app
        .manager
        .refresh(&first.access_token, &first.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::LoginRequired));
    assert_eq!(app.active_sessions(&alice).await, 0);

    let err = app
        .manager
        .refresh(&second.access_token, &second.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::LoginRequired));
}

#[tokio::test]
async fn test_empty_digest_requires_password_change() {
    let app = TestApp::new();
    app.manager
        .create_user("carol", None, false, false)
        .await
        .unwrap();

    let err = app.manager.login("carol", PASSWORD).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Credential(CredentialError::PasswordChangeRequired)
    ));
    assert_eq!(err.public_message(), "Invalid credentials");

    let app_err: AppError = err.into();
    assert_eq!(app_err.kind, ErrorKind::Authentication);
}

#[tokio::test]
async fn test_unknown_user_and_wrong_password_look_alike() {
    let app = TestApp::new();
    app.create_test_user("dave").await;

    let unknown = app.manager.login("nobody", PASSWORD).await.unwrap_err();
    let wrong = app.manager.login("dave", "not-the-password").await.unwrap_err();

    assert_eq!(unknown.public_message(), wrong.public_message());
    assert!(!unknown.is_infrastructure());
}

#[tokio::test]
async fn test_refresh_needs_matching_access_token() {
    let app = TestApp::new();
    let erin = app.create_test_user("erin").await;
    let frank = app.create_test_user("frank").await;

    let erin_tokens = app.manager.login("erin", PASSWORD).await.unwrap();
    let frank_tokens = app.manager.login("frank", PASSWORD).await.unwrap();

    let err = app
        .manager
        .refresh(&frank_tokens.access_token, &erin_tokens.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::LoginRequired));
    assert_eq!(app.active_sessions(&erin).await, 0);
    assert_eq!(app.active_sessions(&frank).await, 0);
}

#[tokio::test]
async fn test_logout_all_clears_every_session() {
    let app = TestApp::new();
    let gina = app.create_test_user("gina").await;

    let mut last = None;
    for _ in 0..3 {
        last = Some(app.manager.login("gina", PASSWORD).await.unwrap());
    }
    assert_eq!(app.active_sessions(&gina).await, 3);

    let claims = app.bearer(&last.unwrap().access_token).unwrap();
    assert_eq!(app.manager.logout_all(&claims).await.unwrap(), 3);
    assert_eq!(app.active_sessions(&gina).await, 0);
}

#[tokio::test]
async fn test_deactivated_account_cannot_refresh() {
    let app = TestApp::new();
    let hank = app.create_test_user("hank").await;
    let tokens = app.manager.login("hank", PASSWORD).await.unwrap();

    app.credentials.set_active(hank.id, false).await.unwrap();

    let err = app
        .manager
        .refresh(&tokens.access_token, &tokens.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::LoginRequired));
    assert!(app.manager.login("hank", PASSWORD).await.is_err());

    app.credentials.set_active(hank.id, true).await.unwrap();
    assert!(app.manager.login("hank", PASSWORD).await.is_ok());
}
