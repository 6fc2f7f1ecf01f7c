//! Concurrent redemption of the same token.

use std::sync::Arc;

use authgate_auth::RedeemOutcome;
use authgate_database::SessionPurpose;

use crate::common::{PASSWORD, TestApp};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_redeem_has_one_winner() {
    let app = TestApp::new();
    let store = app.manager.sessions().clone();
    let issued = store.create(7, SessionPurpose::Refresh).await.unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let store = Arc::clone(&store);
            let token = issued.token.clone();
            tokio::spawn(async move { store.redeem(&token, 7, SessionPurpose::Refresh).await })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    let winners = outcomes
        .iter()
        .filter(|o| **o == RedeemOutcome::Authorized)
        .count();
    assert_eq!(winners, 1);
    assert!(outcomes.contains(&RedeemOutcome::HijackSuspected { owner: 7 }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_with_same_pair() {
    let app = Arc::new(TestApp::new());
    app.create_test_user("hank").await;
    let tokens = app.manager.login("hank", PASSWORD).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = Arc::clone(&app);
            let access = tokens.access_token.clone();
            let refresh = tokens.refresh_token.clone();
            tokio::spawn(async move { app.manager.refresh(&access, &refresh).await.is_ok() })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap() {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 1);
}

#[tokio::test]
async fn test_invalidate_all_leaves_nothing_redeemable() {
    let app = TestApp::new();
    let ivy = app.create_test_user("ivy").await;

    let mut pairs = Vec::new();
    for _ in 0..4 {
        pairs.push(app.manager.login("ivy", PASSWORD).await.unwrap());
    }
    app.manager.password_reset("ivy").await.unwrap().unwrap();

    assert_eq!(app.manager.sessions().invalidate_all(ivy.id).await.unwrap(), 5);
    assert_eq!(app.active_sessions(&ivy).await, 0);

    for pair in &pairs {
        assert_eq!(
            app.manager
                .sessions()
                .redeem(&pair.refresh_token, ivy.id, SessionPurpose::Refresh)
                .await
                .unwrap(),
            RedeemOutcome::ReLoginRequired
        );
    }
}
