//! Concurrency behaviour of the in-memory store

use chrono::{Duration, Utc};
use crypto_core::jwt::TokenKind;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use token_revocation::{InMemoryRevocationStore, RevocationStore, StoreError, TokenRecord};
use uuid::Uuid;

fn record(subject: &str, kind: TokenKind) -> TokenRecord {
    let now = Utc::now();
    TokenRecord::new(
        Uuid::new_v4().to_string(),
        subject,
        kind,
        now,
        now + Duration::hours(1),
    )
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rotation_has_single_winner() {
    let store = Arc::new(InMemoryRevocationStore::new());
    let original = record("alice", TokenKind::Refresh);
    let original_id = original.id.clone();
    store.put(original).await.unwrap();

    let attempts = (0..16).map(|_| {
        let store = store.clone();
        let old_id = original_id.clone();
        tokio::spawn(async move {
            store
                .rotate(
                    &old_id,
                    vec![
                        record("alice", TokenKind::Access),
                        record("alice", TokenKind::Refresh),
                    ],
                )
                .await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, StoreError::NotLive(_))));

    // one access + one refresh from the single winner
    assert_eq!(store.live_for_subject("alice").await.unwrap().len(), 2);
    assert_eq!(store.len().await, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn revoke_is_visible_to_every_later_check() {
    let store = Arc::new(InMemoryRevocationStore::new());
    let target = record("alice", TokenKind::Access);
    let (id, exp) = (target.id.clone(), target.expires_at);
    store.put(target).await.unwrap();

    store.revoke(&id).await.unwrap();

    let checks = (0..32).map(|_| {
        let store = store.clone();
        let id = id.clone();
        tokio::spawn(async move { store.is_live(&id, exp).await.unwrap() })
    });
    for live in join_all(checks).await {
        assert!(!live.unwrap());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_checks_never_see_live_after_revoke() {
    let store = Arc::new(InMemoryRevocationStore::new());
    let target = record(&Uuid::new_v4().to_string(), TokenKind::Access);
    let (id, exp) = (target.id.clone(), target.expires_at);
    store.put(target).await.unwrap();

    let revoked = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..16)
        .map(|_| {
            let (store, id, revoked) = (store.clone(), id.clone(), revoked.clone());
            tokio::spawn(async move {
                for _ in 0..200 {
                    // sampled before the call starts, so a true flag means the
                    // revoke finished before this check was issued
                    let after_revoke = revoked.load(Ordering::SeqCst);
                    let live = store.is_live(&id, exp).await.unwrap();
                    assert!(!(after_revoke && live), "live read after revoke completed");
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    let revoker = {
        let (store, id, revoked) = (store.clone(), id.clone(), revoked.clone());
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            store.revoke(&id).await.unwrap();
            revoked.store(true, Ordering::SeqCst);
        })
    };

    revoker.await.unwrap();
    for reader in join_all(readers).await {
        reader.unwrap();
    }
    assert!(!store.is_live(&id, exp).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn revoke_all_leaves_later_tokens_alone() {
    let store = Arc::new(InMemoryRevocationStore::new());
    store
        .put_many(vec![
            record("alice", TokenKind::Access),
            record("alice", TokenKind::Refresh),
        ])
        .await
        .unwrap();

    assert_eq!(store.revoke_all_for_subject("alice").await.unwrap(), 2);

    let fresh = record("alice", TokenKind::Access);
    let fresh_id = fresh.id.clone();
    store.put(fresh).await.unwrap();

    let live = store.live_for_subject("alice").await.unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, fresh_id);
}

#[tokio::test]
async fn concurrent_puts_with_same_id_accept_one() {
    let store = Arc::new(InMemoryRevocationStore::new());
    let shared = record("alice", TokenKind::Access);

    let puts = (0..8).map(|_| {
        let store = store.clone();
        let candidate = shared.clone();
        tokio::spawn(async move { store.put(candidate).await })
    });

    let accepted = join_all(puts)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(()))))
        .count();
    assert_eq!(accepted, 1);
}
