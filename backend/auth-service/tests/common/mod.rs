//! Test fixtures shared by the auth-service integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use auth_service::{directory::InMemoryDirectory, Account, AppState, TokenLifetimes};
use chrono::{DateTime, Utc};
use crypto_core::jwt::TokenCodec;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use token_revocation::{
    InMemoryRevocationStore, RevocationStore, StoreError, StoreResult, TokenRecord,
};

pub const TEST_SECRET: &[u8] = b"auth-service-test-secret-0123456789abcdef";
pub const TEST_SUBJECT: &str = "alice";
pub const TEST_PASSWORD: &str = "wonderland";

/// In-memory store that counts liveness checks and can be made slow or broken
#[derive(Default)]
pub struct InstrumentedStore {
    pub inner: InMemoryRevocationStore,
    pub is_live_calls: AtomicUsize,
    pub stall: Option<Duration>,
    pub fail_writes: AtomicBool,
}

impl InstrumentedStore {
    pub fn stalling(stall: Duration) -> Self {
        Self {
            stall: Some(stall),
            ..Self::default()
        }
    }

    pub fn lookups(&self) -> usize {
        self.is_live_calls.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RevocationStore for InstrumentedStore {
    async fn put(&self, record: TokenRecord) -> StoreResult<()> {
        self.check_writable()?;
        self.inner.put(record).await
    }

    async fn put_many(&self, records: Vec<TokenRecord>) -> StoreResult<()> {
        self.check_writable()?;
        self.inner.put_many(records).await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<TokenRecord>> {
        self.inner.get(id).await
    }

    async fn is_live(&self, id: &str, expected_expiration: DateTime<Utc>) -> StoreResult<bool> {
        self.is_live_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }
        self.inner.is_live(id, expected_expiration).await
    }

    async fn revoke(&self, id: &str) -> StoreResult<()> {
        self.inner.revoke(id).await
    }

    async fn revoke_all_for_subject(&self, subject: &str) -> StoreResult<u64> {
        self.inner.revoke_all_for_subject(subject).await
    }

    async fn rotate(&self, old_id: &str, replacements: Vec<TokenRecord>) -> StoreResult<()> {
        self.check_writable()?;
        self.inner.rotate(old_id, replacements).await
    }

    async fn live_for_subject(&self, subject: &str) -> StoreResult<Vec<TokenRecord>> {
        self.inner.live_for_subject(subject).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        self.inner.purge_expired(now).await
    }
}

pub struct Harness {
    pub state: AppState,
    pub store: Arc<InstrumentedStore>,
    pub directory: Arc<InMemoryDirectory>,
}

pub fn codec() -> TokenCodec {
    TokenCodec::hs256(TEST_SECRET).unwrap()
}

pub fn user_authorities() -> Vec<String> {
    vec!["ROLE_USER".to_string()]
}

pub async fn harness_with(store: InstrumentedStore, lookup_timeout: Duration) -> Harness {
    let store = Arc::new(store);
    let directory = Arc::new(InMemoryDirectory::new());
    directory
        .add_account(Account {
            subject: TEST_SUBJECT.to_string(),
            authorities: user_authorities(),
            enabled: true,
        })
        .await;

    let state = AppState::new(
        codec(),
        store.clone(),
        directory.clone(),
        TokenLifetimes::default(),
        lookup_timeout,
    );

    Harness {
        state,
        store,
        directory,
    }
}

pub async fn harness() -> Harness {
    harness_with(InstrumentedStore::default(), Duration::from_secs(2)).await
}
