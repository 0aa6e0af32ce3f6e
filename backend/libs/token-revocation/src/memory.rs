use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::model::TokenRecord;
use crate::store::{RevocationStore, StoreError, StoreResult};

/// Revocation store held in process memory
///
/// All state sits behind one `RwLock`, so every operation (including the
/// multi-record ones) is a single critical section. Suitable for tests and
/// single-instance deployments; state is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    records: RwLock<HashMap<String, TokenRecord>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn check_fresh(
    records: &HashMap<String, TokenRecord>,
    batch: &[TokenRecord],
) -> StoreResult<()> {
    for (i, record) in batch.iter().enumerate() {
        if records.contains_key(&record.id) || batch[..i].iter().any(|r| r.id == record.id) {
            return Err(StoreError::DuplicateId(record.id.clone()));
        }
    }
    Ok(())
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn put(&self, record: TokenRecord) -> StoreResult<()> {
        self.put_many(vec![record]).await
    }

    async fn put_many(&self, records: Vec<TokenRecord>) -> StoreResult<()> {
        let mut guard = self.records.write().await;
        check_fresh(&guard, &records)?;
        for record in records {
            guard.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<TokenRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn is_live(&self, id: &str, expected_expiration: DateTime<Utc>) -> StoreResult<bool> {
        let guard = self.records.read().await;
        Ok(guard
            .get(id)
            .map(|r| r.is_live_at(expected_expiration, Utc::now()))
            .unwrap_or(false))
    }

    async fn revoke(&self, id: &str) -> StoreResult<()> {
        let mut guard = self.records.write().await;
        match guard.get_mut(id) {
            Some(record) => record.revoked = true,
            None => debug!(token_id = %id, "revoke on unknown token id ignored"),
        }
        Ok(())
    }

    async fn revoke_all_for_subject(&self, subject: &str) -> StoreResult<u64> {
        let mut guard = self.records.write().await;
        let mut changed = 0;
        for record in guard.values_mut() {
            if record.subject == subject && !record.revoked {
                record.revoked = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn rotate(&self, old_id: &str, replacements: Vec<TokenRecord>) -> StoreResult<()> {
        let mut guard = self.records.write().await;
        let now = Utc::now();

        let live = guard
            .get(old_id)
            .map(|r| !r.revoked && !r.is_expired_at(now))
            .unwrap_or(false);
        if !live {
            return Err(StoreError::NotLive(old_id.to_string()));
        }
        check_fresh(&guard, &replacements)?;

        if let Some(old) = guard.get_mut(old_id) {
            old.revoked = true;
        }
        for record in replacements {
            guard.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn live_for_subject(&self, subject: &str) -> StoreResult<Vec<TokenRecord>> {
        let now = Utc::now();
        let guard = self.records.read().await;
        let mut live: Vec<TokenRecord> = guard
            .values()
            .filter(|r| r.subject == subject && !r.revoked && !r.is_expired_at(now))
            .cloned()
            .collect();
        live.sort_by(|a, b| a.issued_at.cmp(&b.issued_at).then_with(|| a.id.cmp(&b.id)));
        Ok(live)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut guard = self.records.write().await;
        let before = guard.len();
        guard.retain(|_, r| !r.is_expired_at(now));
        Ok((before - guard.len()) as u64)
    }
}
