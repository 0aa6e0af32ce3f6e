//! Revocation store contract
//!
//! Any backend is acceptable as long as `revoke` and `is_live` on the same id
//! are linearizable: once `revoke(id)` has returned, every later `is_live(id, _)`
//! observes the revocation.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::TokenRecord;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("token id already exists: {0}")]
    DuplicateId(String),

    /// Rotation source is missing, revoked or expired
    #[error("token is not live: {0}")]
    NotLive(String),

    #[error("invalid token record: {0}")]
    InvalidRecord(String),

    #[error("revocation store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Insert a new record; `DuplicateId` if the id is taken
    async fn put(&self, record: TokenRecord) -> StoreResult<()>;

    /// Insert several records, all or nothing
    async fn put_many(&self, records: Vec<TokenRecord>) -> StoreResult<()>;

    async fn get(&self, id: &str) -> StoreResult<Option<TokenRecord>>;

    /// True iff the record exists, is not revoked, carries exactly
    /// `expected_expiration`, and has not expired by wall clock
    async fn is_live(&self, id: &str, expected_expiration: DateTime<Utc>) -> StoreResult<bool>;

    /// Mark revoked. Revoking twice, or revoking an unknown id, is a no-op.
    async fn revoke(&self, id: &str) -> StoreResult<()>;

    /// Revoke every record of `subject` that exists when the call starts;
    /// returns how many records changed state
    async fn revoke_all_for_subject(&self, subject: &str) -> StoreResult<u64>;

    /// Revoke `old_id` and insert `replacements` as one atomic unit
    ///
    /// Fails with `NotLive` when `old_id` is missing, already revoked or
    /// expired; in that case nothing is written. Of several concurrent calls
    /// with the same `old_id`, at most one succeeds.
    async fn rotate(&self, old_id: &str, replacements: Vec<TokenRecord>) -> StoreResult<()>;

    /// Unrevoked, unexpired records of `subject`, oldest first
    async fn live_for_subject(&self, subject: &str) -> StoreResult<Vec<TokenRecord>>;

    /// Delete records with `expires_at <= now`; returns the number removed
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}
