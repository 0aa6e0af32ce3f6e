use chrono::{DateTime, Utc};
use crypto_core::jwt::{truncate_to_seconds, TokenKind};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Issued-token metadata; the signed token itself is never stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: String,
    pub subject: String,
    pub kind: TokenKind,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl TokenRecord {
    /// New unrevoked record; timestamps are truncated to whole seconds
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let issued_at = truncate_to_seconds(issued_at);
        let expires_at = truncate_to_seconds(expires_at);
        if expires_at <= issued_at {
            return Err(StoreError::InvalidRecord(
                "expires_at must be after issued_at".to_string(),
            ));
        }

        let id = id.into();
        if id.trim().is_empty() {
            return Err(StoreError::InvalidRecord("id must not be empty".to_string()));
        }

        Ok(Self {
            id,
            subject: subject.into(),
            kind,
            issued_at,
            expires_at,
            revoked: false,
        })
    }

    /// Live check against an expected expiration and a reference clock
    pub fn is_live_at(&self, expected_expiration: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at == expected_expiration && now < self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
