use chrono::{DateTime, Duration, Utc};
use crypto_core::jwt::{truncate_to_seconds, TokenCodec, TokenKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use token_revocation::{RevocationStore, TokenRecord};
use tracing::info;
use uuid::Uuid;

use super::TokenValidator;
use crate::error::{IdentityError, Result};

/// How long freshly issued tokens stay valid
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::minutes(15),
            refresh: Duration::days(7),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Mints token pairs and records them before handing them out
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    store: Arc<dyn RevocationStore>,
    validator: Arc<TokenValidator>,
    lifetimes: TokenLifetimes,
}

impl TokenIssuer {
    pub fn new(
        codec: Arc<TokenCodec>,
        store: Arc<dyn RevocationStore>,
        validator: Arc<TokenValidator>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            codec,
            store,
            validator,
            lifetimes,
        }
    }

    /// Issue an access/refresh pair for `subject`
    ///
    /// Both records are written in one `put_many`; if that fails no token
    /// leaves this function.
    pub async fn issue(&self, subject: &str, authorities: &[String]) -> Result<TokenPair> {
        let (pair, records) = self.mint(subject, authorities, Utc::now())?;
        self.store.put_many(records).await?;

        info!(subject = %subject, "issued token pair");
        Ok(pair)
    }

    /// Exchange a live refresh token for a new pair, consuming the old one
    ///
    /// Authorities are re-read from the directory. Of concurrent refreshes
    /// with the same token at most one succeeds; the rest see `TokenRevoked`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let (claims, account) = self
            .validator
            .validate_kind(refresh_token, TokenKind::Refresh)
            .await?;

        let (pair, records) = self.mint(&claims.sub, &account.authorities, Utc::now())?;
        self.store.rotate(&claims.jti, records).await?;

        info!(subject = %claims.sub, rotated = %claims.jti, "refreshed token pair");
        Ok(pair)
    }

    fn mint(
        &self,
        subject: &str,
        authorities: &[String],
        now: DateTime<Utc>,
    ) -> Result<(TokenPair, Vec<TokenRecord>)> {
        let issued_at = truncate_to_seconds(now);
        let access_exp = expiry(issued_at, self.lifetimes.access)?;
        let refresh_exp = expiry(issued_at, self.lifetimes.refresh)?;
        let access_id = Uuid::new_v4().to_string();
        let refresh_id = Uuid::new_v4().to_string();

        let access_token = self.codec.encode(
            subject,
            &access_id,
            issued_at,
            access_exp,
            TokenKind::Access,
            authorities,
        )?;
        let refresh_token = self.codec.encode(
            subject,
            &refresh_id,
            issued_at,
            refresh_exp,
            TokenKind::Refresh,
            authorities,
        )?;

        let records = vec![
            TokenRecord::new(access_id, subject, TokenKind::Access, issued_at, access_exp)?,
            TokenRecord::new(refresh_id, subject, TokenKind::Refresh, issued_at, refresh_exp)?,
        ];

        Ok((
            TokenPair {
                access_token,
                refresh_token,
                token_type: "Bearer".to_string(),
                expires_in: self.lifetimes.access.num_seconds(),
            },
            records,
        ))
    }
}

fn expiry(issued_at: DateTime<Utc>, lifetime: Duration) -> Result<DateTime<Utc>> {
    issued_at.checked_add_signed(lifetime).ok_or_else(|| {
        IdentityError::Internal(format!(
            "token lifetime of {}s overflows the clock",
            lifetime.num_seconds()
        ))
    })
}
