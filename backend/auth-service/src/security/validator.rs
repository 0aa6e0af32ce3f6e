use actix_middleware::{Authenticator, Identity, Unauthenticated};
use async_trait::async_trait;
use crypto_core::hash::token_fingerprint;
use crypto_core::jwt::{Claims, TokenCodec, TokenKind};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use token_revocation::RevocationStore;
use tracing::{error, warn};

use crate::directory::{Account, IdentityDirectory};
use crate::error::{IdentityError, Result};

/// Full token check: signature, expiry, revocation state, account existence
pub struct TokenValidator {
    codec: Arc<TokenCodec>,
    store: Arc<dyn RevocationStore>,
    directory: Arc<dyn IdentityDirectory>,
    lookup_timeout: Duration,
}

impl TokenValidator {
    pub fn new(
        codec: Arc<TokenCodec>,
        store: Arc<dyn RevocationStore>,
        directory: Arc<dyn IdentityDirectory>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            codec,
            store,
            directory,
            lookup_timeout,
        }
    }

    /// Validate an access token presented for resource access
    pub async fn validate(&self, token: &str) -> Result<Identity> {
        let (claims, account) = self.validate_kind(token, TokenKind::Access).await?;
        Ok(Identity {
            subject: claims.sub.clone(),
            authorities: account.authorities,
            token_id: claims.jti.clone(),
            expires_at: claims.expires_at(),
        })
    }

    /// Checks shared by access validation and refresh
    pub(crate) async fn validate_kind(
        &self,
        token: &str,
        expected: TokenKind,
    ) -> Result<(Claims, Account)> {
        let claims = self.codec.verify(token)?;
        if claims.token_type != expected {
            return Err(IdentityError::WrongTokenKind);
        }

        let live = self
            .bounded("revocation lookup", self.store.is_live(&claims.jti, claims.expires_at()))
            .await??;
        if !live {
            return Err(IdentityError::TokenRevoked);
        }

        let account = self
            .bounded("directory lookup", self.directory.lookup(&claims.sub))
            .await??;
        match account {
            Some(account) if account.enabled => Ok((claims, account)),
            _ => Err(IdentityError::SubjectNotFound),
        }
    }

    /// Fails closed when `fut` does not finish within the lookup timeout
    async fn bounded<T>(&self, what: &str, fut: impl Future<Output = T>) -> Result<T> {
        tokio::time::timeout(self.lookup_timeout, fut)
            .await
            .map_err(|_| IdentityError::StoreUnavailable(format!("{} timed out", what)))
    }
}

#[async_trait]
impl Authenticator for TokenValidator {
    async fn authenticate(&self, token: &str) -> std::result::Result<Identity, Unauthenticated> {
        self.validate(token).await.map_err(|e| {
            let fingerprint = token_fingerprint(token);
            match &e {
                IdentityError::StoreUnavailable(detail) => error!(
                    token = %fingerprint,
                    detail = %detail,
                    "token validation failed closed"
                ),
                other => warn!(
                    token = %fingerprint,
                    reason = other.kind(),
                    "token validation failed"
                ),
            }
            Unauthenticated
        })
    }
}
