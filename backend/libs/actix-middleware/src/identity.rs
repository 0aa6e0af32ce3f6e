//! Authenticated caller carried in request extensions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Who made the request, as established from a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject: String,
    pub authorities: Vec<String>,
    /// `jti` of the access token that authenticated the request
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Identity {
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }
}

/// Coarse failure: the token did not establish an identity
///
/// The precise reason is logged by the authenticator and deliberately not
/// carried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unauthenticated;

impl fmt::Display for Unauthenticated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unauthenticated")
    }
}

impl std::error::Error for Unauthenticated {}

/// Turns a bearer token into an [`Identity`]
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Identity, Unauthenticated>;
}
