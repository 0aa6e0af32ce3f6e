//! # Auth Service
//!
//! Issues, validates and revokes bearer tokens.
//!
//! - `security`: [`TokenIssuer`] and [`TokenValidator`]
//! - `directory`: account lookup ([`IdentityDirectory`]) with in-memory and PostgreSQL adapters
//! - `handlers`: login / refresh / logout endpoints
//! - `services`: background retention purge
//! - `config`: environment-driven [`config::Settings`]

pub mod config;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod security;
pub mod services;

pub use directory::{Account, IdentityDirectory};
pub use error::{IdentityError, Result};
pub use security::{TokenIssuer, TokenLifetimes, TokenPair, TokenValidator};

use crypto_core::jwt::TokenCodec;
use std::sync::Arc;
use std::time::Duration;
use token_revocation::RevocationStore;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub store: Arc<dyn RevocationStore>,
    pub directory: Arc<dyn IdentityDirectory>,
    pub validator: Arc<TokenValidator>,
    pub issuer: Arc<TokenIssuer>,
}

impl AppState {
    /// Wire validator and issuer over one codec, store and directory
    pub fn new(
        codec: TokenCodec,
        store: Arc<dyn RevocationStore>,
        directory: Arc<dyn IdentityDirectory>,
        lifetimes: TokenLifetimes,
        lookup_timeout: Duration,
    ) -> Self {
        let codec = Arc::new(codec);
        let validator = Arc::new(TokenValidator::new(
            codec.clone(),
            store.clone(),
            directory.clone(),
            lookup_timeout,
        ));
        let issuer = Arc::new(TokenIssuer::new(
            codec.clone(),
            store.clone(),
            validator.clone(),
            lifetimes,
        ));

        Self {
            codec,
            store,
            directory,
            validator,
            issuer,
        }
    }
}
