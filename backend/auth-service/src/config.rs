//! Configuration management for Auth Service
//!
//! Loads settings from environment variables, with a `.env` file picked up in
//! debug builds.
//!
//! # Example
//!
//! ```no_run
//! use auth_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("listening on {}:{}", settings.server.host, settings.server.port);
//!     Ok(())
//! }
//! ```

use anyhow::{bail, Context, Result};
use crypto_core::jwt::{TokenCodec, MIN_SECRET_BYTES};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::info;

use crate::security::TokenLifetimes;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub tokens: TokenSettings,
    pub server: ServerSettings,
}

impl Settings {
    /// Load settings from the environment (and `.env` in debug builds)
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) && dotenvy::dotenv().is_ok() {
            info!("Loaded .env file for development");
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Ok(Settings {
            database: DatabaseSettings::from_env()?,
            jwt: JwtSettings::from_env()?,
            tokens: TokenSettings::from_env()?,
            server: ServerSettings::from_env()?,
        })
    }
}

fn parse_or<T>(name: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("Invalid {}", name))
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: u64,
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", "20")?,
            acquire_timeout: parse_or("DATABASE_ACQUIRE_TIMEOUT", "5")?,
        })
    }
}

/// Token signing settings
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtSettings {
    pub algorithm: String,
    pub signing_key: String,
    pub validation_key: Option<String>,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("algorithm", &self.algorithm)
            .field("signing_key", &"<redacted>")
            .field("validation_key", &self.validation_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        // PEM keys take precedence over a shared secret
        if let Ok(private_pem) = env::var("JWT_PRIVATE_KEY") {
            let public_pem = env::var("JWT_PUBLIC_KEY")
                .context("JWT_PUBLIC_KEY must be set together with JWT_PRIVATE_KEY")?;
            return Ok(Self {
                algorithm: "RS256".to_string(),
                signing_key: private_pem,
                validation_key: Some(public_pem),
            });
        }

        let signing_key = env::var("JWT_SECRET")
            .context("JWT_SECRET must be set when no PEM keys are configured")?;
        if signing_key.len() < MIN_SECRET_BYTES {
            bail!("JWT_SECRET must be at least {} bytes", MIN_SECRET_BYTES);
        }

        let algorithm = env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string());
        if algorithm != "HS256" {
            bail!("JWT_ALGORITHM {} is not supported with JWT_SECRET", algorithm);
        }

        Ok(Self {
            algorithm,
            signing_key,
            validation_key: None,
        })
    }

    /// Build the codec for the configured algorithm
    pub fn codec(&self) -> Result<TokenCodec> {
        let codec = match (self.algorithm.as_str(), &self.validation_key) {
            ("RS256", Some(public_pem)) => TokenCodec::rs256(&self.signing_key, public_pem),
            ("RS256", None) => bail!("RS256 requires a public key"),
            ("HS256", _) => TokenCodec::hs256(self.signing_key.as_bytes()),
            (other, _) => bail!("Unsupported JWT algorithm: {}", other),
        };
        codec.context("Failed to initialize token codec")
    }
}

/// Token lifetime and store access settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSettings {
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub lookup_timeout_ms: u64,
    pub purge_interval_secs: u64,
}

impl TokenSettings {
    fn from_env() -> Result<Self> {
        let settings = Self {
            access_ttl_secs: parse_or("ACCESS_TOKEN_TTL_SECS", "900")?,
            refresh_ttl_secs: parse_or("REFRESH_TOKEN_TTL_SECS", "604800")?,
            lookup_timeout_ms: parse_or("TOKEN_LOOKUP_TIMEOUT_MS", "2000")?,
            purge_interval_secs: parse_or("TOKEN_PURGE_INTERVAL_SECS", "3600")?,
        };

        if settings.access_ttl_secs <= 0 || settings.refresh_ttl_secs <= 0 {
            bail!("Token lifetimes must be positive");
        }
        for (name, secs) in [
            ("ACCESS_TOKEN_TTL_SECS", settings.access_ttl_secs),
            ("REFRESH_TOKEN_TTL_SECS", settings.refresh_ttl_secs),
        ] {
            // expirations must stay representable for as long as the service runs
            let representable = chrono::Duration::try_seconds(secs)
                .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
                .is_some();
            if !representable {
                bail!("{} is too large: {}", name, secs);
            }
        }
        if settings.lookup_timeout_ms == 0 || settings.purge_interval_secs == 0 {
            bail!("TOKEN_LOOKUP_TIMEOUT_MS and TOKEN_PURGE_INTERVAL_SECS must be positive");
        }
        Ok(settings)
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        TokenLifetimes {
            access: ttl(self.access_ttl_secs),
            refresh: ttl(self.refresh_ttl_secs),
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }
}

// out-of-range values are rejected at issuance instead of panicking here
fn ttl(secs: i64) -> chrono::Duration {
    chrono::Duration::try_seconds(secs).unwrap_or_else(chrono::Duration::max_value)
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("SERVER_PORT", "8080")?,
        })
    }
}
