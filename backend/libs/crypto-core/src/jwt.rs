//! Token codec shared by every service that issues or checks bearer tokens
//!
//! Encodes and verifies the compact `header.payload.signature` form of a
//! token. The codec is pure: it never touches storage and never consults a
//! clock other than the one passed to [`TokenCodec::verify_at`].
//!
//! ## Verification order
//!
//! 1. Structure (three base64url segments, JSON header, well-formed claims)
//! 2. Signature, with the single algorithm the codec was built for
//! 3. Expiration, from the `exp` claim
//!
//! Garbage input is rejected in step 1 before any cryptographic work is done.
//!
//! ## Usage
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use crypto_core::jwt::{TokenCodec, TokenKind};
//!
//! let codec = TokenCodec::hs256(b"an-example-secret-that-is-long-enough!").unwrap();
//! let now = Utc::now();
//! let token = codec
//!     .encode("alice", "jti-1", now, now + Duration::minutes(15), TokenKind::Access, &["ROLE_USER".to_string()])
//!     .unwrap();
//! let claims = codec.verify(&token).unwrap();
//! assert_eq!(claims.sub, "alice");
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Minimum accepted length for symmetric signing secrets
pub const MIN_SECRET_BYTES: usize = 32;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("malformed token")]
    MalformedToken,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

// ============================================================================
// Claims
// ============================================================================

/// Access tokens authorize requests; refresh tokens only mint new pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            other => Err(CodecError::InvalidClaims(format!(
                "unknown token type: {other}"
            ))),
        }
    }
}

/// Claims carried in the token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account username)
    pub sub: String,
    /// Token id, the key of the persisted token record
    pub jti: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
    /// "access" or "refresh"
    pub token_type: TokenKind,
    /// Authorities granted when the token was issued
    pub authorities: Vec<String>,
}

impl Claims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        unix_to_datetime(self.iat)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        unix_to_datetime(self.exp)
    }

    fn check_shape(&self) -> Result<(), CodecError> {
        if self.sub.trim().is_empty() {
            return Err(CodecError::InvalidClaims("subject must not be empty".into()));
        }
        if self.jti.trim().is_empty() {
            return Err(CodecError::InvalidClaims("token id must not be empty".into()));
        }
        if self.authorities.iter().any(|a| a.trim().is_empty()) {
            return Err(CodecError::InvalidClaims(
                "authorities must not contain blank entries".into(),
            ));
        }
        if self.exp <= self.iat {
            return Err(CodecError::InvalidClaims(
                "expiration must be after issued-at".into(),
            ));
        }
        Ok(())
    }
}

fn unix_to_datetime(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Drop sub-second precision so stored timestamps match the `iat`/`exp` claims
pub fn truncate_to_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    unix_to_datetime(at.timestamp())
}

// ============================================================================
// Codec
// ============================================================================

/// Signs and verifies tokens with one server-held key and one algorithm
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// HMAC-SHA256 with a shared secret (at least [`MIN_SECRET_BYTES`] long)
    pub fn hs256(secret: &[u8]) -> Result<Self, CodecError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(CodecError::InvalidKey(format!(
                "secret must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }

        Ok(Self {
            algorithm: Algorithm::HS256,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        })
    }

    /// RSA-SHA256 with a PEM key pair
    pub fn rs256(private_key_pem: &str, public_key_pem: &str) -> Result<Self, CodecError> {
        let encoding = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| CodecError::InvalidKey(format!("RSA private key: {e}")))?;
        let decoding = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| CodecError::InvalidKey(format!("RSA public key: {e}")))?;

        Ok(Self {
            algorithm: Algorithm::RS256,
            encoding,
            decoding,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Seal the given claims into a signed token string
    ///
    /// Timestamps are truncated to whole seconds. Output is deterministic for
    /// identical inputs and key.
    pub fn encode(
        &self,
        subject: &str,
        token_id: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        kind: TokenKind,
        authorities: &[String],
    ) -> Result<String, CodecError> {
        let claims = Claims {
            sub: subject.to_string(),
            jti: token_id.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            token_type: kind,
            authorities: authorities.to_vec(),
        };
        claims.check_shape()?;

        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| CodecError::Encoding(e.to_string()))
    }

    /// Verify against the wall clock
    pub fn verify(&self, token: &str) -> Result<Claims, CodecError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify as of `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, CodecError> {
        // 1. structure, no crypto yet
        parse_unverified(token)?;

        // 2. signature
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims = HashSet::new();
        validation.leeway = 0;

        let verified = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName => CodecError::InvalidSignature,
                _ => CodecError::MalformedToken,
            }
        })?;

        let claims = verified.claims;

        // 3. expiration from the claim itself
        if now.timestamp() >= claims.exp {
            return Err(CodecError::Expired);
        }

        Ok(claims)
    }
}

/// Decode header and payload without checking the signature
///
/// Fails with [`CodecError::MalformedToken`] unless the input has exactly
/// three non-empty base64url segments, a parseable header and well-formed
/// claims.
fn parse_unverified(token: &str) -> Result<(), CodecError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(CodecError::MalformedToken);
    }

    decode_header(token).map_err(|_| CodecError::MalformedToken)?;

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1])
        .map_err(|_| CodecError::MalformedToken)?;
    URL_SAFE_NO_PAD
        .decode(segments[2])
        .map_err(|_| CodecError::MalformedToken)?;

    let claims: Claims =
        serde_json::from_slice(&payload).map_err(|_| CodecError::MalformedToken)?;
    claims
        .check_shape()
        .map_err(|_| CodecError::MalformedToken)
}

// ============================================================================
// Tests
// ============================================================================
