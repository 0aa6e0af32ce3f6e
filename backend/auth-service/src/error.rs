use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use actix_middleware::UNAUTHORIZED_MESSAGE;
use crypto_core::jwt::CodecError;
use serde_json::json;
use thiserror::Error;
use token_revocation::StoreError;

pub type Result<T> = std::result::Result<T, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Malformed token")]
    MalformedToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Wrong token kind")]
    WrongTokenKind,

    #[error("Invalid token claims: {0}")]
    InvalidClaims(String),

    #[error("Duplicate token id")]
    DuplicateTokenId,

    #[error("Subject not found")]
    SubjectNotFound,

    #[error("Token store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Failures a bearer token can cause; all look identical to the client
    pub fn is_token_failure(&self) -> bool {
        matches!(
            self,
            IdentityError::MalformedToken
                | IdentityError::InvalidSignature
                | IdentityError::TokenExpired
                | IdentityError::TokenRevoked
                | IdentityError::WrongTokenKind
                | IdentityError::InvalidClaims(_)
                | IdentityError::SubjectNotFound
        )
    }

    /// Short stable label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            IdentityError::MalformedToken => "malformed_token",
            IdentityError::InvalidSignature => "invalid_signature",
            IdentityError::TokenExpired => "expired",
            IdentityError::TokenRevoked => "revoked",
            IdentityError::WrongTokenKind => "wrong_token_kind",
            IdentityError::InvalidClaims(_) => "invalid_claims",
            IdentityError::DuplicateTokenId => "duplicate_id",
            IdentityError::SubjectNotFound => "subject_not_found",
            IdentityError::StoreUnavailable(_) => "store_unavailable",
            IdentityError::InvalidCredentials => "invalid_credentials",
            IdentityError::Validation(_) => "validation",
            IdentityError::Internal(_) => "internal",
        }
    }
}

impl From<CodecError> for IdentityError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::MalformedToken => IdentityError::MalformedToken,
            CodecError::InvalidSignature => IdentityError::InvalidSignature,
            CodecError::Expired => IdentityError::TokenExpired,
            CodecError::InvalidClaims(msg) => IdentityError::InvalidClaims(msg),
            CodecError::InvalidKey(msg) | CodecError::Encoding(msg) => IdentityError::Internal(msg),
        }
    }
}

impl From<StoreError> for IdentityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateId(_) => IdentityError::DuplicateTokenId,
            // rotation source already consumed or gone
            StoreError::NotLive(_) => IdentityError::TokenRevoked,
            StoreError::InvalidRecord(msg) => IdentityError::Internal(msg),
            StoreError::Unavailable(msg) => IdentityError::StoreUnavailable(msg),
        }
    }
}

impl From<sqlx::Error> for IdentityError {
    fn from(err: sqlx::Error) -> Self {
        IdentityError::StoreUnavailable(err.to_string())
    }
}

impl ResponseError for IdentityError {
    fn status_code(&self) -> StatusCode {
        match self {
            e if e.is_token_failure() => StatusCode::UNAUTHORIZED,
            IdentityError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            IdentityError::Validation(_) => StatusCode::BAD_REQUEST,
            IdentityError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            e if e.is_token_failure() => UNAUTHORIZED_MESSAGE.to_string(),
            IdentityError::InvalidCredentials => "Invalid username or password".to_string(),
            IdentityError::Validation(msg) => msg.clone(),
            IdentityError::StoreUnavailable(_) => "Service temporarily unavailable".to_string(),
            _ => "Internal server error".to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_failures_are_indistinguishable() {
        let failures = [
            IdentityError::MalformedToken,
            IdentityError::InvalidSignature,
            IdentityError::TokenExpired,
            IdentityError::TokenRevoked,
            IdentityError::WrongTokenKind,
            IdentityError::SubjectNotFound,
        ];
        for err in failures {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_internal_detail_not_exposed() {
        let err = IdentityError::StoreUnavailable("connection refused at 10.0.0.5".to_string());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        let body = err.error_response();
        assert_eq!(body.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            IdentityError::from(StoreError::NotLive("r1".into())),
            IdentityError::TokenRevoked
        ));
        assert!(matches!(
            IdentityError::from(StoreError::DuplicateId("x".into())),
            IdentityError::DuplicateTokenId
        ));
        assert!(matches!(
            IdentityError::from(CodecError::Expired),
            IdentityError::TokenExpired
        ));
    }
}
