//! Authentication HTTP handlers

use actix_middleware::Authenticated;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use crypto_core::hash::token_fingerprint;
use crypto_core::jwt::TokenKind;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{IdentityError, Result};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub everywhere: bool,
}

/// One live token of the caller; never includes the token string
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub token_id: String,
    pub kind: TokenKind,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub current: bool,
}

/// POST /api/v1/auth/login
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let LoginRequest { username, password } = payload.into_inner();
    if username.trim().is_empty() || password.is_empty() {
        return Err(IdentityError::Validation(
            "username and password are required".to_string(),
        ));
    }

    let account = state
        .directory
        .authenticate(&username, &password)
        .await
        .map_err(|e| {
            warn!(username = %username, reason = e.kind(), "login rejected");
            e
        })?;

    let pair = state
        .issuer
        .issue(&account.subject, &account.authorities)
        .await?;

    Ok(HttpResponse::Ok().json(pair))
}

/// POST /api/v1/auth/refresh
pub async fn refresh(
    state: web::Data<AppState>,
    payload: web::Json<RefreshRequest>,
) -> Result<HttpResponse> {
    let token = payload.into_inner().refresh_token;

    let pair = state.issuer.refresh(&token).await.map_err(|e| {
        warn!(
            token = %token_fingerprint(&token),
            reason = e.kind(),
            "refresh rejected"
        );
        e
    })?;

    Ok(HttpResponse::Ok().json(pair))
}

/// POST /api/v1/auth/logout
///
/// Always revokes the access token used for this request. With
/// `everywhere = true` every token of the caller is revoked; otherwise a
/// supplied refresh token is revoked if it belongs to the caller.
pub async fn logout(
    state: web::Data<AppState>,
    caller: Authenticated,
    payload: Option<web::Json<LogoutRequest>>,
) -> Result<HttpResponse> {
    let request = payload.map(|p| p.into_inner()).unwrap_or_default();

    if request.everywhere {
        let revoked = state.store.revoke_all_for_subject(&caller.subject).await?;
        info!(subject = %caller.subject, revoked, "logged out everywhere");
        return Ok(HttpResponse::NoContent().finish());
    }

    state.store.revoke(&caller.token_id).await?;

    if let Some(refresh_token) = request.refresh_token.as_deref() {
        revoke_owned_refresh(&state, &caller.subject, refresh_token).await?;
    }

    info!(subject = %caller.subject, token_id = %caller.token_id, "logged out");
    Ok(HttpResponse::NoContent().finish())
}

async fn revoke_owned_refresh(state: &AppState, subject: &str, token: &str) -> Result<()> {
    let claims = match state.codec.verify(token) {
        Ok(claims) => claims,
        // already unusable, nothing to revoke
        Err(e) => {
            warn!(token = %token_fingerprint(token), error = %e, "logout ignored refresh token");
            return Ok(());
        }
    };

    match state.store.get(&claims.jti).await? {
        Some(record) if record.subject == subject && record.kind == TokenKind::Refresh => {
            state.store.revoke(&record.id).await?;
        }
        _ => {
            warn!(subject = %subject, "logout ignored refresh token not owned by caller");
        }
    }
    Ok(())
}

/// GET /api/v1/auth/me
pub async fn me(caller: Authenticated) -> HttpResponse {
    HttpResponse::Ok().json(caller.into_inner())
}

/// GET /api/v1/auth/sessions
pub async fn sessions(state: web::Data<AppState>, caller: Authenticated) -> Result<HttpResponse> {
    let records = state.store.live_for_subject(&caller.subject).await?;
    let views: Vec<SessionView> = records
        .into_iter()
        .map(|r| SessionView {
            current: r.id == caller.token_id,
            token_id: r.id,
            kind: r.kind,
            issued_at: r.issued_at,
            expires_at: r.expires_at,
        })
        .collect();

    Ok(HttpResponse::Ok().json(views))
}
