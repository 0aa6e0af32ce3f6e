//! HTTP request handlers (REST API)

pub mod auth;

pub use auth::{login, logout, me, refresh, sessions, LoginRequest, LogoutRequest, RefreshRequest, SessionView};

use actix_web::{web, HttpResponse};

use crate::error::IdentityError;

/// Register all routes; shared by `main` and the integration tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| IdentityError::Validation(err.to_string()).into()),
    )
    .route("/health", web::get().to(health))
    .service(
        web::scope("/api/v1/auth")
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me))
            .route("/sessions", web::get().to(sessions)),
    );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}
