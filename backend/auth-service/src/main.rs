//! Auth Service entry point
//!
//! Starts the HTTP API with:
//! - PostgreSQL pool (users, roles, token registry)
//! - Bearer authentication, request logging and correlation ids
//! - Retention purge (background task)
use actix_middleware::{AuthenticationMiddleware, CorrelationIdMiddleware, Logging};
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use auth_service::{
    config::Settings,
    directory::PgIdentityDirectory,
    handlers,
    services::spawn_purge_task,
    AppState,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use token_revocation::PgRevocationStore;
use tracing::info;

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "auth_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Auth Service");

    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    let codec = settings.jwt.codec()?;
    info!(algorithm = %settings.jwt.algorithm, "Token codec initialized");

    let db_pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .acquire_timeout(Duration::from_secs(settings.database.acquire_timeout))
        .connect(&settings.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!(
        "Database pool initialized with {} max connections",
        settings.database.max_connections
    );

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    PgRevocationStore::migrate(&db_pool)
        .await
        .context("Failed to create token registry schema")?;
    info!("Database migrations completed");

    let store = Arc::new(PgRevocationStore::new(db_pool.clone()));
    let directory = Arc::new(PgIdentityDirectory::new(db_pool));
    let state = AppState::new(
        codec,
        store.clone(),
        directory,
        settings.tokens.lifetimes(),
        settings.tokens.lookup_timeout(),
    );

    let purge = spawn_purge_task(store, settings.tokens.purge_interval());

    let bind = (settings.server.host.clone(), settings.server.port);
    info!("HTTP server listening on {}:{}", bind.0, bind.1);

    // actix installs its own SIGINT/SIGTERM handling and drains workers
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(AuthenticationMiddleware::new(state.validator.clone()))
            .wrap(Logging)
            .wrap(CorrelationIdMiddleware)
            .configure(handlers::configure)
    })
    .bind(bind)
    .context("Failed to bind HTTP server")?
    .shutdown_timeout(30)
    .run()
    .await
    .context("HTTP server error")?;

    purge.abort();
    info!("Auth service shutdown complete");
    Ok(())
}
