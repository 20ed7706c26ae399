pub mod cli;
pub mod error;
pub mod handlers;
pub mod services;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::HeaderValue;
use axum::http::header::X_CONTENT_TYPE_OPTIONS;
use axum::routing::{delete, get, post};
use sqlx::SqlitePool;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use keyforge_db::repositories::admin_repo::AdminRepository;

use crate::services::key_service::KeyService;
use crate::services::session_service::SessionService;
use crate::services::verify_service::VerifyService;

pub const DEFAULT_SESSION_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub sessions: Arc<SessionService>,
    pub keys: Arc<KeyService>,
    pub verifier: Arc<VerifyService>,
}

impl AppState {
    pub fn new(pool: SqlitePool, session_ttl_secs: i64) -> Self {
        Self {
            sessions: Arc::new(SessionService::new(session_ttl_secs)),
            keys: Arc::new(KeyService::new(pool.clone())),
            verifier: Arc::new(VerifyService::new(pool.clone())),
            pool,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Auth
        .route("/api/admin/login", post(handlers::auth::admin_login))
        .route("/api/reseller/login", post(handlers::auth::reseller_login))
        .route("/api/reseller/register", post(handlers::reseller::register))
        .route("/api/logout", post(handlers::auth::logout))
        .route("/api/me", get(handlers::auth::me))
        // Admin
        .route("/api/admin/generate-tokens", post(handlers::admin::generate_tokens))
        .route("/api/admin/tokens", get(handlers::admin::list_tokens))
        .route("/api/admin/resellers", get(handlers::admin::list_resellers))
        .route("/api/admin/resellers/{id}", delete(handlers::admin::delete_reseller))
        .route("/api/admin/add-credits", post(handlers::admin::add_credits))
        .route("/api/admin/stats", get(handlers::admin::admin_stats))
        // Reseller
        .route("/api/reseller/generate-key", post(handlers::reseller::generate_key))
        .route("/api/reseller/keys", get(handlers::reseller::list_keys))
        .route("/api/reseller/keys/{id}", delete(handlers::reseller::delete_key))
        .route("/api/reseller/stats", get(handlers::reseller::reseller_stats))
        .route("/api/reseller/api-usage", get(handlers::reseller::api_usage))
        // Public verification API
        .route("/api/verify", post(handlers::public::verify_key))
        .route("/api/key-status/{key}", get(handlers::public::key_status))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
}

/// First-run bootstrap: without at least one admin nobody can issue
/// referral tokens, so seed the account the reference deployment ships
/// with.
pub async fn ensure_default_admin(pool: &SqlitePool) -> Result<()> {
    let admins = AdminRepository::new(pool.clone());
    if admins.count().await? > 0 {
        return Ok(());
    }

    let password =
        std::env::var("KEYFORGE_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
    let hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST).context("Failed to hash password")?;
    admins.create("admin", &hash).await?;
    tracing::warn!(
        "created default admin account 'admin'; change it with `keyforge-panel admin reset-password`"
    );
    Ok(())
}
