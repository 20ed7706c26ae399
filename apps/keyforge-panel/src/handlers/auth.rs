use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use tracing::info;

use keyforge_db::repositories::admin_repo::AdminRepository;
use keyforge_db::repositories::reseller_repo::ResellerRepository;
use keyforge_shared::LoginRequest;

use crate::AppState;
use crate::error::ApiError;
use crate::services::session_service::{Role, Session};

pub const SID_COOKIE: &str = "sid";

// ============================================================================
// Session helpers
// ============================================================================

pub async fn current_session(state: &AppState, jar: &CookieJar) -> Option<Session> {
    let cookie = jar.get(SID_COOKIE)?;
    state.sessions.get(cookie.value()).await
}

pub async fn require_session(state: &AppState, jar: &CookieJar) -> Result<Session, ApiError> {
    current_session(state, jar).await.ok_or(ApiError::Unauthorized)
}

pub async fn require_admin(state: &AppState, jar: &CookieJar) -> Result<Session, ApiError> {
    let session = require_session(state, jar).await?;
    if !session.is_admin() {
        return Err(ApiError::Forbidden("Forbidden"));
    }
    Ok(session)
}

/// Reseller-only routes reject admins with a route-specific message.
pub async fn require_reseller(
    state: &AppState,
    jar: &CookieJar,
    denied: &'static str,
) -> Result<Session, ApiError> {
    let session = require_session(state, jar).await?;
    if session.is_admin() {
        return Err(ApiError::Forbidden(denied));
    }
    Ok(session)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SID_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

// ============================================================================
// Route handlers
// ============================================================================

/// POST /api/admin/login
pub async fn admin_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let admins = AdminRepository::new(state.pool.clone());
    let admin = admins
        .get_by_username(payload.username.trim())
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !bcrypt::verify(&payload.password, &admin.password_hash).unwrap_or(false) {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.sessions.create(admin.id, &admin.username, Role::Admin).await;
    info!(username = %admin.username, "admin logged in");

    Ok((
        jar.add(session_cookie(token)),
        Json(json!({
            "status": "success",
            "user": { "id": admin.id, "username": admin.username },
        })),
    ))
}

/// POST /api/reseller/login
pub async fn reseller_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resellers = ResellerRepository::new(state.pool.clone());
    let reseller = resellers
        .get_by_username(payload.username.trim())
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !bcrypt::verify(&payload.password, &reseller.password_hash).unwrap_or(false) {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .sessions
        .create(reseller.id, &reseller.username, Role::Reseller)
        .await;
    info!(username = %reseller.username, "reseller logged in");

    Ok((
        jar.add(session_cookie(token)),
        Json(json!({
            "status": "success",
            "user": {
                "id": reseller.id,
                "username": reseller.username,
                "credits": reseller.credits,
            },
        })),
    ))
}

/// POST /api/logout
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SID_COOKIE) {
        state.sessions.destroy(cookie.value()).await;
    }
    let removal = Cookie::build((SID_COOKIE, "")).path("/").build();
    (
        jar.remove(removal),
        Json(json!({ "status": "success", "message": "Logged out successfully" })),
    )
}

/// GET /api/me — role-dependent shape, used by the dashboard shell.
pub async fn me(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let session = require_session(&state, &jar).await?;

    if session.is_admin() {
        let admins = AdminRepository::new(state.pool.clone());
        let admin = admins
            .get_by_username(&session.username)
            .await?
            .ok_or(ApiError::NotFound("User"))?;
        return Ok(Json(json!({
            "status": "success",
            "user": {
                "id": admin.id,
                "username": admin.username,
                "isAdmin": true,
            },
        })));
    }

    let resellers = ResellerRepository::new(state.pool.clone());
    let reseller = resellers
        .get_by_username(&session.username)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(json!({
        "status": "success",
        "user": {
            "id": reseller.id,
            "username": reseller.username,
            "email": reseller.email,
            "credits": reseller.credits,
            "keysGenerated": reseller.keys_generated,
            "isAdmin": false,
        },
    })))
}
