use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use tracing::info;

use keyforge_db::models::key::LicenseKey;
use keyforge_db::repositories::reseller_repo::{NewReseller, ResellerRepository};
use keyforge_db::repositories::usage_repo::UsageRepository;
use keyforge_shared::{ApiUsageStats, GenerateKeyRequest, KeyInfo, RegisterRequest};

use crate::AppState;
use crate::error::ApiError;
use crate::handlers::auth::require_reseller;

fn key_info(key: LicenseKey) -> KeyInfo {
    KeyInfo {
        id: key.id,
        key: key.key,
        game: key.game,
        device_limit: key.device_limit,
        devices_used: key.devices_used,
        expiry_date: key.expiry_date,
        status: key.status,
    }
}

/// POST /api/reseller/register — public, gated by a referral token.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    if username.len() < 3 {
        return Err(ApiError::Validation(
            "Username must be at least 3 characters".to_string(),
        ));
    }
    let email = payload.email.trim();
    if !email.contains('@') {
        return Err(ApiError::Validation("Invalid email address".to_string()));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    if payload.referral_token.trim().is_empty() {
        return Err(ApiError::Validation("Referral token is required".to_string()));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(e.into()))?;

    let resellers = ResellerRepository::new(state.pool.clone());
    let reseller = resellers
        .register(
            NewReseller {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
            },
            payload.referral_token.trim(),
        )
        .await?;
    info!(username = %reseller.username, "reseller registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Reseller account created successfully",
        })),
    ))
}

/// POST /api/reseller/generate-key — consumes exactly one credit.
pub async fn generate_key(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<GenerateKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = require_reseller(&state, &jar, "Admin cannot generate keys").await?;

    let key = state.keys.generate(session.user_id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "key": key_info(key) })),
    ))
}

/// GET /api/reseller/keys
pub async fn list_keys(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let session = require_reseller(&state, &jar, "Admin cannot access reseller keys").await?;

    let keys = state.keys.list(session.user_id).await?;
    let keys: Vec<KeyInfo> = keys.into_iter().map(key_info).collect();

    Ok(Json(json!({ "status": "success", "keys": keys })))
}

/// DELETE /api/reseller/keys/{id}
pub async fn delete_key(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let session = require_reseller(&state, &jar, "Admin cannot delete reseller keys").await?;

    state.keys.delete(id, session.user_id).await?;
    info!(key_id = id, reseller_id = session.user_id, "key deleted");

    Ok(Json(json!({ "status": "success", "message": "Key deleted successfully" })))
}

/// GET /api/reseller/stats
pub async fn reseller_stats(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let session = require_reseller(&state, &jar, "Admin cannot access reseller stats").await?;

    let stats = state.keys.stats(session.user_id).await?;
    Ok(Json(json!({ "status": "success", "stats": stats })))
}

/// GET /api/reseller/api-usage — aggregated public-API hits against this
/// reseller's keys.
pub async fn api_usage(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let session = require_reseller(&state, &jar, "Admin cannot access reseller stats").await?;

    let rows = UsageRepository::new(state.pool.clone())
        .for_reseller(session.user_id)
        .await?;

    let mut stats = ApiUsageStats::default();
    for row in rows {
        stats.total_requests += row.requests;
        *stats.usage_by_date.entry(row.day).or_insert(0) += row.requests;
        *stats.usage_by_key.entry(row.key).or_insert(0) += row.requests;
        stats.last_request = match stats.last_request {
            Some(prev) if prev >= row.last_request => Some(prev),
            _ => Some(row.last_request),
        };
    }

    Ok(Json(json!({ "status": "success", "stats": stats })))
}
