use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::CookieJar;
use rand::Rng;
use serde_json::json;
use tracing::info;

use keyforge_db::error::StoreError;
use keyforge_db::repositories::reseller_repo::ResellerRepository;
use keyforge_db::repositories::token_repo::TokenRepository;
use keyforge_shared::{AddCreditsRequest, AdminStats, GenerateTokensRequest, ResellerInfo, TokenInfo};

use crate::AppState;
use crate::error::ApiError;
use crate::handlers::auth::require_admin;

/// 16 random bytes, lowercase hex. Enough entropy that used and
/// nonexistent tokens stay indistinguishable to a guesser.
pub fn generate_token_string() -> String {
    hex::encode(rand::rng().random::<[u8; 16]>())
}

/// POST /api/admin/generate-tokens
pub async fn generate_tokens(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<GenerateTokensRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &jar).await?;

    let count = payload.count.unwrap_or(1);
    if !(1..=100).contains(&count) {
        return Err(ApiError::Validation("Count must be between 1 and 100".to_string()));
    }
    let tokens_repo = TokenRepository::new(state.pool.clone());

    let mut tokens = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let token = tokens_repo.create(&generate_token_string()).await?;
        tokens.push(json!({ "token": token.token, "used": token.used }));
    }
    info!(count, "referral tokens issued");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "tokens": tokens })),
    ))
}

/// GET /api/admin/tokens
pub async fn list_tokens(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &jar).await?;

    let tokens = TokenRepository::new(state.pool.clone()).list().await?;
    let tokens: Vec<TokenInfo> = tokens
        .into_iter()
        .map(|t| TokenInfo {
            id: t.id,
            token: t.token,
            used: t.used,
            created_at: t.created_at,
        })
        .collect();

    Ok(Json(json!({ "status": "success", "tokens": tokens })))
}

/// GET /api/admin/resellers
pub async fn list_resellers(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &jar).await?;

    let resellers = ResellerRepository::new(state.pool.clone()).list().await?;
    let resellers: Vec<ResellerInfo> = resellers
        .into_iter()
        .map(|r| ResellerInfo {
            id: r.id,
            username: r.username,
            email: r.email,
            credits: r.credits,
            keys_generated: r.keys_generated,
            created_at: r.created_at,
        })
        .collect();

    Ok(Json(json!({ "status": "success", "resellers": resellers })))
}

/// POST /api/admin/add-credits
pub async fn add_credits(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<AddCreditsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &jar).await?;

    if payload.amount < 1 {
        return Err(ApiError::Validation("Amount must be positive".to_string()));
    }

    let resellers = ResellerRepository::new(state.pool.clone());
    let reseller = resellers
        .add_credits(payload.reseller_id, payload.amount)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::NotFound("Reseller"),
            other => other.into(),
        })?;
    info!(reseller_id = reseller.id, amount = payload.amount, "credits added");

    Ok(Json(json!({
        "status": "success",
        "reseller": {
            "id": reseller.id,
            "username": reseller.username,
            "email": reseller.email,
            "credits": reseller.credits,
        },
    })))
}

/// DELETE /api/admin/resellers/{id}
pub async fn delete_reseller(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &jar).await?;

    ResellerRepository::new(state.pool.clone())
        .delete(id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::NotFound("Reseller"),
            other => other.into(),
        })?;
    info!(reseller_id = id, "reseller deleted");

    Ok(Json(json!({ "status": "success", "message": "Reseller deleted successfully" })))
}

/// GET /api/admin/stats
pub async fn admin_stats(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &jar).await?;

    let (total_resellers, total_keys, total_credits) =
        ResellerRepository::new(state.pool.clone()).totals().await?;

    Ok(Json(json!({
        "status": "success",
        "stats": AdminStats { total_resellers, total_keys, total_credits },
    })))
}
