use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde_json::json;

use keyforge_shared::VerifyRequest;

use crate::AppState;
use crate::error::ApiError;

/// POST /api/verify — the device-consuming call. Game clients invoke
/// this once per install; re-verifying a known hwid is free.
pub async fn verify_key(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.key.trim().is_empty() {
        return Err(ApiError::Validation("Key is required".to_string()));
    }
    if payload.hwid.trim().is_empty() {
        return Err(ApiError::Validation("Hardware ID is required".to_string()));
    }

    let data = state.verifier.verify(payload.key.trim(), payload.hwid.trim()).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Key verified successfully",
        "data": data,
    })))
}

/// GET /api/key-status/{key} — always 200, even for unknown keys, so
/// polling clients can branch on `isValid` alone.
pub async fn key_status(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state.verifier.check_status(key.trim()).await?;
    Ok(Json(json!({ "status": "success", "data": data })))
}
