//! Wire types for the keyforge HTTP API.
//!
//! Third-party game clients and the dashboard frontend both consume these
//! shapes, so field names (camelCase) and optionality are part of the
//! contract and must not change casually.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub referral_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateTokensRequest {
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCreditsRequest {
    pub reseller_id: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateKeyRequest {
    pub game: String,
    pub device_limit: i64,
    pub custom_key: Option<String>,
    /// RFC 3339 timestamp or a plain `YYYY-MM-DD` date.
    pub expiry_date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub key: String,
    pub hwid: String,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyData {
    pub game: String,
    pub device_limit: i64,
    pub devices_used: i64,
    pub expiry_date: DateTime<Utc>,
}

/// Payload of `GET /api/key-status/{key}`.
///
/// The invalid case deliberately omits `status`/`game` instead of nulling
/// them; polling clients branch on `isValid` alone.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatusData {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices_used: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl KeyStatusData {
    pub fn invalid() -> Self {
        Self {
            is_valid: false,
            message: Some("Invalid key".to_string()),
            game: None,
            device_limit: None,
            devices_used: None,
            expiry_date: None,
            status: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInfo {
    pub id: i64,
    pub key: String,
    pub game: String,
    pub device_limit: i64,
    pub devices_used: i64,
    pub expiry_date: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub id: i64,
    pub token: String,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResellerInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub credits: i64,
    pub keys_generated: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_resellers: i64,
    pub total_keys: i64,
    pub total_credits: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResellerStats {
    pub total_keys: i64,
    pub active_keys: i64,
    pub expired_keys: i64,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiUsageStats {
    pub total_requests: i64,
    pub last_request: Option<DateTime<Utc>>,
    pub usage_by_date: HashMap<String, i64>,
    pub usage_by_key: HashMap<String, i64>,
}
