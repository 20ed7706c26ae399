use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row per (reseller, key, day) bucket of public API hits.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApiUsageRow {
    pub id: i64,
    pub reseller_id: i64,
    pub key: String,
    pub day: String,
    pub requests: i64,
    pub last_request: DateTime<Utc>,
}
