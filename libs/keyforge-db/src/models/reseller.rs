use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reseller {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub credits: i64,
    /// Lifetime count of keys this reseller has minted. Never decremented,
    /// not even when keys are deleted.
    pub keys_generated: i64,
    pub created_at: DateTime<Utc>,
}
