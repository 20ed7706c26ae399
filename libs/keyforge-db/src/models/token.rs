use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReferralToken {
    pub id: i64,
    pub token: String,
    /// One-way transition; a used token never passes validation again.
    pub used: bool,
    pub created_at: DateTime<Utc>,
}
