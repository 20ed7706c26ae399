use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::StoreError;
use crate::models::token::ReferralToken;

#[derive(Debug, Clone)]
pub struct TokenRepository {
    pool: SqlitePool,
}

impl TokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, token: &str) -> Result<ReferralToken, StoreError> {
        let token = sqlx::query_as::<_, ReferralToken>(
            "INSERT INTO referral_tokens (token, used, created_at) VALUES (?, 0, ?) \
             RETURNING id, token, used, created_at",
        )
        .bind(token)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(token)
    }

    /// Unused tokens only; a used token is indistinguishable from one
    /// that never existed.
    pub async fn find_unused(&self, token: &str) -> Result<Option<ReferralToken>, StoreError> {
        let token = sqlx::query_as::<_, ReferralToken>(
            "SELECT id, token, used, created_at FROM referral_tokens WHERE token = ? AND used = 0",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    pub async fn list(&self) -> Result<Vec<ReferralToken>, StoreError> {
        let tokens = sqlx::query_as::<_, ReferralToken>(
            "SELECT id, token, used, created_at FROM referral_tokens ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tokens)
    }
}
