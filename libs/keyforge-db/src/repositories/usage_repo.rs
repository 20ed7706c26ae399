use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::StoreError;
use crate::models::usage::ApiUsageRow;

#[derive(Debug, Clone)]
pub struct UsageRepository {
    pool: SqlitePool,
}

impl UsageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Bumps the per-day counter for a (reseller, key) pair. Called from
    /// the public verify/status paths; failures there are logged, never
    /// surfaced to the game client.
    pub async fn record(&self, reseller_id: i64, key: &str) -> Result<(), StoreError> {
        let now = Utc::now();
        let day = now.format("%Y-%m-%d").to_string();
        sqlx::query(
            "INSERT INTO api_usage (reseller_id, key, day, requests, last_request) \
             VALUES (?, ?, ?, 1, ?) \
             ON CONFLICT (reseller_id, key, day) \
             DO UPDATE SET requests = requests + 1, last_request = excluded.last_request",
        )
        .bind(reseller_id)
        .bind(key)
        .bind(&day)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn for_reseller(&self, reseller_id: i64) -> Result<Vec<ApiUsageRow>, StoreError> {
        let rows = sqlx::query_as::<_, ApiUsageRow>(
            "SELECT id, reseller_id, key, day, requests, last_request \
             FROM api_usage WHERE reseller_id = ? ORDER BY day",
        )
        .bind(reseller_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
