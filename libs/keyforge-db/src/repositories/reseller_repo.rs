use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::StoreError;
use crate::models::reseller::Reseller;

const RESELLER_COLS: &str =
    "id, username, email, password_hash, credits, keys_generated, created_at";

#[derive(Debug, Clone)]
pub struct NewReseller {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct ResellerRepository {
    pool: SqlitePool,
}

impl ResellerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Registration gated by a single-use referral token: claim the
    /// token, then create the account, inside one transaction. If the
    /// account insert fails the claim rolls back and the token stays
    /// unused.
    pub async fn register(
        &self,
        new: NewReseller,
        referral_token: &str,
    ) -> Result<Reseller, StoreError> {
        // The claim opens the transaction so the write lock is taken up
        // front (a read-then-write upgrade would hit SQLITE_BUSY_SNAPSHOT
        // under WAL). Used tokens are treated exactly like nonexistent
        // ones so the endpoint cannot be used as a token-guessing oracle.
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query("UPDATE referral_tokens SET used = 1 WHERE token = ? AND used = 0")
            .bind(referral_token)
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            return Err(StoreError::InvalidToken);
        }

        let reseller = sqlx::query_as::<_, Reseller>(&format!(
            "INSERT INTO resellers (username, email, password_hash, credits, keys_generated, created_at) \
             VALUES (?, ?, ?, 0, 0, ?) RETURNING {RESELLER_COLS}"
        ))
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::on_unique(e, StoreError::DuplicateAccount))?;

        tx.commit().await?;
        tracing::debug!(reseller_id = reseller.id, "reseller account created");
        Ok(reseller)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Reseller>, StoreError> {
        let reseller = sqlx::query_as::<_, Reseller>(&format!(
            "SELECT {RESELLER_COLS} FROM resellers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reseller)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<Reseller>, StoreError> {
        let reseller = sqlx::query_as::<_, Reseller>(&format!(
            "SELECT {RESELLER_COLS} FROM resellers WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reseller)
    }

    pub async fn list(&self) -> Result<Vec<Reseller>, StoreError> {
        let resellers = sqlx::query_as::<_, Reseller>(&format!(
            "SELECT {RESELLER_COLS} FROM resellers ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(resellers)
    }

    /// Admin top-up. Amount validation (positive integer) happens at the
    /// request boundary; the balance itself has no upper bound.
    pub async fn add_credits(&self, id: i64, amount: i64) -> Result<Reseller, StoreError> {
        sqlx::query_as::<_, Reseller>(&format!(
            "UPDATE resellers SET credits = credits + ? WHERE id = ? RETURNING {RESELLER_COLS}"
        ))
        .bind(amount)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    /// Removes the account together with its keys and their device
    /// bindings (ON DELETE CASCADE down the chain).
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM resellers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Dashboard totals: reseller count, lifetime keys minted, credits
    /// outstanding.
    pub async fn totals(&self) -> Result<(i64, i64, i64), StoreError> {
        let totals: (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(keys_generated), 0), COALESCE(SUM(credits), 0) FROM resellers",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }
}
