use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::StoreError;
use crate::models::key::{Device, LicenseKey, status};

const KEY_COLS: &str = "id, key, game, device_limit, devices_used, expiry_date, status, reseller_id, created_at";

#[derive(Debug, Clone)]
pub struct NewKey {
    pub key: String,
    pub game: String,
    pub device_limit: i64,
    pub expiry_date: DateTime<Utc>,
    pub reseller_id: i64,
}

#[derive(Debug, Clone)]
pub struct KeyRepository {
    pool: SqlitePool,
}

impl KeyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Mints a key. One transaction covers the credit debit, the insert
    /// and the lifetime counter bump: if any step fails, none persist.
    /// The debit is guarded (`credits >= 1`), so a reseller can never go
    /// negative even under concurrent generate-key requests.
    pub async fn create(&self, new: NewKey) -> Result<LicenseKey, StoreError> {
        let mut tx = self.pool.begin().await?;

        let debit = sqlx::query("UPDATE resellers SET credits = credits - 1 WHERE id = ? AND credits >= 1")
            .bind(new.reseller_id)
            .execute(&mut *tx)
            .await?;
        if debit.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM resellers WHERE id = ?)")
                .bind(new.reseller_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                StoreError::InsufficientCredits
            } else {
                StoreError::NotFound
            });
        }

        let key = sqlx::query_as::<_, LicenseKey>(&format!(
            "INSERT INTO license_keys (key, game, device_limit, devices_used, expiry_date, status, reseller_id, created_at) \
             VALUES (?, ?, ?, 0, ?, 'active', ?, ?) RETURNING {KEY_COLS}"
        ))
        .bind(&new.key)
        .bind(&new.game)
        .bind(new.device_limit)
        .bind(new.expiry_date)
        .bind(new.reseller_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::on_unique(e, StoreError::DuplicateKey))?;

        sqlx::query("UPDATE resellers SET keys_generated = keys_generated + 1 WHERE id = ?")
            .bind(new.reseller_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!(key_id = key.id, reseller_id = new.reseller_id, "license key minted");
        Ok(key)
    }

    pub async fn get(&self, id: i64) -> Result<Option<LicenseKey>, StoreError> {
        let key = sqlx::query_as::<_, LicenseKey>(&format!(
            "SELECT {KEY_COLS} FROM license_keys WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(key)
    }

    pub async fn get_by_value(&self, key: &str) -> Result<Option<LicenseKey>, StoreError> {
        let key = sqlx::query_as::<_, LicenseKey>(&format!(
            "SELECT {KEY_COLS} FROM license_keys WHERE key = ?"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(key)
    }

    pub async fn list_by_reseller(&self, reseller_id: i64) -> Result<Vec<LicenseKey>, StoreError> {
        let keys = sqlx::query_as::<_, LicenseKey>(&format!(
            "SELECT {KEY_COLS} FROM license_keys WHERE reseller_id = ? ORDER BY created_at DESC"
        ))
        .bind(reseller_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }

    /// The one place expiry is derived. Every read path that hands a key
    /// onward goes through here so a past-expiry key flips to `expired`
    /// (persisted) before anyone sees stale status.
    pub async fn materialize(&self, mut key: LicenseKey) -> Result<LicenseKey, StoreError> {
        if key.status != status::EXPIRED && key.is_expired_at(Utc::now()) {
            sqlx::query("UPDATE license_keys SET status = ? WHERE id = ?")
                .bind(status::EXPIRED)
                .bind(key.id)
                .execute(&self.pool)
                .await?;
            key.status = status::EXPIRED.to_string();
        }
        Ok(key)
    }

    /// Binds a hardware id to a key. Re-binding a known hwid is idempotent
    /// and does not consume capacity. A new hwid claims a slot through a
    /// guarded increment; the zero-row outcome is the device limit, and
    /// the `full` flip rides the same statement so check-and-increment is
    /// a single atomic step.
    pub async fn bind_device(&self, key_id: i64, hwid: &str) -> Result<(Device, LicenseKey), StoreError> {
        // Idempotent fast path, outside the transaction. A known hwid
        // raced into existence after this check is caught by the unique
        // index below.
        if let Some(device) = self.get_device(key_id, hwid).await? {
            let key = self.get(key_id).await?.ok_or(StoreError::NotFound)?;
            return Ok((device, key));
        }

        // The guarded increment opens the transaction so the write lock
        // is taken up front. Upgrading from a read snapshot instead would
        // hit SQLITE_BUSY_SNAPSHOT under WAL, which busy_timeout does not
        // wait out.
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            "UPDATE license_keys \
             SET devices_used = devices_used + 1, \
                 status = CASE WHEN devices_used + 1 >= device_limit THEN 'full' ELSE status END \
             WHERE id = ? AND devices_used < device_limit",
        )
        .bind(key_id)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM license_keys WHERE id = ?)")
                .bind(key_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                StoreError::DeviceLimitReached
            } else {
                StoreError::NotFound
            });
        }

        let inserted = sqlx::query_as::<_, Device>(
            "INSERT INTO devices (key_id, hwid, created_at) VALUES (?, ?, ?) \
             RETURNING id, key_id, hwid, created_at",
        )
        .bind(key_id)
        .bind(hwid)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await;

        let device = match inserted {
            Ok(device) => device,
            Err(e) if is_unique_violation(&e) => {
                // Lost a race against another bind of the same hwid. Drop
                // our increment (rollback) and return the winner's row.
                drop(tx);
                let device = self
                    .get_device(key_id, hwid)
                    .await?
                    .ok_or(StoreError::NotFound)?;
                let key = self.get(key_id).await?.ok_or(StoreError::NotFound)?;
                return Ok((device, key));
            }
            Err(e) => return Err(e.into()),
        };

        let key = Self::fetch_key(&mut tx, key_id).await?;
        tx.commit().await?;
        tracing::debug!(key_id, hwid, "device bound");
        Ok((device, key))
    }

    pub async fn get_device(&self, key_id: i64, hwid: &str) -> Result<Option<Device>, StoreError> {
        let device = sqlx::query_as::<_, Device>(
            "SELECT id, key_id, hwid, created_at FROM devices WHERE key_id = ? AND hwid = ?",
        )
        .bind(key_id)
        .bind(hwid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(device)
    }

    pub async fn device_count(&self, key_id: i64) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM devices WHERE key_id = ?")
            .bind(key_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Deletes a key on behalf of its owner. Device rows go with it
    /// (ON DELETE CASCADE); the owner's `keys_generated` counter does not
    /// move, it is a lifetime metric.
    pub async fn delete(&self, id: i64, requester_id: i64) -> Result<(), StoreError> {
        let key = self.get(id).await?.ok_or(StoreError::NotFound)?;
        if key.reseller_id != requester_id {
            return Err(StoreError::NotOwner);
        }
        sqlx::query("DELETE FROM license_keys WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        tracing::debug!(key_id = id, "license key deleted");
        Ok(())
    }

    async fn fetch_key(tx: &mut Transaction<'_, Sqlite>, id: i64) -> Result<LicenseKey, StoreError> {
        sqlx::query_as::<_, LicenseKey>(&format!("SELECT {KEY_COLS} FROM license_keys WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(StoreError::NotFound)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
