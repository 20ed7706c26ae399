use chrono::Utc;
use sqlx::SqlitePool;

use keyforge_db::repositories::key_repo::KeyRepository;
use keyforge_db::repositories::usage_repo::UsageRepository;
use keyforge_shared::{KeyStatusData, VerifyData};

use crate::error::ApiError;

/// The public verification protocol. `verify` is the mutating call a
/// game makes once per install; `check_status` is the free polling call
/// that never consumes device capacity.
#[derive(Debug, Clone)]
pub struct VerifyService {
    keys: KeyRepository,
    usage: UsageRepository,
}

impl VerifyService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            keys: KeyRepository::new(pool.clone()),
            usage: UsageRepository::new(pool),
        }
    }

    pub async fn verify(&self, key_value: &str, hwid: &str) -> Result<VerifyData, ApiError> {
        let key = self
            .keys
            .get_by_value(key_value)
            .await?
            .ok_or(ApiError::InvalidKey)?;

        self.track_usage(key.reseller_id, &key.key).await;

        // Expiry is settled before any binding: an expired key never
        // accepts a new device, even with capacity to spare.
        let key = self.keys.materialize(key).await?;
        if key.is_expired_at(Utc::now()) {
            return Err(ApiError::KeyExpired);
        }

        let (_, key) = self.keys.bind_device(key.id, hwid).await?;
        Ok(VerifyData {
            game: key.game,
            device_limit: key.device_limit,
            // Post-bind view: a freshly registered device is already
            // counted here.
            devices_used: key.devices_used,
            expiry_date: key.expiry_date,
        })
    }

    /// Always succeeds at the entity level; an unknown key yields the
    /// sentinel invalid payload instead of an error so polling clients
    /// never need an error branch.
    pub async fn check_status(&self, key_value: &str) -> Result<KeyStatusData, ApiError> {
        let Some(key) = self.keys.get_by_value(key_value).await? else {
            return Ok(KeyStatusData::invalid());
        };

        self.track_usage(key.reseller_id, &key.key).await;

        let now = Utc::now();
        Ok(KeyStatusData {
            is_valid: key.is_valid_at(now),
            message: None,
            game: Some(key.game.clone()),
            device_limit: Some(key.device_limit),
            devices_used: Some(key.devices_used),
            expiry_date: Some(key.expiry_date),
            status: Some(key.effective_status(now).to_string()),
        })
    }

    async fn track_usage(&self, reseller_id: i64, key: &str) {
        if let Err(e) = self.usage.record(reseller_id, key).await {
            tracing::warn!("failed to record api usage: {e}");
        }
    }
}
