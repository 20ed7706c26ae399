use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub mod status {
    pub const ACTIVE: &str = "active";
    pub const FULL: &str = "full";
    pub const EXPIRED: &str = "expired";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LicenseKey {
    pub id: i64,
    pub key: String,
    pub game: String,
    pub device_limit: i64,
    pub devices_used: i64,
    pub expiry_date: DateTime<Utc>,
    /// Stored status. Stale by design between reads; callers wanting a
    /// fresh view go through `effective_status` (or the repository's
    /// `materialize`, which also persists the expired flip).
    pub status: String,
    pub reseller_id: i64,
    pub created_at: DateTime<Utc>,
}

impl LicenseKey {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date < now
    }

    /// Derives the status with expired > full > active precedence,
    /// ignoring whatever is stored.
    pub fn effective_status(&self, now: DateTime<Utc>) -> &'static str {
        if self.is_expired_at(now) {
            status::EXPIRED
        } else if self.devices_used >= self.device_limit {
            status::FULL
        } else {
            status::ACTIVE
        }
    }

    /// A key is valid when it is not expired and still has device
    /// capacity left.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now) && self.devices_used < self.device_limit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Device {
    pub id: i64,
    pub key_id: i64,
    pub hwid: String,
    pub created_at: DateTime<Utc>,
}
