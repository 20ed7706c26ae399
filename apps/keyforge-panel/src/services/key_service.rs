use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use sqlx::SqlitePool;

use keyforge_db::error::StoreError;
use keyforge_db::models::key::LicenseKey;
use keyforge_db::repositories::key_repo::{KeyRepository, NewKey};
use keyforge_shared::{GenerateKeyRequest, ResellerStats};

use crate::error::ApiError;

/// Key lifecycle on behalf of resellers: minting (one credit each),
/// listing with fresh expiry status, and owner-checked deletion.
#[derive(Debug, Clone)]
pub struct KeyService {
    keys: KeyRepository,
}

impl KeyService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            keys: KeyRepository::new(pool),
        }
    }

    pub async fn generate(
        &self,
        reseller_id: i64,
        req: GenerateKeyRequest,
    ) -> Result<LicenseKey, ApiError> {
        let game = req.game.trim();
        if game.is_empty() {
            return Err(ApiError::Validation("Game is required".to_string()));
        }
        if req.device_limit < 1 {
            return Err(ApiError::Validation(
                "Device limit must be a positive integer".to_string(),
            ));
        }
        let expiry_date = parse_expiry(&req.expiry_date)?;

        // All preconditions run before the debit so a rejected request
        // never touches the balance.
        let custom = req.custom_key.as_deref().map(str::trim).filter(|k| !k.is_empty());
        let key_value = match custom {
            Some(custom) => {
                if self.keys.get_by_value(custom).await?.is_some() {
                    return Err(ApiError::Validation("Custom key already exists".to_string()));
                }
                custom.to_string()
            }
            None => generate_key_string(),
        };

        let key = self
            .keys
            .create(NewKey {
                key: key_value,
                game: game.to_string(),
                device_limit: req.device_limit,
                expiry_date,
                reseller_id,
            })
            .await
            .map_err(|e| match e {
                StoreError::NotFound => ApiError::NotFound("Reseller"),
                other => other.into(),
            })?;

        tracing::info!(reseller_id, key_id = key.id, "key generated");
        Ok(key)
    }

    /// Reseller's keys with expiry materialized, so the dashboard never
    /// shows a stale `active` on a past-expiry key.
    pub async fn list(&self, reseller_id: i64) -> Result<Vec<LicenseKey>, ApiError> {
        let mut out = Vec::new();
        for key in self.keys.list_by_reseller(reseller_id).await? {
            out.push(self.keys.materialize(key).await?);
        }
        Ok(out)
    }

    pub async fn delete(&self, key_id: i64, requester_id: i64) -> Result<(), ApiError> {
        self.keys.delete(key_id, requester_id).await.map_err(|e| match e {
            StoreError::NotFound => ApiError::NotFound("Key"),
            other => other.into(),
        })
    }

    /// Active/expired split is purely by expiry date; a full key that has
    /// not expired still counts as active here.
    pub async fn stats(&self, reseller_id: i64) -> Result<ResellerStats, ApiError> {
        let keys = self.keys.list_by_reseller(reseller_id).await?;
        let now = Utc::now();
        let expired = keys.iter().filter(|k| k.is_expired_at(now)).count() as i64;
        Ok(ResellerStats {
            total_keys: keys.len() as i64,
            active_keys: keys.len() as i64 - expired,
            expired_keys: expired,
        })
    }
}

/// Four 8-hex-char uppercase groups, 16 random bytes total, e.g.
/// `6B29FC40-CA471A2F-B31D8312-55E21F9C`.
pub fn generate_key_string() -> String {
    let mut rng = rand::rng();
    let parts: Vec<String> = (0..4)
        .map(|_| hex::encode_upper(rng.random::<[u8; 4]>()))
        .collect();
    parts.join("-")
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD` (expiring at the end of that
/// day, UTC).
pub fn parse_expiry(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Some(end_of_day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
    {
        return Ok(end_of_day.and_utc());
    }
    Err(ApiError::Validation("Expiry date is invalid".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_string_has_four_uppercase_hex_groups() {
        let key = generate_key_string();
        let groups: Vec<&str> = key.split('-').collect();
        assert_eq!(groups.len(), 4);
        for group in groups {
            assert_eq!(group.len(), 8);
            assert!(group.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn consecutive_keys_differ() {
        assert_ne!(generate_key_string(), generate_key_string());
    }

    #[test]
    fn expiry_accepts_rfc3339_and_plain_date() {
        assert!(parse_expiry("2027-01-15T10:30:00Z").is_ok());
        let eod = parse_expiry("2027-01-15").unwrap();
        assert_eq!(eod.to_rfc3339(), "2027-01-15T23:59:59+00:00");
    }

    #[test]
    fn expiry_rejects_garbage() {
        assert!(parse_expiry("next tuesday").is_err());
        assert!(parse_expiry("").is_err());
    }
}
