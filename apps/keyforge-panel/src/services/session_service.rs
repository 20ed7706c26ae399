use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Reseller,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// In-process session store behind the `sid` cookie. The token is an
/// opaque uuid; nothing about the user is readable from the cookie
/// itself. Sessions live for `ttl` and are evicted lazily on lookup.
pub struct SessionService {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionService {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self, user_id: i64, username: &str, role: Role) -> String {
        let token = Uuid::new_v4().to_string();
        let session = Session {
            user_id,
            username: username.to_string(),
            role,
            expires_at: Utc::now() + self.ttl,
        };
        self.sessions.write().await.insert(token.clone(), session);
        token
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        let expired = {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(s) if s.expires_at > Utc::now() => return Some(s.clone()),
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.sessions.write().await.remove(token);
        }
        None
    }

    pub async fn destroy(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }
}
