use anyhow::{Context, Result};
use sqlx::SqlitePool;

use keyforge_db::repositories::admin_repo::AdminRepository;

pub async fn reset_password(pool: &SqlitePool, username: &str, new_pass: &str) -> Result<()> {
    let hash = bcrypt::hash(new_pass, bcrypt::DEFAULT_COST).context("Failed to hash password")?;

    let admins = AdminRepository::new(pool.clone());
    if admins.update_password(username, &hash).await? {
        println!("Password for admin '{}' has been reset.", username);
    } else {
        admins.create(username, &hash).await?;
        println!("New admin '{}' created.", username);
    }
    Ok(())
}

pub fn info() {
    let port = std::env::var("PANEL_PORT").unwrap_or_else(|_| "3000".to_string());
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/keyforge.db".to_string());
    println!("\n=== KEYFORGE INFO ===");
    println!("API base:     http://0.0.0.0:{}/api", port);
    println!("Database:     {}", database_url);
    println!("Session TTL:  {}s (SESSION_TTL_SECS)", crate::DEFAULT_SESSION_TTL_SECS);
    println!("=====================\n");
}
