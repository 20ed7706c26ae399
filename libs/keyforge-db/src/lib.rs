pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use sqlx;

/// Shared schema source so the app and test harnesses run identical
/// migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
