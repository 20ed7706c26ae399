pub mod admin_repo;
pub mod key_repo;
pub mod reseller_repo;
pub mod token_repo;
pub mod usage_repo;
