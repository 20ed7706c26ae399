pub mod admin;
pub mod key;
pub mod reseller;
pub mod token;
pub mod usage;
