pub mod key_service;
pub mod session_service;
pub mod verify_service;
