pub mod auth_service;
pub mod file_service;
pub mod keys;
pub mod storage;
pub mod user_registry;
