pub mod auth;
pub mod error_detail;
pub mod request_id;
