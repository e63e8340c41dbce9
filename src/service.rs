pub mod auth;
pub mod login_guard;
pub mod password;
pub mod user;
