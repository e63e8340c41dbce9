pub mod authentication;
pub mod error;
pub mod health;
pub mod shop_item;
pub mod user;
