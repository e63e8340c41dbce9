pub mod postgres_repository;
pub mod session;
pub mod shop_item;
pub mod user;
