pub mod health;
pub mod pagination;
pub mod session;
pub mod shop_item;
pub mod user;
