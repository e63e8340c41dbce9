use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShopItem {
    pub id: Uuid,
    pub name: String,
    pub price: String,
    pub description: String,
    pub category: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct ShopItemRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1))]
    pub price: String,
    #[validate(length(min = 1, max = 100))]
    pub description: String,
    #[validate(length(min = 1))]
    pub category: String,
    #[validate(range(min = 0))]
    pub quantity: i32,
}

/// Only name, price and stock can change after an item is listed.
#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct ShopItemUpdateRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1))]
    pub price: String,
    #[validate(range(min = 0))]
    pub quantity: i32,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct ShopItemResponse {
    pub id: Uuid,
    pub name: String,
    pub price: String,
    pub description: String,
    pub category: String,
    pub quantity: i32,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct ShopItemMutationResponse {
    pub message: String,
    pub data: ShopItemResponse,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct ShopItemIdResponse {
    pub id: Uuid,
}

impl From<&ShopItem> for ShopItemResponse {
    fn from(item: &ShopItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            price: item.price.clone(),
            description: item.description.clone(),
            category: item.category.clone(),
            quantity: item.quantity,
        }
    }
}
