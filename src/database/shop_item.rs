use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::pagination::PaginationParams;
use crate::models::shop_item::{ShopItem, ShopItemRequest, ShopItemUpdateRequest};
use uuid::Uuid;

#[async_trait::async_trait]
pub trait ShopItemRepository {
    async fn create_shop_item(&self, request: &ShopItemRequest) -> Result<ShopItem, AppError>;
    async fn get_shop_item_by_id(&self, id: &Uuid) -> Result<Option<ShopItem>, AppError>;
    async fn list_shop_items(&self, pagination: Option<&PaginationParams>) -> Result<(Vec<ShopItem>, i64), AppError>;
    /// Returns `None` when no item has the given id.
    async fn update_shop_item(&self, id: &Uuid, request: &ShopItemUpdateRequest) -> Result<Option<ShopItem>, AppError>;
    /// Returns whether a row was removed.
    async fn delete_shop_item(&self, id: &Uuid) -> Result<bool, AppError>;
}

#[async_trait::async_trait]
impl ShopItemRepository for PostgresRepository {
    async fn create_shop_item(&self, request: &ShopItemRequest) -> Result<ShopItem, AppError> {
        let item = sqlx::query_as::<_, ShopItem>(
            r#"
            INSERT INTO shop_item (name, price, description, category, quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, price, description, category, quantity, created_at
            "#,
        )
        .bind(&request.name)
        .bind(&request.price)
        .bind(&request.description)
        .bind(&request.category)
        .bind(request.quantity)
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    async fn get_shop_item_by_id(&self, id: &Uuid) -> Result<Option<ShopItem>, AppError> {
        let item = sqlx::query_as::<_, ShopItem>(
            r#"
            SELECT id, name, price, description, category, quantity, created_at
            FROM shop_item
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    async fn list_shop_items(&self, pagination: Option<&PaginationParams>) -> Result<(Vec<ShopItem>, i64), AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM shop_item")
            .fetch_one(&self.pool)
            .await?;

        let mut query = String::from(
            r#"
            SELECT id, name, price, description, category, quantity, created_at
            FROM shop_item
            ORDER BY created_at DESC, id ASC
            "#,
        );

        if let Some(params) = pagination
            && let (Some(limit), Some(offset)) = (params.effective_limit(), params.offset())
        {
            query.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }

        let items = sqlx::query_as::<_, ShopItem>(&query).fetch_all(&self.pool).await?;

        Ok((items, total))
    }

    async fn update_shop_item(&self, id: &Uuid, request: &ShopItemUpdateRequest) -> Result<Option<ShopItem>, AppError> {
        let item = sqlx::query_as::<_, ShopItem>(
            r#"
            UPDATE shop_item
            SET name = $1, price = $2, quantity = $3
            WHERE id = $4
            RETURNING id, name, price, description, category, quantity, created_at
            "#,
        )
        .bind(&request.name)
        .bind(&request.price)
        .bind(request.quantity)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    async fn delete_shop_item(&self, id: &Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM shop_item WHERE id = $1").bind(id).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }
}
