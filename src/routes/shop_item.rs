use crate::auth::CurrentUser;
use crate::database::postgres_repository::PostgresRepository;
use crate::database::shop_item::ShopItemRepository;
use crate::error::app_error::AppError;
use crate::models::pagination::{PaginatedResponse, PaginationParams};
use crate::models::shop_item::{ShopItemIdResponse, ShopItemMutationResponse, ShopItemRequest, ShopItemResponse, ShopItemUpdateRequest};
use rocket::serde::json::Json;
use rocket::{State, delete, get, post, put};
use rocket_okapi::openapi;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

const UNKNOWN_SHOP_ITEM: &str = "Unknown shop item";

fn parse_item_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|e| AppError::uuid("Invalid shop item id", e))
}

/// List shop items
///
/// Returns every item unless `page` or `limit` is given.
#[openapi(tag = "Shop Items")]
#[get("/?<page>&<limit>")]
pub async fn list_shop_items(
    pool: &State<PgPool>,
    _current_user: CurrentUser,
    page: Option<i64>,
    limit: Option<i64>,
) -> Result<Json<PaginatedResponse<ShopItemResponse>>, AppError> {
    let params = PaginationParams::from_query(page, limit)?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let (items, total) = repo.list_shop_items(params.as_ref()).await?;
    let responses = items.iter().map(ShopItemResponse::from).collect();

    Ok(Json(PaginatedResponse::from_params(responses, params.as_ref(), total)))
}

#[openapi(tag = "Shop Items")]
#[post("/", data = "<payload>")]
pub async fn create_shop_item(pool: &State<PgPool>, _current_user: CurrentUser, payload: Json<ShopItemRequest>) -> Result<Json<ShopItemMutationResponse>, AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let item = repo.create_shop_item(&payload).await?;

    Ok(Json(ShopItemMutationResponse {
        message: "Product created successfully".to_string(),
        data: ShopItemResponse::from(&item),
    }))
}

#[openapi(tag = "Shop Items")]
#[get("/<id>")]
pub async fn get_shop_item(pool: &State<PgPool>, _current_user: CurrentUser, id: &str) -> Result<Json<ShopItemResponse>, AppError> {
    let item_id = parse_item_id(id)?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    match repo.get_shop_item_by_id(&item_id).await? {
        Some(item) => Ok(Json(ShopItemResponse::from(&item))),
        None => Err(AppError::NotFound(UNKNOWN_SHOP_ITEM.to_string())),
    }
}

#[openapi(tag = "Shop Items")]
#[put("/<id>", data = "<payload>")]
pub async fn put_shop_item(
    pool: &State<PgPool>,
    _current_user: CurrentUser,
    id: &str,
    payload: Json<ShopItemUpdateRequest>,
) -> Result<Json<ShopItemMutationResponse>, AppError> {
    payload.validate()?;
    let item_id = parse_item_id(id)?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let item = repo
        .update_shop_item(&item_id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(UNKNOWN_SHOP_ITEM.to_string()))?;

    Ok(Json(ShopItemMutationResponse {
        message: "Product updated successfully".to_string(),
        data: ShopItemResponse::from(&item),
    }))
}

#[openapi(tag = "Shop Items")]
#[delete("/<id>")]
pub async fn delete_shop_item(pool: &State<PgPool>, _current_user: CurrentUser, id: &str) -> Result<Json<ShopItemIdResponse>, AppError> {
    let item_id = parse_item_id(id)?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    if !repo.delete_shop_item(&item_id).await? {
        return Err(AppError::NotFound(UNKNOWN_SHOP_ITEM.to_string()));
    }

    Ok(Json(ShopItemIdResponse { id: item_id }))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![list_shop_items, create_shop_item, get_shop_item, put_shop_item, delete_shop_item]
}
