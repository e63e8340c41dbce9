use crate::auth::CurrentUser;
use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::user::{
    ChangePasswordRequest, CreateUserRequest, CreateUserResponse, UpdateUserRequest, UserIdResponse, UserListResponse, UserQuery, UserResponse,
};
use crate::service::password::Argon2Hasher;
use crate::service::user::UserService;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post, put};
use rocket_okapi::openapi;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

fn parse_user_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|e| AppError::uuid("Invalid user id", e))
}

/// List users
///
/// `search` takes `name:<regex>` or `email:<regex>`, `sort` takes
/// `<name|email|created_at>:<asc|desc>`. A `page_size` of 0 returns every user.
#[openapi(tag = "Users")]
#[get("/?<page_number>&<page_size>&<search>&<sort>")]
pub async fn list_users(
    pool: &State<PgPool>,
    hasher: &State<Argon2Hasher>,
    _current_user: CurrentUser,
    page_number: Option<String>,
    page_size: Option<String>,
    search: Option<String>,
    sort: Option<String>,
) -> Result<Json<UserListResponse>, AppError> {
    let query = UserQuery::parse(page_number.as_deref(), page_size.as_deref(), search.as_deref(), sort.as_deref())?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let service = UserService::new(&repo, hasher.inner());
    Ok(Json(service.list_users(&query).await?))
}

/// Register a user
#[openapi(tag = "Users")]
#[post("/", data = "<payload>")]
pub async fn create_user(
    pool: &State<PgPool>,
    hasher: &State<Argon2Hasher>,
    _current_user: CurrentUser,
    payload: Json<CreateUserRequest>,
) -> Result<Json<CreateUserResponse>, AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let service = UserService::new(&repo, hasher.inner());
    Ok(Json(service.create_user(&payload).await?))
}

#[openapi(tag = "Users")]
#[get("/<id>")]
pub async fn get_user(pool: &State<PgPool>, hasher: &State<Argon2Hasher>, _current_user: CurrentUser, id: &str) -> Result<Json<UserResponse>, AppError> {
    let user_id = parse_user_id(id)?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let service = UserService::new(&repo, hasher.inner());
    Ok(Json(service.get_user(&user_id).await?))
}

#[openapi(tag = "Users")]
#[put("/<id>", data = "<payload>")]
pub async fn put_user(
    pool: &State<PgPool>,
    hasher: &State<Argon2Hasher>,
    _current_user: CurrentUser,
    id: &str,
    payload: Json<UpdateUserRequest>,
) -> Result<Json<UserIdResponse>, AppError> {
    payload.validate()?;
    let user_id = parse_user_id(id)?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let service = UserService::new(&repo, hasher.inner());
    Ok(Json(service.update_user(&user_id, &payload).await?))
}

#[openapi(tag = "Users")]
#[delete("/<id>")]
pub async fn delete_user(pool: &State<PgPool>, hasher: &State<Argon2Hasher>, _current_user: CurrentUser, id: &str) -> Result<Json<UserIdResponse>, AppError> {
    let user_id = parse_user_id(id)?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let service = UserService::new(&repo, hasher.inner());
    Ok(Json(service.delete_user(&user_id).await?))
}

/// Change a user's password
///
/// Requires the current password; responds 403 when it does not match.
#[openapi(tag = "Users")]
#[post("/<id>/change-password", data = "<payload>")]
pub async fn post_change_password(
    pool: &State<PgPool>,
    hasher: &State<Argon2Hasher>,
    _current_user: CurrentUser,
    id: &str,
    payload: Json<ChangePasswordRequest>,
) -> Result<Json<UserIdResponse>, AppError> {
    payload.validate()?;
    let user_id = parse_user_id(id)?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let service = UserService::new(&repo, hasher.inner());
    Ok(Json(service.change_password(&user_id, &payload).await?))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![list_users, create_user, get_user, put_user, delete_user, post_change_password]
}
