use crate::auth::{CurrentUser, SESSION_COOKIE};
use crate::config::Config;
use crate::database::postgres_repository::PostgresRepository;
use crate::database::session::SessionRepository;
use crate::error::app_error::AppError;
use crate::models::user::{LoginRequest, LoginResponse};
use crate::service::auth::{AuthService, LoginOutcome};
use crate::service::login_guard::LoginGuard;
use crate::service::password::Argon2Hasher;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Serialize, JsonSchema)]
pub struct LogoutResponse {
    pub message: String,
}

/// Log in with email and password
///
/// Returns a session token and sets the session cookie. After five consecutive
/// failures the email is locked out for thirty minutes.
#[openapi(tag = "Authentication")]
#[post("/login", data = "<payload>")]
pub async fn post_login(
    pool: &State<PgPool>,
    hasher: &State<Argon2Hasher>,
    guard: &State<Arc<LoginGuard>>,
    config: &State<Config>,
    cookies: &CookieJar<'_>,
    payload: Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let session_ttl = chrono::Duration::seconds(config.session.ttl_seconds);
    let service = AuthService::new(&repo, hasher.inner(), guard.inner().as_ref(), session_ttl);

    match service.attempt_login(&payload.email, &payload.password).await? {
        LoginOutcome::Success { email, name, user_id, token } => {
            let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .max_age(rocket::time::Duration::seconds(config.session.ttl_seconds));
            cookies.add_private(cookie);

            Ok(Json(LoginResponse { email, name, user_id, token }))
        }
        LoginOutcome::Failed { message, .. } => Err(AppError::LoginFailed(message)),
        LoginOutcome::Locked { .. } => Err(AppError::TooManyLoginAttempts),
    }
}

/// End the current session
#[openapi(tag = "Authentication")]
#[post("/logout")]
pub async fn post_logout(pool: &State<PgPool>, cookies: &CookieJar<'_>, current_user: CurrentUser) -> Result<Json<LogoutResponse>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    repo.delete_session(&current_user.session_id).await?;
    cookies.remove_private(Cookie::build(SESSION_COOKIE).path("/"));

    Ok(Json(LogoutResponse {
        message: "Logged out".to_string(),
    }))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![post_login, post_logout]
}
