use crate::database::postgres_repository::PostgresRepository;
use crate::database::session::SessionRepository;
use crate::error::app_error::AppError;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{FromRequest, Outcome as RequestOutcome, Request};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{Object, Responses, SecurityRequirement, SecurityScheme, SecuritySchemeData};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// Name of the private cookie carrying the session token.
pub const SESSION_COOKIE: &str = "user";

#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub session_id: Uuid,
}

pub fn session_token(session_id: &Uuid, user_id: &Uuid) -> String {
    format!("{}:{}", session_id, user_id)
}

/// Splits `<session_id>:<user_id>` back into its ids.
pub(crate) fn parse_session_token(value: &str) -> Option<(Uuid, Uuid)> {
    let (session_id_str, user_id_str) = value.split_once(':')?;
    let session_id = Uuid::parse_str(session_id_str).ok()?;
    let user_id = Uuid::parse_str(user_id_str).ok()?;
    Some((session_id, user_id))
}

fn bearer_token<'a>(req: &'a Request<'_>) -> Option<&'a str> {
    req.headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = AppError;

    async fn from_request(req: &'r Request<'_>) -> RequestOutcome<Self, Self::Error> {
        let token = match bearer_token(req) {
            Some(token) => Some(token.to_string()),
            None => req.cookies().get_private(SESSION_COOKIE).map(|c| c.value().to_string()),
        };

        let Some((session_id, user_id)) = token.as_deref().and_then(parse_session_token) else {
            return Outcome::Error((Status::Unauthorized, AppError::Unauthorized));
        };

        let pool = match req.rocket().state::<PgPool>() {
            Some(pool) => pool,
            None => return Outcome::Error((Status::InternalServerError, AppError::Unauthorized)),
        };
        let repo = PostgresRepository { pool: pool.clone() };

        match repo.get_active_session_user(&session_id, &user_id).await {
            Ok(Some(user)) => {
                let current_user = CurrentUser {
                    id: user.id,
                    email: user.email,
                    session_id,
                };
                req.local_cache(|| Some(current_user.clone()));
                Outcome::Success(current_user)
            }
            Ok(None) => {
                if let Err(err) = repo.delete_session_if_expired(&session_id).await {
                    tracing::warn!(error = ?err, "failed to purge expired session");
                }
                Outcome::Error((Status::Unauthorized, AppError::Unauthorized))
            }
            Err(err) => Outcome::Error((Status::InternalServerError, err)),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for CurrentUser {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        let security_scheme = SecurityScheme {
            description: Some(
                "Session token returned by POST /api/authentication/login, sent as `Authorization: Bearer <token>` or via the session cookie."
                    .to_string(),
            ),
            data: SecuritySchemeData::Http {
                scheme: "bearer".to_string(),
                bearer_format: Some("<session_id>:<user_id>".to_string()),
            },
            extensions: Object::default(),
        };

        let mut security_req = SecurityRequirement::new();
        security_req.insert("sessionToken".to_string(), Vec::new());

        Ok(RequestHeaderInput::Security("sessionToken".to_string(), security_scheme, security_req))
    }

    fn get_responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response};
        let mut responses = Responses::default();
        responses.responses.insert(
            "401".to_string(),
            RefOr::Object(Response {
                description: "Unauthorized - Authentication required".to_string(),
                ..Default::default()
            }),
        );
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::get;
    use rocket::http::Header;
    use rocket::local::asynchronous::Client;
    use rocket::routes;

    #[test]
    fn session_token_round_trips() {
        let session_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let token = session_token(&session_id, &user_id);
        assert_eq!(parse_session_token(&token), Some((session_id, user_id)));
    }

    #[test]
    fn parse_session_token_invalid_uuid() {
        assert!(parse_session_token("not-a-uuid:user@example.com").is_none());
    }

    #[test]
    fn parse_session_token_missing_delimiter() {
        assert!(parse_session_token("missing-delimiter").is_none());
    }

    #[get("/me")]
    fn me(user: CurrentUser) -> String {
        user.email
    }

    #[rocket::async_test]
    async fn missing_token_is_unauthorized() {
        let client = Client::tracked(rocket::build().mount("/", routes![me])).await.expect("valid rocket instance");

        let response = client.get("/me").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn malformed_bearer_token_is_unauthorized() {
        let client = Client::tracked(rocket::build().mount("/", routes![me])).await.expect("valid rocket instance");

        let response = client.get("/me").header(Header::new("Authorization", "Bearer garbage")).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }
}
