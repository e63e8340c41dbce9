use crate::models::health::HealthResponse;
use rocket::get;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

/// Liveness check; does not touch the database.
#[openapi(tag = "Health")]
#[get("/")]
pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string() })
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![healthcheck]
}

#[cfg(test)]
mod tests {
    use rocket::http::Status;
    use rocket::local::asynchronous::Client;

    #[rocket::async_test]
    async fn health_check_works() {
        let (routes, _) = super::routes();
        let client = Client::tracked(rocket::build().mount("/api/health", routes))
            .await
            .expect("valid rocket instance");

        let response = client.get("/api/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: serde_json::Value = response.into_json().await.expect("json body");
        assert_eq!(body["status"], "ok");
    }
}
