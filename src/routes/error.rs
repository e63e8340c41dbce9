use rocket::serde::Serialize;
use rocket::serde::json::Json;
use rocket::{Request, catch};

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct Error {
    pub message: String,
}

fn error(message: &str) -> Json<Error> {
    Json(Error { message: message.to_string() })
}

#[catch(400)]
pub fn bad_request(_: &Request) -> Json<Error> {
    error("Bad request")
}

#[catch(401)]
pub fn unauthorized(_: &Request) -> Json<Error> {
    error("Unauthorized")
}

#[catch(404)]
pub fn not_found(_: &Request) -> Json<Error> {
    error("Not found")
}

#[catch(409)]
pub fn conflict(_: &Request) -> Json<Error> {
    error("Conflict")
}

/// Raised by Rocket when a JSON body does not deserialize.
#[catch(422)]
pub fn unprocessable_entity(_: &Request) -> Json<Error> {
    error("Malformed request body")
}

#[catch(500)]
pub fn internal_error(_: &Request) -> Json<Error> {
    error("Internal server error")
}
