use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Data, Request, Response};
use tracing::{info, warn};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Correlates the log lines of a single request.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        RequestId(Uuid::new_v4().to_string())
    }

    /// Reuses a caller-supplied id when it is a UUID, otherwise mints one.
    fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim).filter(|v| Uuid::parse_str(v).is_ok()) {
            Some(value) => RequestId(value.to_string()),
            None => RequestId::new(),
        }
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// Tags each request with a [`RequestId`], logs it on the way in and out,
/// and sets security headers on every response.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let request_id = RequestId::from_header(request.headers().get_one(REQUEST_ID_HEADER));
        request.local_cache(|| Some(request_id.clone()));

        info!(
            request_id = %request_id.0,
            method = %request.method(),
            uri = %request.uri(),
            "incoming request"
        );
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let request_id = request
            .local_cache(|| None::<RequestId>)
            .as_ref()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let status = response.status();

        response.set_header(Header::new(REQUEST_ID_HEADER, request_id.clone()));
        response.set_header(Header::new("X-Content-Type-Options", "nosniff"));
        response.set_header(Header::new("X-Frame-Options", "DENY"));
        response.set_header(Header::new("Cache-Control", "no-store"));

        if status.class().is_server_error() || status.class().is_client_error() {
            warn!(
                request_id = %request_id,
                method = %request.method(),
                uri = %request.uri(),
                status = %status.code,
                "request completed with error"
            );
        } else {
            info!(
                request_id = %request_id,
                method = %request.method(),
                uri = %request.uri(),
                status = %status.code,
                "request completed"
            );
        }
    }
}
