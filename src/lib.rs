mod auth;
mod config;
mod database;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod service;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;

use crate::database::postgres_repository::PostgresRepository;
use crate::db::stage_db;
use crate::middleware::RequestLogger;
use crate::models::user::CreateUserRequest;
use crate::routes as app_routes;
use crate::service::login_guard::LoginGuard;
use crate::service::password::Argon2Hasher;
use crate::service::user::UserService;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket, catchers, http::Method};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};
use rocket_okapi::{get_openapi_route, okapi::merge::marge_spec_list};
use sqlx::PgPool;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(log_level: &str, json_format: bool) {
    // RUST_LOG overrides the configured level, e.g. RUST_LOG=info,storefront::service=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_line_number(true);

    // try_init: tests build several rockets in one process
    let result = if json_format { subscriber.json().try_init() } else { subscriber.try_init() };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn build_cors(cors_config: &config::CorsConfig) -> Result<CorsOptions, String> {
    let is_wildcard = cors_config.allowed_origins.len() == 1 && cors_config.allowed_origins[0] == "*";

    if is_wildcard && cors_config.allow_credentials {
        return Err("Cannot use wildcard origins (*) with credentials enabled".to_string());
    }

    let allowed_origins = if cors_config.allowed_origins.is_empty() {
        AllowedOrigins::some_exact::<&str>(&[])
    } else if is_wildcard {
        AllowedOrigins::all()
    } else {
        AllowedOrigins::some_exact(&cors_config.allowed_origins.iter().map(String::as_str).collect::<Vec<_>>())
    };

    Ok(CorsOptions {
        allowed_origins,
        allowed_methods: vec![Method::Get, Method::Post, Method::Put, Method::Delete, Method::Options, Method::Head]
            .into_iter()
            .map(From::from)
            .collect(),
        allowed_headers: rocket_cors::AllowedHeaders::some(&["Content-Type", "Authorization", "Accept", "X-Request-Id"]),
        allow_credentials: cors_config.allow_credentials,
        ..Default::default()
    })
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return config::DEFAULT_API_BASE_PATH.to_string();
    }

    let mut normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };

    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }

    normalized
}

fn join_base_path(base_path: &str, path: &str) -> String {
    let base = base_path.trim_end_matches('/');
    let suffix = path.trim_start_matches('/');

    if base.is_empty() {
        format!("/{}", suffix)
    } else {
        format!("{}/{}", base, suffix)
    }
}

struct RouteSpec {
    path: &'static str,
    routes: Vec<rocket::Route>,
    openapi: rocket_okapi::okapi::openapi3::OpenApi,
}

fn collect_route_specs() -> Vec<RouteSpec> {
    let (authentication_routes, authentication_openapi) = app_routes::authentication::routes();
    let (user_routes, user_openapi) = app_routes::user::routes();
    let (shop_item_routes, shop_item_openapi) = app_routes::shop_item::routes();
    let (health_routes, health_openapi) = app_routes::health::routes();

    vec![
        RouteSpec {
            path: "/authentication",
            routes: authentication_routes,
            openapi: authentication_openapi,
        },
        RouteSpec {
            path: "/users",
            routes: user_routes,
            openapi: user_openapi,
        },
        RouteSpec {
            path: "/shop-items",
            routes: shop_item_routes,
            openapi: shop_item_openapi,
        },
        RouteSpec {
            path: "/health",
            routes: health_routes,
            openapi: health_openapi,
        },
    ]
}

fn mount_api_routes(mut rocket: Rocket<Build>, base_path: &str, enable_swagger: bool) -> Result<Rocket<Build>, String> {
    let route_specs = collect_route_specs();

    let mut openapi_list = Vec::new();
    for spec in route_specs {
        rocket = rocket.mount(join_base_path(base_path, spec.path), spec.routes);
        openapi_list.push((spec.path, spec.openapi));
    }

    if enable_swagger {
        let openapi_docs = marge_spec_list(&openapi_list).map_err(|e| format!("Could not merge OpenAPI spec: {}", e))?;

        let settings = rocket_okapi::settings::OpenApiSettings::default();
        rocket = rocket.mount(base_path, vec![get_openapi_route(openapi_docs, &settings)]);

        let openapi_url = join_base_path(base_path, "openapi.json");
        let swagger_config = SwaggerUIConfig {
            url: openapi_url,
            ..Default::default()
        };
        rocket = rocket.mount(join_base_path(base_path, "docs"), make_swagger_ui(&swagger_config));
    }

    Ok(rocket)
}

/// Manages the shared [`LoginGuard`] and starts its eviction task once the
/// runtime is up.
fn stage_login_guard(guard_config: config::LoginGuardConfig) -> AdHoc {
    AdHoc::on_ignite("Login Guard", move |rocket| {
        let guard = Arc::new(LoginGuard::new(&guard_config));
        guard.clone().spawn_cleanup_task();

        Box::pin(async move { rocket.manage(guard) })
    })
}

fn stage_hasher() -> AdHoc {
    AdHoc::try_on_ignite("Password Hasher", |rocket| async move {
        match Argon2Hasher::new() {
            Ok(hasher) => Ok(rocket.manage(hasher)),
            Err(e) => {
                tracing::error!("Failed to initialize password hasher: {:?}", e);
                Err(rocket)
            }
        }
    })
}

fn bootstrap_request(bootstrap: config::BootstrapConfig) -> Option<CreateUserRequest> {
    let (Some(email), Some(password)) = (bootstrap.email, bootstrap.password) else {
        return None;
    };
    Some(CreateUserRequest {
        name: bootstrap.name,
        email,
        password_confirm: password.clone(),
        password,
    })
}

/// Creates the configured bootstrap account. Must be attached after the pool
/// and the hasher are managed.
fn stage_bootstrap_user(bootstrap: config::BootstrapConfig) -> AdHoc {
    AdHoc::try_on_ignite("Bootstrap User", |rocket| async move {
        let Some(request) = bootstrap_request(bootstrap) else {
            return Ok(rocket);
        };
        let (Some(pool), Some(hasher)) = (rocket.state::<PgPool>(), rocket.state::<Argon2Hasher>()) else {
            tracing::error!("Bootstrap user needs the database pool and password hasher");
            return Err(rocket);
        };

        let repo = PostgresRepository { pool: pool.clone() };
        let result = UserService::new(&repo, hasher).ensure_user(&request).await;

        match result {
            Ok(true) => {
                tracing::info!(email = %request.email, "bootstrap user created");
                Ok(rocket)
            }
            Ok(false) => {
                tracing::debug!(email = %request.email, "bootstrap user already registered");
                Ok(rocket)
            }
            Err(e) => {
                tracing::error!("Failed to create bootstrap user: {:?}", e);
                Err(rocket)
            }
        }
    })
}

fn rocket_figment(server: &config::ServerConfig) -> rocket::figment::Figment {
    rocket::Config::figment()
        .merge(("port", server.port))
        .merge(("address", server.address.clone()))
}

pub fn build_rocket(config: Config) -> Result<Rocket<Build>, String> {
    init_tracing(&config.logging.level, config.logging.json_format);

    let cors = build_cors(&config.cors)?
        .to_cors()
        .map_err(|e| format!("Failed to create CORS fairing: {}", e))?;
    let base_path = normalize_base_path(&config.api.base_path);

    let mut rocket = rocket::custom(rocket_figment(&config.server))
        .attach(cors)
        .attach(RequestLogger)
        .attach(stage_db(config.database.clone()))
        .attach(stage_hasher())
        .attach(stage_bootstrap_user(config.bootstrap.clone()))
        .attach(stage_login_guard(config.login_guard.clone()));

    rocket = mount_api_routes(rocket, &base_path, config.api.enable_swagger)?;

    rocket = rocket.register(
        base_path.as_str(),
        catchers![
            app_routes::error::bad_request,
            app_routes::error::unauthorized,
            app_routes::error::not_found,
            app_routes::error::conflict,
            app_routes::error::unprocessable_entity,
            app_routes::error::internal_error
        ],
    );

    Ok(rocket.manage(config))
}
