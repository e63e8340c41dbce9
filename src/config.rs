use rocket::figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_PATH: &str = "/api";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub login_guard: LoginGuardConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,
    pub acquire_timeout: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_path: String,
    pub enable_swagger: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    pub ttl_seconds: i64,
}

/// Thresholds for the per-identity login throttle.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoginGuardConfig {
    /// Consecutive failures after which further attempts are rejected.
    pub lockout_attempts: u32,
    pub lockout_duration_minutes: i64,
    /// How often idle attempt records are evicted.
    pub cleanup_interval_seconds: u64,
}

/// Account created at startup when its email is not registered yet. Creating
/// users requires a session, so this is how a fresh database gets its first login.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BootstrapConfig {
    pub name: String,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/storefront".to_string(),
            max_connections: 16,
            min_connections: 4,
            connection_timeout: 5,
            acquire_timeout: 5,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            address: "127.0.0.1".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allow_credentials: true,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_API_BASE_PATH.to_string(),
            enable_swagger: true,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_seconds: 86_400 }
    }
}

impl Default for LoginGuardConfig {
    fn default() -> Self {
        Self {
            lockout_attempts: 5,
            lockout_duration_minutes: 30,
            cleanup_interval_seconds: 300,
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            name: "Administrator".to_string(),
            email: None,
            password: None,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. Compiled defaults
    /// 2. Storefront.toml (base configuration file)
    /// 3. Environment variables (prefixed with STOREFRONT_)
    /// 4. DATABASE_URL environment variable
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file("Storefront.toml").nested())
            // e.g. STOREFRONT_SERVER__PORT, STOREFRONT_LOGIN_GUARD__LOCKOUT_ATTEMPTS
            .merge(Env::prefixed("STOREFRONT_").split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.url".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_login_guard_thresholds() {
        let config = Config::default();
        assert_eq!(config.login_guard.lockout_attempts, 5);
        assert_eq!(config.login_guard.lockout_duration_minutes, 30);
        assert_eq!(config.api.base_path, "/api");
    }

    #[test]
    fn env_overrides_file_and_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Storefront.toml",
                r#"
                [default.server]
                port = 9000
                address = "0.0.0.0"

                [default.login_guard]
                lockout_attempts = 3
                lockout_duration_minutes = 10
                cleanup_interval_seconds = 60
                "#,
            )?;
            jail.set_env("STOREFRONT_SERVER__PORT", "9100");
            jail.set_env("DATABASE_URL", "postgres://db.internal/shop");

            let config = Config::load()?;
            assert_eq!(config.server.port, 9100);
            assert_eq!(config.server.address, "0.0.0.0");
            assert_eq!(config.login_guard.lockout_attempts, 3);
            assert_eq!(config.database.url, "postgres://db.internal/shop");
            assert_eq!(config.logging.level, "info");
            Ok(())
        });
    }

    #[test]
    fn bootstrap_account_is_off_unless_configured() {
        Jail::expect_with(|jail| {
            let config = Config::load()?;
            assert_eq!(config.bootstrap.email, None);
            assert_eq!(config.bootstrap.password, None);

            jail.set_env("STOREFRONT_BOOTSTRAP__EMAIL", "admin@shop.test");
            jail.set_env("STOREFRONT_BOOTSTRAP__PASSWORD", "change-me");

            let config = Config::load()?;
            assert_eq!(config.bootstrap.name, "Administrator");
            assert_eq!(config.bootstrap.email.as_deref(), Some("admin@shop.test"));
            assert_eq!(config.bootstrap.password.as_deref(), Some("change-me"));
            Ok(())
        });
    }
}
