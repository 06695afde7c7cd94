use std::env;
use std::time::Duration;

/// Account created at startup when no user holds its email yet.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// In-process store when unset.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// Listing cache and rate limiting are disabled when unset.
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub bcrypt_cost: u32,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub group_cache_ttl_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub admin: Option<AdminBootstrap>,
    pub notify_webhook_url: Option<String>,
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    optional(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let jwt_expiration = optional("JWT_EXPIRATION")
            .and_then(|v| v.trim_end_matches('h').parse::<u64>().ok())
            .unwrap_or(24);

        let admin = match (optional("ADMIN_EMAIL"), optional("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                email,
                password,
                name: optional("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
            }),
            _ => None,
        };

        Ok(Config {
            database_url: optional("DATABASE_URL"),
            database_max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 10),
            redis_url: optional("REDIS_URL"),
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiration_secs: jwt_expiration * 3600,
            bcrypt_cost: parsed_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
            rate_limit_window_secs: parsed_or("RATE_LIMIT_WINDOW", 60),
            rate_limit_requests: parsed_or("RATE_LIMIT_REQUESTS", 100),
            group_cache_ttl_secs: parsed_or("GROUP_CACHE_TTL", 600),
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parsed_or("SERVER_PORT", 5000),
            api_base_uri: optional("API_BASE_URI").unwrap_or_else(|| "/api".to_string()),
            admin,
            notify_webhook_url: optional("NOTIFY_WEBHOOK_URL"),
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}
