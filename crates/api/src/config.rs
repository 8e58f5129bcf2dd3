use crate::auth::jwt::JwtConfig;

/// Runtime configuration, read once at startup.
///
/// Every knob comes from the environment with a local-development
/// default, so `cargo run` works against a fresh checkout.
///
/// | Env var                | Default                 |
/// |------------------------|-------------------------|
/// | `HOST`                 | `0.0.0.0`               |
/// | `PORT`                 | `3000`                  |
/// | `CORS_ORIGINS`         | `http://localhost:5173` |
/// | `DB_MAX_CONNECTIONS`   | `10`                    |
/// | `REQUEST_TIMEOUT_SECS` | `30`                    |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Comma-separated list in `CORS_ORIGINS`, split and trimmed.
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

impl ServerConfig {
    /// Panics when a variable is present but unparseable; a typo'd
    /// `PORT` should stop the process, not fall back silently.
    pub fn from_env() -> Self {
        let cors_origins = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_or("PORT", "3000")
                .parse()
                .expect("PORT must be a valid u16"),
            cors_origins,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", "10")
                .parse()
                .expect("DB_MAX_CONNECTIONS must be a valid u32"),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", "30")
                .parse()
                .expect("REQUEST_TIMEOUT_SECS must be a valid u64"),
            jwt: JwtConfig::from_env(),
        }
    }
}
