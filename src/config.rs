use tracing::debug;

use crate::session::TokenConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";
const DEFAULT_EXPIRATION_DAYS: i64 = 365;
const DEFAULT_EVENT_BUS_CAPACITY: usize = 1000;

/// Process configuration, read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Postgres connection string; the in-memory repository is used when unset
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub session_expiration_days: i64,
    pub event_bus_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't touch the process env
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            jwt_secret: lookup("JWT_SECRET").unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string()),
            session_expiration_days: lookup("SESSION_EXPIRATION_DAYS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_EXPIRATION_DAYS),
            event_bus_capacity: lookup("EVENT_BUS_CAPACITY")
                .and_then(|s| s.parse().ok())
                .filter(|capacity| *capacity > 0)
                .unwrap_or(DEFAULT_EVENT_BUS_CAPACITY),
        };

        debug!(
            bind_addr = %config.bind_addr,
            postgres = config.database_url.is_some(),
            session_expiration_days = config.session_expiration_days,
            "Loaded configuration"
        );

        config
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig::with_secret(self.jwt_secret.clone(), self.session_expiration_days)
    }
}
