use std::env;

use chrono::Duration;

/// Runtime configuration, read once at startup from the environment (with
/// `.env` loaded beforehand by the binary).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
    /// Cadence of the expired token/blacklist sweep, in seconds.
    pub token_sweep_interval_secs: u64,
    /// Cadence of the stale session sweep, in seconds.
    pub session_sweep_interval_secs: u64,
    /// Inactive sessions older than this are physically deleted.
    pub session_retention_days: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://doorman.db?mode=rwc".to_owned()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-in-production".to_owned()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_owned()),
            port: parse_env("PORT", 3000),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_owned()),
            access_ttl_minutes: parse_env("ACCESS_TOKEN_TTL_MINUTES", 15),
            refresh_ttl_days: parse_env("REFRESH_TOKEN_TTL_DAYS", 7),
            token_sweep_interval_secs: parse_env("TOKEN_SWEEP_INTERVAL_SECS", 86_400),
            session_sweep_interval_secs: parse_env("SESSION_SWEEP_INTERVAL_SECS", 86_400),
            session_retention_days: parse_env("SESSION_RETENTION_DAYS", 30),
        }
    }

    pub fn is_dev(&self) -> bool {
        self.environment != "production"
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_ttl_minutes)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.refresh_ttl_days)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
