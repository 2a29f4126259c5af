use std::env;

use anyhow::Context;

use crate::domain::pricing::PricingConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub cors_origin: Option<String>,
    pub pricing: PricingConfig,
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let defaults = PricingConfig::default();
        let pricing = PricingConfig {
            tax_rate_bps: parse_or("TAX_RATE_BPS", defaults.tax_rate_bps),
            shipping_flat: parse_or("SHIPPING_FLAT", defaults.shipping_flat),
            free_shipping_threshold: parse_or(
                "FREE_SHIPPING_THRESHOLD",
                defaults.free_shipping_threshold,
            ),
        };
        Ok(Self {
            port: parse_or("APP_PORT", 3000),
            database_url,
            host,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10),
            jwt_secret,
            jwt_ttl_hours: parse_or("JWT_TTL_HOURS", 24),
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|s| !s.is_empty()),
            pricing,
        })
    }

    /// Configuration for tests and tools that never open a socket.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: String::new(),
            host: "127.0.0.1".into(),
            port: 0,
            db_max_connections: 1,
            jwt_secret: jwt_secret.to_string(),
            jwt_ttl_hours: 1,
            cors_origin: None,
            pricing: PricingConfig::default(),
        }
    }
}
