use serde::Deserialize;
use std::time::Duration;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub cache: CacheConfig,
    pub orders: OrdersConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// `plain` or `json`.
    pub log_format: String,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_secs: u64,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// Настройки JWT
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

/// TTLs for the cached catalog views, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub all_movies_ttl_secs: u64,
    pub popular_movies_ttl_secs: u64,
    pub upcoming_movies_ttl_secs: u64,
    pub movie_detail_ttl_secs: u64,
    pub invalidate_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrdersConfig {
    pub transaction_timeout_ms: u64,
    pub lock_timeout_ms: u64,
}

impl Config {
    /// Defaults layered under environment variables, `__` separating sections
    /// (`DATABASE__URL`, `ORDERS__TRANSACTION_TIMEOUT_MS`, ...).
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000)?
            .set_default("app.environment", "development")?
            .set_default("app.rust_log", "cinema_tickets=debug,tower_http=debug")?
            .set_default("app.log_format", "plain")?
            .set_default("database.pool_size", 20)?
            .set_default("database.acquire_timeout_secs", 5)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("cache.all_movies_ttl_secs", 900)?
            .set_default("cache.popular_movies_ttl_secs", 600)?
            .set_default("cache.upcoming_movies_ttl_secs", 86_400)?
            .set_default("cache.movie_detail_ttl_secs", 900)?
            .set_default("cache.invalidate_attempts", 3)?
            .set_default("orders.transaction_timeout_ms", 5_000)?
            .set_default("orders.lock_timeout_ms", 2_000)?
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl CacheConfig {
    pub fn all_movies_ttl(&self) -> Duration {
        Duration::from_secs(self.all_movies_ttl_secs)
    }

    pub fn popular_movies_ttl(&self) -> Duration {
        Duration::from_secs(self.popular_movies_ttl_secs)
    }

    pub fn upcoming_movies_ttl(&self) -> Duration {
        Duration::from_secs(self.upcoming_movies_ttl_secs)
    }

    pub fn movie_detail_ttl(&self) -> Duration {
        Duration::from_secs(self.movie_detail_ttl_secs)
    }
}

impl OrdersConfig {
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
