//! Fixtures shared by the integration tests.

use chrono::{NaiveDate, NaiveTime, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;

use crate::cache::{memory::MemoryCache, CacheService};
use crate::config::{AppConfig, CacheConfig, Config, DatabaseConfig, JwtConfig, OrdersConfig, RedisConfig};
use crate::middleware::Claims;
use crate::models::NewMovie;
use crate::store::memory::MemoryStore;
use crate::AppState;

pub const JWT_SECRET: &str = "test-secret";

pub const CINEMA_ID: i32 = 3;
pub const EMPTY_CINEMA_ID: i32 = 4;
pub const SHOWING_ID: i32 = 10;
pub const EMPTY_SHOWING_ID: i32 = 11;
pub const USER_ID: i32 = 7;
pub const OTHER_USER_ID: i32 = 8;
pub const PAYMENT_ID: i32 = 1;
pub const LOCATION_ID: i32 = 2;

pub fn test_config() -> Config {
    Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            rust_log: "cinema_tickets=debug".to_string(),
            log_format: "plain".to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://localhost/unused".to_string(),
            pool_size: 1,
            acquire_timeout_secs: 1,
        },
        redis: RedisConfig {
            url: "redis://127.0.0.1:6379".to_string(),
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        cache: CacheConfig {
            all_movies_ttl_secs: 900,
            popular_movies_ttl_secs: 600,
            upcoming_movies_ttl_secs: 86400,
            movie_detail_ttl_secs: 900,
            invalidate_attempts: 3,
        },
        orders: OrdersConfig {
            transaction_timeout_ms: 5000,
            lock_timeout_ms: 2000,
        },
    }
}

pub fn issue_token(user_id: i32, role: &str) -> String {
    let claims = Claims {
        id: user_id,
        role: role.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token encodes")
}

pub fn sample_movie(title: &str) -> NewMovie {
    NewMovie {
        title: title.to_string(),
        synopsis: format!("{} synopsis", title),
        director_name: "Some Director".to_string(),
        duration_minutes: 120,
        release_date: NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date"),
        rating: Some(7.5),
        poster_image: None,
        genres: vec!["Drama".to_string()],
    }
}

/// Cinema 3 has seats A1..A5 and F1..F10; showing 10 screens there.
/// Cinema 4 has no seats; showing 11 screens there, an hour later.
/// Both cinemas are in location 2.
/// Users 7 and 8 and payment method 1 exist.
pub async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.add_user(USER_ID).await;
    store.add_user(OTHER_USER_ID).await;
    store.add_payment_method(PAYMENT_ID).await;
    store.add_cinema(CINEMA_ID, "Grand Hall").await;
    store.add_cinema(EMPTY_CINEMA_ID, "Studio").await;
    store.add_location(LOCATION_ID, "Downtown").await;
    store.add_seat_row(CINEMA_ID, "A", 1..=5).await;
    store.add_seat_row(CINEMA_ID, "F", 1..=10).await;

    let movie = store.add_movie(&sample_movie("Arrival")).await;
    let date = NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date");
    let time = NaiveTime::from_hms_opt(19, 30, 0).expect("valid time");
    let later = NaiveTime::from_hms_opt(20, 30, 0).expect("valid time");
    store.add_showing(SHOWING_ID, movie.id, CINEMA_ID, LOCATION_ID, date, time).await;
    store.add_showing(EMPTY_SHOWING_ID, movie.id, EMPTY_CINEMA_ID, LOCATION_ID, date, later).await;
    store
}

/// Application state over the in-memory store and cache.
pub fn memory_state(store: &MemoryStore, cache: &MemoryCache) -> Arc<AppState> {
    let config = test_config();
    let cache = CacheService::new(Arc::new(cache.clone()), config.cache.invalidate_attempts);
    AppState::from_parts(config, Arc::new(store.clone()), Arc::new(store.clone()), cache)
}
