pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

#[cfg(feature = "test-support")]
pub mod testing;

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::task;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::cache::{redis::RedisCacheStore, CacheService};
use crate::services::{CatalogService, OrderHistoryProjector, OrderTransaction, SeatAvailabilityResolver};
use crate::store::{BookingStore, CatalogStore};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub seats: SeatAvailabilityResolver,
    pub orders: OrderTransaction,
    pub history: OrderHistoryProjector,
    pub catalog: CatalogService,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database, config.orders.lock_timeout()).await?;
        info!("Database connected");

        db.run_migrations().await?;
        info!("Migrations applied");

        // Без Redis работаем без кеша
        let cache = match redis_client::RedisClient::new(&config.redis.url).await {
            Ok(redis) => {
                info!("Redis connected");
                CacheService::new(
                    Arc::new(RedisCacheStore::new(redis)),
                    config.cache.invalidate_attempts,
                )
            }
            Err(e) => {
                error!("Redis unavailable, caching disabled: {}", e);
                CacheService::disabled()
            }
        };

        let db = Arc::new(db);
        let state = Self::from_parts(config, db.clone(), db, cache);

        let state_for_bg = state.clone();
        task::spawn(async move {
            // Warmup cache в фоне
            state_for_bg.catalog.warmup().await;
        });

        Ok(state)
    }

    /// Wires the services over arbitrary store and cache backends.
    pub fn from_parts(
        config: config::Config,
        booking: Arc<dyn BookingStore>,
        catalog: Arc<dyn CatalogStore>,
        cache: CacheService,
    ) -> Arc<Self> {
        let seats = SeatAvailabilityResolver::new(booking.clone());
        let orders = OrderTransaction::new(booking.clone(), config.orders.transaction_timeout());
        let history = OrderHistoryProjector::new(booking);
        let catalog = CatalogService::new(catalog, cache, config.cache.clone());
        Arc::new(Self {
            config,
            seats,
            orders,
            history,
            catalog,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
