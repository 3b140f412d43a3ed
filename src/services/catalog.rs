//! Movie catalog: cached listings for readers, cache-evicting writes for
//! admins. Every write evicts the affected keys before it returns, so the next
//! read after a successful write is recomputed.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::cache::{movie_detail_key, CacheService, ALL_MOVIES_KEY, POPULAR_MOVIES_KEY, UPCOMING_MOVIES_KEY};
use crate::config::CacheConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Movie, MovieFilter, MovieFilterQuery, MoviePage, MovieUpdate, NewMovie, ShowingSchedule};
use crate::store::CatalogStore;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    cache: CacheService,
    ttl: CacheConfig,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, cache: CacheService, ttl: CacheConfig) -> Self {
        Self { store, cache, ttl }
    }

    // Прогрев кеша при старте
    pub async fn warmup(&self) {
        info!("Starting cache warmup...");
        if let Err(e) = self.all_movies().await {
            warn!("warmup of {} failed: {}", ALL_MOVIES_KEY, e);
        }
        if let Err(e) = self.popular_movies().await {
            warn!("warmup of {} failed: {}", POPULAR_MOVIES_KEY, e);
        }
        if let Err(e) = self.upcoming_movies().await {
            warn!("warmup of {} failed: {}", UPCOMING_MOVIES_KEY, e);
        }
        info!("Cache warmup done");
    }

    pub async fn all_movies(&self) -> AppResult<Vec<Movie>> {
        self.cache
            .get_or_load(ALL_MOVIES_KEY, self.ttl.all_movies_ttl(), || async {
                Ok(self.store.list_movies().await?)
            })
            .await
    }

    pub async fn popular_movies(&self) -> AppResult<Vec<Movie>> {
        self.cache
            .get_or_load(POPULAR_MOVIES_KEY, self.ttl.popular_movies_ttl(), || async {
                Ok(self.store.popular_movies().await?)
            })
            .await
    }

    pub async fn upcoming_movies(&self) -> AppResult<Vec<Movie>> {
        let today = Utc::now().date_naive();
        self.cache
            .get_or_load(UPCOMING_MOVIES_KEY, self.ttl.upcoming_movies_ttl(), || async move {
                Ok(self.store.upcoming_movies(today).await?)
            })
            .await
    }

    pub async fn movie(&self, movie_id: i32) -> AppResult<Movie> {
        let key = movie_detail_key(movie_id);
        if let Some(movie) = self.cache.read::<Movie>(&key).await {
            return Ok(movie);
        }
        let movie = self
            .store
            .movie(movie_id)
            .await?
            .ok_or(AppError::MovieNotFound)?;
        self.cache.write(&key, &movie, self.ttl.movie_detail_ttl()).await;
        Ok(movie)
    }

    /// Filtered listing; not cached since the key space is unbounded.
    pub async fn filter_movies(&self, query: MovieFilterQuery) -> AppResult<MoviePage> {
        let filter = MovieFilter::from(query);
        Ok(self.store.filter_movies(&filter).await?)
    }

    /// Screenings of a live movie. A movie with nothing scheduled yields an
    /// empty list.
    pub async fn schedule(&self, movie_id: i32) -> AppResult<Vec<ShowingSchedule>> {
        self.movie(movie_id).await?;
        Ok(self.store.movie_schedule(movie_id).await?)
    }

    pub async fn create_movie(&self, input: NewMovie) -> AppResult<Movie> {
        input.validate()?;
        let movie = self.store.insert_movie(&input).await?;
        self.evict(movie.id).await?;
        info!(movie_id = movie.id, "movie created");
        Ok(movie)
    }

    pub async fn update_movie(&self, movie_id: i32, update: MovieUpdate) -> AppResult<Movie> {
        if update.is_empty() {
            return Err(AppError::Validation("no fields to update".to_string()));
        }
        update.validate()?;
        let movie = self
            .store
            .update_movie(movie_id, &update)
            .await?
            .ok_or(AppError::MovieNotFound)?;
        self.evict(movie_id).await?;
        info!(movie_id, "movie updated");
        Ok(movie)
    }

    pub async fn delete_movie(&self, movie_id: i32) -> AppResult<()> {
        if !self.store.soft_delete_movie(movie_id).await? {
            return Err(AppError::MovieNotFound);
        }
        self.evict(movie_id).await?;
        info!(movie_id, "movie deleted");
        Ok(())
    }

    async fn evict(&self, movie_id: i32) -> AppResult<()> {
        self.cache.invalidate_movie(movie_id).await.map_err(|e| {
            AppError::Internal(format!(
                "catalog changed but cache invalidation failed for movie {}: {}",
                movie_id, e
            ))
        })
    }
}
