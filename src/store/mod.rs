//! Persistence ports for the booking core.
//!
//! `BookingStore` serves the read-only projections and opens transactions;
//! `BookingTx` is one open transaction. Dropping a `BookingTx` without calling
//! `commit` rolls back every write made through it.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    InsertedOrder, Movie, MovieFilter, MoviePage, MovieUpdate, NewMovie, NewOrder, OrderHistory, SeatLabel, SeatState,
    ShowingSchedule,
};

pub mod postgres;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to decode stored value: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Backend(String),
}

/// Outcome of trying to mark one seat sold inside a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatClaim {
    /// No inventory row existed; one was created as sold.
    Inserted,
    /// An unsold inventory row existed and was moved to sold.
    Transitioned,
    /// The seat is already sold; nothing was written.
    AlreadySold,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn BookingTx>, StoreError>;

    /// Cinema the showing is screened in, `None` if the showing does not exist.
    async fn showing_cinema(&self, showing_id: i32) -> Result<Option<i32>, StoreError>;

    /// Every seat of `cinema_id` with its sold flag for `showing_id`.
    async fn seat_inventory(&self, showing_id: i32, cinema_id: i32) -> Result<Vec<SeatState>, StoreError>;

    /// Orders of `user_id`, newest first.
    async fn order_history(&self, user_id: i32) -> Result<Vec<OrderHistory>, StoreError>;
}

#[async_trait]
pub trait BookingTx: Send {
    async fn user_exists(&mut self, user_id: i32) -> Result<bool, StoreError>;

    async fn showing_cinema(&mut self, showing_id: i32) -> Result<Option<i32>, StoreError>;

    async fn payment_method_exists(&mut self, payment_id: i32) -> Result<bool, StoreError>;

    /// Seat id for `label` within `cinema_id`.
    async fn resolve_seat(&mut self, cinema_id: i32, label: &SeatLabel) -> Result<Option<i32>, StoreError>;

    async fn insert_order(&mut self, order: &NewOrder) -> Result<InsertedOrder, StoreError>;

    async fn insert_ticket(&mut self, qr_code: &str) -> Result<i32, StoreError>;

    async fn link_order_ticket(&mut self, order_id: i32, ticket_id: i32) -> Result<(), StoreError>;

    /// Atomically mark `(showing_id, seat_id)` sold to `user_id` unless it is
    /// sold already. Two transactions can never both see a claim succeed.
    async fn claim_seat(&mut self, showing_id: i32, seat_id: i32, user_id: i32) -> Result<SeatClaim, StoreError>;

    async fn attach_seat(&mut self, order_id: i32, seat_id: i32) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Movie records behind the cached catalog views.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_movies(&self) -> Result<Vec<Movie>, StoreError>;

    /// Highest rated first, unrated last.
    async fn popular_movies(&self) -> Result<Vec<Movie>, StoreError>;

    /// Movies released after `today`, soonest first.
    async fn upcoming_movies(&self, today: NaiveDate) -> Result<Vec<Movie>, StoreError>;

    async fn movie(&self, movie_id: i32) -> Result<Option<Movie>, StoreError>;

    /// Case-insensitive title substring match and genre overlap, newest
    /// release first, one page at a time. `total` counts every match.
    async fn filter_movies(&self, filter: &MovieFilter) -> Result<MoviePage, StoreError>;

    /// Screenings of a movie ordered by date and time.
    async fn movie_schedule(&self, movie_id: i32) -> Result<Vec<ShowingSchedule>, StoreError>;

    async fn insert_movie(&self, movie: &NewMovie) -> Result<Movie, StoreError>;

    async fn update_movie(&self, movie_id: i32, update: &MovieUpdate) -> Result<Option<Movie>, StoreError>;

    /// Returns false when no live movie has this id.
    async fn soft_delete_movie(&self, movie_id: i32) -> Result<bool, StoreError>;
}
