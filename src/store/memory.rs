//! In-memory adapter used by the test suite.
//!
//! A transaction holds the store's mutex for its whole lifetime and works on a
//! staged copy of the state, so transactions are fully serialized and a
//! dropped transaction leaves no trace.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{BookingStore, BookingTx, CatalogStore, SeatClaim, StoreError};
use crate::models::{
    HistorySeat, InsertedOrder, Movie, MovieFilter, MoviePage, MovieUpdate, NewMovie, NewOrder, OrderHistory,
    SeatLabel, SeatState, ShowingSchedule,
};

/// Transaction step at which an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    InsertOrder,
    InsertTicket,
    LinkTicket,
    ClaimSeat,
    AttachSeat,
    Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeatStatus {
    Available,
    Sold,
}

#[derive(Debug, Clone)]
struct SeatRow {
    cinema_id: i32,
    row: String,
    number: i32,
}

#[derive(Debug, Clone)]
struct ShowingRow {
    movie_id: i32,
    cinema_id: i32,
    location_id: i32,
    date: NaiveDate,
    time: NaiveTime,
}

#[derive(Debug, Clone)]
struct ShowingSeatRow {
    status: SeatStatus,
    user_id: Option<i32>,
}

#[derive(Debug, Clone)]
struct OrderRow {
    order: NewOrder,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct MovieRow {
    movie: Movie,
    deleted: bool,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeSet<i32>,
    payments: BTreeSet<i32>,
    cinemas: BTreeMap<i32, String>,
    locations: BTreeMap<i32, String>,
    seats: BTreeMap<i32, SeatRow>,
    showings: BTreeMap<i32, ShowingRow>,
    showing_seats: BTreeMap<(i32, i32), ShowingSeatRow>,
    orders: BTreeMap<i32, OrderRow>,
    tickets: BTreeMap<i32, String>,
    order_tickets: Vec<(i32, i32)>,
    order_seats: Vec<(i32, i32)>,
    movies: BTreeMap<i32, MovieRow>,
}

impl MemoryState {
    fn next_id<V>(map: &BTreeMap<i32, V>) -> i32 {
        map.keys().next_back().map_or(1, |id| id + 1)
    }

    fn find_seat(&self, cinema_id: i32, label: &SeatLabel) -> Option<i32> {
        self.seats
            .iter()
            .find(|(_, s)| s.cinema_id == cinema_id && s.row == label.row() && s.number == label.number())
            .map(|(id, _)| *id)
    }

    fn live_movies(&self) -> Vec<Movie> {
        self.movies
            .values()
            .filter(|m| !m.deleted)
            .map(|m| m.movie.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
struct Faults {
    fail_at: Option<FailPoint>,
    claim_delay: Option<Duration>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<std::sync::Mutex<Faults>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Наполнение ===

    pub async fn add_user(&self, user_id: i32) {
        self.state.lock().await.users.insert(user_id);
    }

    pub async fn add_payment_method(&self, payment_id: i32) {
        self.state.lock().await.payments.insert(payment_id);
    }

    pub async fn add_cinema(&self, cinema_id: i32, name: &str) {
        self.state.lock().await.cinemas.insert(cinema_id, name.to_string());
    }

    pub async fn add_location(&self, location_id: i32, name: &str) {
        self.state.lock().await.locations.insert(location_id, name.to_string());
    }

    /// Seeds seats `row{n}` for every `n` in `numbers`.
    pub async fn add_seat_row(&self, cinema_id: i32, row: &str, numbers: RangeInclusive<i32>) {
        let mut state = self.state.lock().await;
        for number in numbers {
            let id = MemoryState::next_id(&state.seats);
            state.seats.insert(
                id,
                SeatRow { cinema_id, row: row.to_string(), number },
            );
        }
    }

    pub async fn add_movie(&self, movie: &NewMovie) -> Movie {
        let mut state = self.state.lock().await;
        insert_movie(&mut state, movie)
    }

    pub async fn add_showing(
        &self,
        showing_id: i32,
        movie_id: i32,
        cinema_id: i32,
        location_id: i32,
        date: NaiveDate,
        time: NaiveTime,
    ) {
        self.state.lock().await.showings.insert(
            showing_id,
            ShowingRow { movie_id, cinema_id, location_id, date, time },
        );
    }

    /// Materializes an unsold inventory row, as left behind by older data.
    pub async fn add_available_row(&self, showing_id: i32, label: &SeatLabel) {
        let mut state = self.state.lock().await;
        let Some(cinema_id) = state.showings.get(&showing_id).map(|s| s.cinema_id) else {
            return;
        };
        if let Some(seat_id) = state.find_seat(cinema_id, label) {
            state.showing_seats.insert(
                (showing_id, seat_id),
                ShowingSeatRow { status: SeatStatus::Available, user_id: None },
            );
        }
    }

    // === Сбои ===

    pub fn fail_at(&self, point: FailPoint) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.fail_at = Some(point);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            *faults = Faults::default();
        }
    }

    /// Every seat claim sleeps this long while the transaction is open.
    pub fn delay_claims(&self, delay: Duration) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.claim_delay = Some(delay);
        }
    }

    // === Проверки для тестов ===

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    pub async fn ticket_count(&self) -> usize {
        self.state.lock().await.tickets.len()
    }

    pub async fn order_ticket_count(&self) -> usize {
        self.state.lock().await.order_tickets.len()
    }

    pub async fn inventory_row_count(&self) -> usize {
        self.state.lock().await.showing_seats.len()
    }

    /// Buyer of the seat for the showing, if it is sold.
    pub async fn seat_owner(&self, showing_id: i32, label: &str) -> Option<i32> {
        let label: SeatLabel = label.parse().ok()?;
        let state = self.state.lock().await;
        let cinema_id = state.showings.get(&showing_id)?.cinema_id;
        let seat_id = state.find_seat(cinema_id, &label)?;
        state
            .showing_seats
            .get(&(showing_id, seat_id))
            .filter(|row| row.status == SeatStatus::Sold)
            .and_then(|row| row.user_id)
    }

    fn faults(&self) -> Faults {
        self.faults.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

fn insert_movie(state: &mut MemoryState, movie: &NewMovie) -> Movie {
    let id = MemoryState::next_id(&state.movies);
    let created = Movie {
        id,
        title: movie.title.clone(),
        synopsis: movie.synopsis.clone(),
        director_name: movie.director_name.clone(),
        duration_minutes: movie.duration_minutes,
        release_date: movie.release_date,
        rating: movie.rating,
        poster_image: movie.poster_image.clone(),
        genres: movie.genres.clone(),
    };
    state.movies.insert(id, MovieRow { movie: created.clone(), deleted: false });
    created
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    faults: Faults,
}

impl MemoryTx {
    fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        if self.faults.fail_at == Some(point) {
            return Err(StoreError::Backend(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn BookingTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = (*guard).clone();
        Ok(Box::new(MemoryTx { guard, staged, faults: self.faults() }))
    }

    async fn showing_cinema(&self, showing_id: i32) -> Result<Option<i32>, StoreError> {
        Ok(self.state.lock().await.showings.get(&showing_id).map(|s| s.cinema_id))
    }

    async fn seat_inventory(&self, showing_id: i32, cinema_id: i32) -> Result<Vec<SeatState>, StoreError> {
        let state = self.state.lock().await;
        let mut seats: Vec<SeatState> = state
            .seats
            .iter()
            .filter(|(_, s)| s.cinema_id == cinema_id)
            .map(|(id, s)| SeatState {
                seat_id: *id,
                seat_row: s.row.clone(),
                seat_number: s.number,
                is_sold: state
                    .showing_seats
                    .get(&(showing_id, *id))
                    .is_some_and(|row| row.status == SeatStatus::Sold),
            })
            .collect();
        seats.sort_by(|a, b| (&a.seat_row, a.seat_number).cmp(&(&b.seat_row, b.seat_number)));
        Ok(seats)
    }

    async fn order_history(&self, user_id: i32) -> Result<Vec<OrderHistory>, StoreError> {
        let state = self.state.lock().await;
        let mut history = Vec::new();
        for (order_id, row) in state.orders.iter().filter(|(_, o)| o.order.user_id == user_id) {
            let Some(showing) = state.showings.get(&row.order.showing_id) else { continue };
            let Some(movie) = state.movies.get(&showing.movie_id) else { continue };
            let Some(cinema_name) = state.cinemas.get(&showing.cinema_id) else { continue };
            let Some(qr_code) = state
                .order_tickets
                .iter()
                .find(|(o, _)| o == order_id)
                .and_then(|(_, t)| state.tickets.get(t))
            else {
                continue;
            };
            let mut seats: Vec<HistorySeat> = state
                .order_seats
                .iter()
                .filter(|(o, _)| o == order_id)
                .filter_map(|(_, seat_id)| state.seats.get(seat_id))
                .map(|s| HistorySeat { row: s.row.clone(), seat_number: s.number })
                .collect();
            if seats.is_empty() {
                continue;
            }
            seats.sort_by(|a, b| (&a.row, a.seat_number).cmp(&(&b.row, b.seat_number)));

            history.push(OrderHistory {
                id: *order_id,
                users_id: row.order.user_id,
                price: row.order.price,
                payment_id: row.order.payment_id,
                is_paid: false,
                created_at: row.created_at,
                now_showing_id: row.order.showing_id,
                movie_title: movie.movie.title.clone(),
                show_date: showing.date,
                show_time: showing.time,
                cinema_name: cinema_name.clone(),
                seats,
                qr_code: qr_code.clone(),
            });
        }
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(history)
    }
}

#[async_trait]
impl BookingTx for MemoryTx {
    async fn user_exists(&mut self, user_id: i32) -> Result<bool, StoreError> {
        Ok(self.staged.users.contains(&user_id))
    }

    async fn showing_cinema(&mut self, showing_id: i32) -> Result<Option<i32>, StoreError> {
        Ok(self.staged.showings.get(&showing_id).map(|s| s.cinema_id))
    }

    async fn payment_method_exists(&mut self, payment_id: i32) -> Result<bool, StoreError> {
        Ok(self.staged.payments.contains(&payment_id))
    }

    async fn resolve_seat(&mut self, cinema_id: i32, label: &SeatLabel) -> Result<Option<i32>, StoreError> {
        Ok(self.staged.find_seat(cinema_id, label))
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<InsertedOrder, StoreError> {
        self.check(FailPoint::InsertOrder)?;
        let id = MemoryState::next_id(&self.staged.orders);
        let created_at = Utc::now();
        self.staged.orders.insert(id, OrderRow { order: order.clone(), created_at });
        Ok(InsertedOrder { id, created_at })
    }

    async fn insert_ticket(&mut self, qr_code: &str) -> Result<i32, StoreError> {
        self.check(FailPoint::InsertTicket)?;
        if self.staged.tickets.values().any(|t| t == qr_code) {
            return Err(StoreError::Backend("duplicate ticket qr_code".to_string()));
        }
        let id = MemoryState::next_id(&self.staged.tickets);
        self.staged.tickets.insert(id, qr_code.to_string());
        Ok(id)
    }

    async fn link_order_ticket(&mut self, order_id: i32, ticket_id: i32) -> Result<(), StoreError> {
        self.check(FailPoint::LinkTicket)?;
        self.staged.order_tickets.push((order_id, ticket_id));
        Ok(())
    }

    async fn claim_seat(&mut self, showing_id: i32, seat_id: i32, user_id: i32) -> Result<SeatClaim, StoreError> {
        if let Some(delay) = self.faults.claim_delay {
            tokio::time::sleep(delay).await;
        }
        self.check(FailPoint::ClaimSeat)?;
        match self.staged.showing_seats.get_mut(&(showing_id, seat_id)) {
            Some(row) if row.status == SeatStatus::Sold => Ok(SeatClaim::AlreadySold),
            Some(row) => {
                row.status = SeatStatus::Sold;
                row.user_id = Some(user_id);
                Ok(SeatClaim::Transitioned)
            }
            None => {
                self.staged.showing_seats.insert(
                    (showing_id, seat_id),
                    ShowingSeatRow { status: SeatStatus::Sold, user_id: Some(user_id) },
                );
                Ok(SeatClaim::Inserted)
            }
        }
    }

    async fn attach_seat(&mut self, order_id: i32, seat_id: i32) -> Result<(), StoreError> {
        self.check(FailPoint::AttachSeat)?;
        self.staged.order_seats.push((order_id, seat_id));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.check(FailPoint::Commit)?;
        let MemoryTx { mut guard, staged, .. } = *self;
        *guard = staged;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_movies(&self) -> Result<Vec<Movie>, StoreError> {
        Ok(self.state.lock().await.live_movies())
    }

    async fn popular_movies(&self) -> Result<Vec<Movie>, StoreError> {
        let mut movies = self.state.lock().await.live_movies();
        movies.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        Ok(movies)
    }

    async fn upcoming_movies(&self, today: NaiveDate) -> Result<Vec<Movie>, StoreError> {
        let mut movies: Vec<Movie> = self
            .state
            .lock()
            .await
            .live_movies()
            .into_iter()
            .filter(|m| m.release_date > today)
            .collect();
        movies.sort_by(|a, b| a.release_date.cmp(&b.release_date).then(a.id.cmp(&b.id)));
        Ok(movies)
    }

    async fn movie(&self, movie_id: i32) -> Result<Option<Movie>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .movies
            .get(&movie_id)
            .filter(|m| !m.deleted)
            .map(|m| m.movie.clone()))
    }

    async fn filter_movies(&self, filter: &MovieFilter) -> Result<MoviePage, StoreError> {
        let needle = filter.title.as_ref().map(|t| t.to_lowercase());
        let mut matches: Vec<Movie> = self
            .state
            .lock()
            .await
            .live_movies()
            .into_iter()
            .filter(|m| needle.as_ref().map_or(true, |n| m.title.to_lowercase().contains(n)))
            .filter(|m| filter.genres.is_empty() || m.genres.iter().any(|g| filter.genres.contains(g)))
            .collect();
        matches.sort_by(|a, b| b.release_date.cmp(&a.release_date).then(a.id.cmp(&b.id)));

        let total = matches.len() as i64;
        let movies = matches
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit as usize)
            .collect();
        Ok(MoviePage { movies, total, page: filter.page, limit: filter.limit })
    }

    async fn movie_schedule(&self, movie_id: i32) -> Result<Vec<ShowingSchedule>, StoreError> {
        let state = self.state.lock().await;
        let Some(movie) = state.movies.get(&movie_id).filter(|m| !m.deleted) else {
            return Ok(Vec::new());
        };
        let mut schedule: Vec<ShowingSchedule> = state
            .showings
            .iter()
            .filter(|(_, s)| s.movie_id == movie_id)
            .filter_map(|(id, s)| {
                Some(ShowingSchedule {
                    id: *id,
                    movie_id,
                    movie_title: movie.movie.title.clone(),
                    cinema_id: s.cinema_id,
                    cinema_name: state.cinemas.get(&s.cinema_id)?.clone(),
                    location_id: s.location_id,
                    location_name: state.locations.get(&s.location_id)?.clone(),
                    show_date: s.date,
                    show_time: s.time,
                })
            })
            .collect();
        schedule.sort_by(|a, b| (a.show_date, a.show_time, a.id).cmp(&(b.show_date, b.show_time, b.id)));
        Ok(schedule)
    }

    async fn insert_movie(&self, movie: &NewMovie) -> Result<Movie, StoreError> {
        let mut state = self.state.lock().await;
        Ok(insert_movie(&mut state, movie))
    }

    async fn update_movie(&self, movie_id: i32, update: &MovieUpdate) -> Result<Option<Movie>, StoreError> {
        let mut state = self.state.lock().await;
        match state.movies.get_mut(&movie_id) {
            Some(row) if !row.deleted => {
                update.apply(&mut row.movie);
                Ok(Some(row.movie.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn soft_delete_movie(&self, movie_id: i32) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.movies.get_mut(&movie_id) {
            Some(row) if !row.deleted => {
                row.deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
