use std::sync::Arc;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{seat::is_love_nest, AvailableSeat};
use crate::store::BookingStore;

/// Full seat grid of a showing's cinema, each seat flagged sold/available.
/// Never cached: it must reflect a sale the moment the order commits.
#[derive(Clone)]
pub struct SeatAvailabilityResolver {
    store: Arc<dyn BookingStore>,
}

impl SeatAvailabilityResolver {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, showing_id: i32) -> AppResult<Vec<AvailableSeat>> {
        let cinema_id = self
            .store
            .showing_cinema(showing_id)
            .await?
            .ok_or(AppError::ShowingNotFound)?;

        let mut seats = self.store.seat_inventory(showing_id, cinema_id).await?;
        if seats.is_empty() {
            return Err(AppError::NoSeatsConfigured);
        }
        seats.sort_by(|a, b| (&a.seat_row, a.seat_number).cmp(&(&b.seat_row, b.seat_number)));

        let sold = seats.iter().filter(|s| s.is_sold).count();
        debug!(
            showing_id,
            cinema_id,
            total = seats.len(),
            sold,
            "resolved seat availability"
        );

        Ok(seats
            .into_iter()
            .map(|s| AvailableSeat {
                seat_id: format!("{}{}", s.seat_row, s.seat_number),
                showing_id,
                is_sold: s.is_sold,
                is_love_nest: is_love_nest(&s.seat_row, s.seat_number),
            })
            .collect())
    }
}
