use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::OrderHistory;
use crate::store::BookingStore;

#[derive(Clone)]
pub struct OrderHistoryProjector {
    store: Arc<dyn BookingStore>,
}

impl OrderHistoryProjector {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Past orders of `user_id`, newest first, each with its seats and ticket.
    pub async fn history(&self, user_id: i32) -> AppResult<Vec<OrderHistory>> {
        let orders = self.store.order_history(user_id).await?;
        if orders.is_empty() {
            return Err(AppError::NoOrderHistory);
        }
        Ok(orders)
    }
}
