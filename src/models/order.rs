use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::seat::HistorySeat;

// Тело POST /orders. user id берётся из токена, а не от клиента.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub price: i64,
    #[validate(range(min = 1, message = "must be a valid id"))]
    pub payment_id: i32,
    #[validate(range(min = 1, message = "must be a valid id"))]
    pub now_showing_id: i32,
    #[validate(range(min = 1, message = "must be a valid id"))]
    pub cinema_id: i32,
    #[validate(length(min = 1, message = "must name at least one seat"))]
    pub seats_map: Vec<String>,
}

/// Input to the order workflow once the caller is authenticated.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub user_id: i32,
    pub price: i64,
    pub payment_id: i32,
    pub showing_id: i32,
    pub cinema_id: i32,
    pub seat_labels: Vec<String>,
}

impl CreateOrderRequest {
    pub fn into_order_request(self, user_id: i32) -> OrderRequest {
        OrderRequest {
            user_id,
            price: self.price,
            payment_id: self.payment_id,
            showing_id: self.now_showing_id,
            cinema_id: self.cinema_id,
            seat_labels: self.seats_map,
        }
    }
}

/// Row written to `orders`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: i32,
    pub price: i64,
    pub payment_id: i32,
    pub showing_id: i32,
    pub cinema_id: i32,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct InsertedOrder {
    pub id: i32,
    pub created_at: DateTime<Utc>,
}

// Ответ на успешное создание заказа
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub id: i32,
    pub users_id: i32,
    pub price: i64,
    pub qr_code: String,
    pub ticket_id: i32,
    pub seats_map: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// One past order with everything needed to print it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderHistory {
    pub id: i32,
    pub users_id: i32,
    pub price: i64,
    pub payment_id: i32,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub now_showing_id: i32,
    pub movie_title: String,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub cinema_name: String,
    pub seats: Vec<HistorySeat>,
    pub qr_code: String,
}
