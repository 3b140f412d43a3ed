pub mod movie;
pub mod order;
pub mod response;
pub mod seat;

pub use movie::{Movie, MovieFilter, MovieFilterQuery, MoviePage, MovieUpdate, NewMovie, ShowingSchedule};
pub use order::{CreateOrderRequest, CreatedOrder, InsertedOrder, NewOrder, OrderHistory, OrderRequest};
pub use response::ApiResponse;
pub use seat::{AvailableSeat, HistorySeat, SeatLabel, SeatState};
