pub mod catalog;
pub mod history;
pub mod orders;
pub mod seats;
pub mod ticket;

pub use catalog::CatalogService;
pub use history::OrderHistoryProjector;
pub use orders::OrderTransaction;
pub use seats::SeatAvailabilityResolver;
pub use ticket::TicketToken;
