use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Row of the love-nest block.
pub const LOVE_NEST_ROW: &str = "F";
/// Inclusive seat-number range of the love-nest block.
pub const LOVE_NEST_NUMBERS: std::ops::RangeInclusive<i32> = 7..=10;

/// Premium seats are a fixed positional block, never a stored flag.
pub fn is_love_nest(row: &str, number: i32) -> bool {
    row == LOVE_NEST_ROW && LOVE_NEST_NUMBERS.contains(&number)
}

/// Human-readable seat identifier: uppercase row letters followed by a
/// positive seat number, e.g. `A1` or `F7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatLabel {
    row: String,
    number: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeatLabelError {
    #[error("seat label is empty")]
    Empty,
    #[error("seat label {0:?} must start with a row letter")]
    MissingRow(String),
    #[error("seat label {0:?} must end with a seat number")]
    MissingNumber(String),
    #[error("seat label {0:?} has an invalid seat number")]
    InvalidNumber(String),
}

impl SeatLabel {
    pub fn new(row: impl Into<String>, number: i32) -> Self {
        Self { row: row.into(), number }
    }

    pub fn row(&self) -> &str {
        &self.row
    }

    pub fn number(&self) -> i32 {
        self.number
    }
}

impl FromStr for SeatLabel {
    type Err = SeatLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SeatLabelError::Empty);
        }
        let split = s
            .find(|c: char| !c.is_ascii_uppercase())
            .unwrap_or(s.len());
        let (row, digits) = s.split_at(split);
        if row.is_empty() {
            return Err(SeatLabelError::MissingRow(s.to_string()));
        }
        if digits.is_empty() {
            return Err(SeatLabelError::MissingNumber(s.to_string()));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) || digits.starts_with('0') {
            return Err(SeatLabelError::InvalidNumber(s.to_string()));
        }
        let number: i32 = digits
            .parse()
            .map_err(|_| SeatLabelError::InvalidNumber(s.to_string()))?;
        Ok(SeatLabel::new(row, number))
    }
}

impl fmt::Display for SeatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.number)
    }
}

/// One catalog seat joined with its sale state for a showing. Produced by
/// the store; absence of a showing_seats row arrives here as `is_sold = false`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SeatState {
    pub seat_id: i32,
    pub seat_row: String,
    pub seat_number: i32,
    pub is_sold: bool,
}

// Ответ для GET /orders/seats/{showing_id}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableSeat {
    /// Seat label, e.g. `A1`.
    pub seat_id: String,
    pub showing_id: i32,
    pub is_sold: bool,
    pub is_love_nest: bool,
}

/// Row and number of a purchased seat, as shown in order history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySeat {
    pub row: String,
    pub seat_number: i32,
}
