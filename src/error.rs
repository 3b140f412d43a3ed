use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{cache::CacheError, store::StoreError};

/// Every failure a caller of the booking core can observe.
///
/// Not-found and validation variants are raised before any write happens.
/// `SeatNotAvailable` is the normal outcome of losing a race for a seat.
/// `Internal` carries detail for the log only; clients get a generic message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("user not found")]
    UserNotFound,
    #[error("showing not found")]
    ShowingNotFound,
    #[error("showing {showing_id} is not screened in cinema {requested}")]
    CinemaMismatch { showing_id: i32, requested: i32 },
    #[error("payment method not found")]
    PaymentMethodNotFound,
    #[error("no seats configured for this cinema")]
    NoSeatsConfigured,
    #[error("no order history found")]
    NoOrderHistory,
    #[error("movie not found")]
    MovieNotFound,
    #[error("invalid seat selection: {0}")]
    InvalidSeatSelection(String),
    #[error("seat {0} is not available")]
    SeatNotAvailable(String),
    #[error("{0}")]
    Validation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::UserNotFound
            | AppError::ShowingNotFound
            | AppError::CinemaMismatch { .. }
            | AppError::PaymentMethodNotFound
            | AppError::InvalidSeatSelection(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NoSeatsConfigured | AppError::NoOrderHistory | AppError::MovieNotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::SeatNotAvailable(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::UserNotFound => "User not found".to_string(),
            AppError::ShowingNotFound => "Showing not found".to_string(),
            AppError::CinemaMismatch { .. } => "Cinema not found for this showing".to_string(),
            AppError::PaymentMethodNotFound => "Payment method not found".to_string(),
            AppError::NoSeatsConfigured => "No seats configured for this cinema".to_string(),
            AppError::NoOrderHistory => "No order history found".to_string(),
            AppError::MovieNotFound => "Movie not found".to_string(),
            AppError::InvalidSeatSelection(detail) => format!("Invalid seat selection: {}", detail),
            AppError::SeatNotAvailable(label) => format!("Seat {} is already sold", label),
            AppError::Validation(reason) => reason.clone(),
            AppError::Unauthorized => "Missing or invalid access token".to_string(),
            AppError::Forbidden => "You do not have access to this resource".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reason = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{} {}", field, reason)
            })
            .collect();
        fields.sort();
        AppError::Validation(fields.join("; "))
    }
}

// Битый JSON или id в пути - это ошибка клиента
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Единственное место, где внутренние сбои пишутся на уровне error
        match &self {
            AppError::Internal(detail) => tracing::error!("request failed: {}", detail),
            other => tracing::debug!("request rejected ({}): {}", status, other),
        }
        let body = json!({
            "success": false,
            "error": self.public_message(),
        });
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_selection_message_carries_the_detail() {
        let err = AppError::InvalidSeatSelection("seat Z9 does not exist in cinema 3".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Invalid seat selection: seat Z9 does not exist in cinema 3");
    }

    #[test]
    fn internal_detail_stays_out_of_the_message() {
        let err = AppError::Internal("pool timed out".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }
}
