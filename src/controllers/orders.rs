use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthUser, ROLE_USER};
use crate::models::{ApiResponse, AvailableSeat, CreateOrderRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/history", get(order_history))
        .route("/orders/seats/{showing_id}", get(showing_seats))
}

// GET /orders/seats/{showing_id}
async fn showing_seats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    showing_id: Result<Path<i32>, PathRejection>,
) -> AppResult<Response> {
    user.require_role(ROLE_USER)?;
    let Path(showing_id) = showing_id?;

    match state.seats.resolve(showing_id).await {
        Ok(seats) => Ok(Json(ApiResponse::ok(seats)).into_response()),
        // Пустой зал - не ошибка для клиента
        Err(AppError::NoSeatsConfigured) => Ok(Json(ApiResponse::with_message(
            AppError::NoSeatsConfigured.public_message(),
            Vec::<AvailableSeat>::new(),
        ))
        .into_response()),
        Err(AppError::ShowingNotFound) => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "error": AppError::ShowingNotFound.public_message(),
            })),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

// POST /orders
async fn create_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    user.require_role(ROLE_USER)?;
    let Json(req) = body?;
    req.validate()?;

    let order = state
        .orders
        .create_order(req.into_order_request(user.user_id))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Order created successfully", order)),
    ))
}

// GET /orders/history
async fn order_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    user.require_role(ROLE_USER)?;
    let orders = state.history.history(user.user_id).await?;
    Ok(Json(ApiResponse::ok(orders)))
}
