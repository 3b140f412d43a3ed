use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use std::sync::Arc;

use crate::error::AppResult;
use crate::middleware::{AuthUser, ROLE_ADMIN};
use crate::models::{ApiResponse, MovieFilterQuery, MovieUpdate, NewMovie};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/popular", get(popular_movies))
        .route("/movies/upcoming", get(upcoming_movies))
        .route("/movies/filter", get(filter_movies))
        .route("/movies/schedule/{id}", get(movie_schedule))
        .route("/movies/{id}", get(movie_detail))
        .route("/admin/movies", post(create_movie))
        .route("/admin/movies/{id}", patch(update_movie).delete(delete_movie))
}

/* ---------- public listings ---------- */

async fn list_movies(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(state.catalog.all_movies().await?)))
}

async fn popular_movies(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(state.catalog.popular_movies().await?)))
}

async fn upcoming_movies(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(state.catalog.upcoming_movies().await?)))
}

async fn filter_movies(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MovieFilterQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(query) = query?;
    Ok(Json(ApiResponse::ok(state.catalog.filter_movies(query).await?)))
}

async fn movie_schedule(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i32>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(id) = id?;
    Ok(Json(ApiResponse::ok(state.catalog.schedule(id).await?)))
}

async fn movie_detail(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i32>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(id) = id?;
    Ok(Json(ApiResponse::ok(state.catalog.movie(id).await?)))
}

/* ---------- admin ---------- */

async fn create_movie(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    body: Result<Json<NewMovie>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    user.require_role(ROLE_ADMIN)?;
    let Json(input) = body?;
    let movie = state.catalog.create_movie(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Movie created successfully", movie)),
    ))
}

async fn update_movie(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<MovieUpdate>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    user.require_role(ROLE_ADMIN)?;
    let Path(id) = id?;
    let Json(update) = body?;
    let movie = state.catalog.update_movie(id, update).await?;
    Ok(Json(ApiResponse::with_message("Movie updated successfully", movie)))
}

async fn delete_movie(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    id: Result<Path<i32>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    user.require_role(ROLE_ADMIN)?;
    let Path(id) = id?;
    state.catalog.delete_movie(id).await?;
    Ok(Json(ApiResponse::with_message("Movie deleted successfully", ())))
}
