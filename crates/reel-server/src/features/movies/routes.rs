//! Movie routes
//!
//! - `GET /movies?limit&offset&year&genre&rating&ratings_count`

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use sqlx::PgPool;

use super::queries::{list_movies, ListMoviesQuery, ListMoviesResponse};
use crate::error::{ApiResult, AppError};

pub fn movies_routes() -> Router<PgPool> {
    Router::new().route("/movies", get(list_movies_handler))
}

async fn list_movies_handler(
    State(pool): State<PgPool>,
    query: Result<Query<ListMoviesQuery>, QueryRejection>,
) -> ApiResult<Json<ListMoviesResponse>> {
    let Query(query) = query.map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    let page = list_movies::handle(pool, query).await?;

    Ok(Json(page))
}
