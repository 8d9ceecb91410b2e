//! Per-user movie rating endpoints
//!
//! Ratings live in the hosted document store under the signed-in
//! user's subtree; the server forwards each operation with the
//! session's provider ID token. All routes here sit behind the
//! session middleware.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::api::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::firebase::firestore::UserRating;
use crate::AppState;

/// Ratings are whole numbers on a 1-10 scale
pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 10;

/// Rating submission body
#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rating: i64,
}

/// PUT /api/ratings/:movie_id
///
/// Creates or replaces the signed-in user's rating for a movie. The
/// value is validated before any upstream call.
pub async fn set_rating(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(movie_id): Path<u64>,
    Json(payload): Json<RateRequest>,
) -> ApiResult<Json<UserRating>> {
    validate_rating(payload.rating)?;

    let rating = state
        .firestore
        .set_rating(&user.0.id_token, &user.0.uid, movie_id, payload.rating)
        .await?;

    info!(uid = %user.0.uid, movie_id, rating = payload.rating, "Stored rating");

    Ok(Json(rating))
}

/// GET /api/ratings/:movie_id
pub async fn get_rating(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(movie_id): Path<u64>,
) -> ApiResult<Json<UserRating>> {
    let rating = state
        .firestore
        .get_rating(&user.0.id_token, &user.0.uid, movie_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No rating for movie {}", movie_id)))?;

    Ok(Json(rating))
}

/// DELETE /api/ratings/:movie_id
///
/// Idempotent: deleting a rating that doesn't exist still succeeds.
pub async fn delete_rating(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(movie_id): Path<u64>,
) -> ApiResult<Json<Value>> {
    state
        .firestore
        .delete_rating(&user.0.id_token, &user.0.uid, movie_id)
        .await?;

    info!(uid = %user.0.uid, movie_id, "Deleted rating");

    Ok(Json(json!({ "success": true })))
}

/// GET /api/ratings
///
/// All of the signed-in user's ratings, for the dashboard view.
pub async fn list_ratings(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<UserRating>>> {
    let ratings = state
        .firestore
        .list_ratings(&user.0.id_token, &user.0.uid)
        .await?;

    Ok(Json(ratings))
}

fn validate_rating(rating: i64) -> ApiResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ApiError::BadRequest(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }
    Ok(())
}
