use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::error::ApiError;
use super::validation;
use crate::db::{CreateReviewRequest, Review};
use crate::AppState;

/// List all reviews, newest first. Public.
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let reviews = Review::list(&state.db).await?;
    Ok(Json(reviews))
}

/// Post a review. The reviewer name comes from the session, never from
/// the request body.
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    if let Err(e) = validation::validate_review_body(&request.body) {
        return Err(ApiError::validation_field("body", e));
    }

    let review = Review::create(&state.db, &user.display_name, request.body.trim()).await?;
    Ok((StatusCode::CREATED, Json(review)))
}
