use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::auth::SessionToken;
use super::error::ApiError;
use crate::db::FormRecord;
use crate::engine::SubmitFormRequest;
use crate::AppState;

/// Submit an intake form. The stored record, including the derived
/// diagnosis, is echoed back.
pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    SessionToken(token): SessionToken,
    Json(request): Json<SubmitFormRequest>,
) -> Result<(StatusCode, Json<FormRecord>), ApiError> {
    let record = state.intake.submit(&token, request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// List the forms visible to the caller: a doctor sees forms addressed to
/// them, everyone else sees their own submissions.
pub async fn list_forms(
    State(state): State<Arc<AppState>>,
    SessionToken(token): SessionToken,
) -> Result<Json<Vec<FormRecord>>, ApiError> {
    let forms = state.intake.list_for(&token).await?;
    Ok(Json(forms))
}
