use axum::{extract::State, Json};
use std::sync::Arc;

use super::error::ApiError;
use crate::db::Doctor;
use crate::AppState;

/// List the doctor directory, most-liked first
pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Doctor>>, ApiError> {
    let doctors = Doctor::list(&state.db).await?;
    Ok(Json(doctors))
}
