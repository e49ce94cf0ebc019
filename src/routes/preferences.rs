//! Notification preference routes

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::domain::preferences::UpdatePreferencesRequest;
use crate::error::ApiError;

/// GET /preferences
///
/// Stored preferences, or the defaults if none have been saved yet.
pub async fn get_preferences(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let preferences = state.notifications.effective_preferences();
    Json(DataResponse::new(preferences))
}

/// PUT /preferences
///
/// Partial update; category entries are merged by key.
pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Json(input): Json<UpdatePreferencesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let preferences = state.notifications.update_preferences(input)?;
    Ok(Json(DataResponse::new(preferences)))
}
