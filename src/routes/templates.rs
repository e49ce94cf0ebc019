//! Notification template routes

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::domain::templates::{CreateTemplateRequest, PreviewTemplateRequest, UpdateTemplateRequest};
use crate::error::ApiError;

/// GET /templates
pub async fn list_templates(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(DataResponse::new(state.notifications.get_notification_templates()))
}

/// POST /templates
///
/// Every `{{placeholder}}` in subject or body must be listed in `variables`.
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateTemplateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let template = state.notifications.create_notification_template(input)?;
    Ok(Created(DataResponse::new(template)))
}

/// GET /templates/:id
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let template = state.notifications.get_notification_template(template_id)?;
    Ok(Json(DataResponse::new(template)))
}

/// PUT /templates/:id
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<Uuid>,
    Json(input): Json<UpdateTemplateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let template = state
        .notifications
        .update_notification_template(template_id, input)?;
    Ok(Json(DataResponse::new(template)))
}

/// DELETE /templates/:id
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.notifications.delete_notification_template(template_id)?;
    Ok(NoContent)
}

/// POST /templates/:id/preview
///
/// Render with the supplied variables; a missing variable is a 400.
pub async fn preview_template(
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<Uuid>,
    Json(input): Json<PreviewTemplateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rendered = state
        .notifications
        .preview_template(template_id, &input.variables)?;
    Ok(Json(DataResponse::new(rendered)))
}
