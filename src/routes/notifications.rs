//! Notification routes
//!
//! Endpoints for in-app notifications: list, fetch, create, mark read, archive, delete.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::domain::notifications::*;
use crate::error::ApiError;

/// GET /notifications
///
/// List notifications, newest first. Sets are comma separated,
/// e.g. `?categories=opportunity,quote&read=false`.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotificationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = NotificationFilter::try_from(query).map_err(ApiError::bad_request)?;
    let data = state.notifications.get_notifications(&filter);
    Ok(Json(DataResponse::new(data)))
}

/// POST /notifications
pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state.notifications.create_notification(input)?;
    Ok(Created(DataResponse::new(notification)))
}

/// GET /notifications/unread-count
pub async fn get_unread_count(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let count = state.notifications.get_unread_count();
    Json(DataResponse::new(UnreadCountResponse { count }))
}

/// GET /notifications/:id
pub async fn get_notification(
    State(state): State<Arc<AppState>>,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state.notifications.get_notification(notification_id)?;
    Ok(Json(DataResponse::new(notification)))
}

/// PUT /notifications/:id/read
///
/// Marking an already-read notification succeeds without changes.
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state.notifications.mark_as_read(notification_id)?;
    Ok(Json(DataResponse::new(notification)))
}

/// PUT /notifications/read-all
///
/// Mark every unread, non-archived notification as read.
pub async fn mark_all_read(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let marked_count = state.notifications.mark_all_as_read();
    Json(DataResponse::new(MarkAllReadResponse { marked_count }))
}

/// PUT /notifications/:id/archive
pub async fn archive_notification(
    State(state): State<Arc<AppState>>,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state.notifications.archive_notification(notification_id)?;
    Ok(Json(DataResponse::new(notification)))
}

/// DELETE /notifications/:id
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.notifications.delete_notification(notification_id)?;
    Ok(NoContent)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::test_support::{send, TestApp};

    #[tokio::test]
    async fn test_create_list_and_read() {
        let app = TestApp::new();

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/notifications",
            Some(json!({
                "title": "Quote received",
                "message": "Trane submitted a quote",
                "category": "quote",
                "priority": "high"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["read"], json!(false));

        send(
            &app.router,
            Method::POST,
            "/notifications",
            Some(json!({"title": "Order shipped", "category": "order"})),
        )
        .await;

        let (_, body) = send(&app.router, Method::GET, "/notifications", None).await;
        let titles: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Order shipped", "Quote received"]);

        let (_, body) = send(
            &app.router,
            Method::GET,
            "/notifications?categories=quote,inventory",
            None,
        )
        .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (_, body) = send(&app.router, Method::GET, "/notifications/unread-count", None).await;
        assert_eq!(body["data"]["count"], json!(2));

        let (status, body) = send(
            &app.router,
            Method::PUT,
            &format!("/notifications/{}/read", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["read"], json!(true));

        let (_, body) = send(&app.router, Method::PUT, "/notifications/read-all", None).await;
        assert_eq!(body["data"]["marked_count"], json!(1));

        let (_, body) = send(&app.router, Method::GET, "/notifications/unread-count", None).await;
        assert_eq!(body["data"]["count"], json!(0));
    }

    #[tokio::test]
    async fn test_unknown_filter_value_is_bad_request() {
        let app = TestApp::new();
        let (status, body) = send(
            &app.router,
            Method::GET,
            "/notifications?priorities=critical",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("BAD_REQUEST"));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let app = TestApp::new();
        let uri = format!("/notifications/{}/archive", uuid::Uuid::new_v4());
        let (status, body) = send(&app.router, Method::PUT, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], json!("NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_archive_then_delete() {
        let app = TestApp::new();
        let (_, body) = send(
            &app.router,
            Method::POST,
            "/notifications",
            Some(json!({"title": "Low stock", "category": "inventory"})),
        )
        .await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (_, body) = send(
            &app.router,
            Method::PUT,
            &format!("/notifications/{}/archive", id),
            None,
        )
        .await;
        assert_eq!(body["data"]["archived"], json!(true));

        let (_, body) = send(&app.router, Method::GET, "/notifications/unread-count", None).await;
        assert_eq!(body["data"]["count"], json!(0));

        let uri = format!("/notifications/{}", id);
        let (status, _) = send(&app.router, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app.router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
