//! Commercial event routes
//!
//! Business events from the sales portal become notifications here. The request
//! body carries a tagged `event` plus the entity payload.

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::response::{Created, DataResponse};
use crate::app::AppState;
use crate::domain::commercial::{
    EngineerNotificationRequest, LargeOpportunityData, ManufacturerRepNotificationRequest,
    OpportunityNotificationRequest,
};
use crate::error::ApiError;

/// POST /notifications/opportunities
pub async fn notify_opportunity(
    State(state): State<Arc<AppState>>,
    Json(input): Json<OpportunityNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state
        .notifications
        .create_opportunity_notification(&input.event, &input.data)?;
    Ok(Created(DataResponse::new(notification)))
}

/// POST /notifications/engineers
pub async fn notify_engineer(
    State(state): State<Arc<AppState>>,
    Json(input): Json<EngineerNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state
        .notifications
        .create_engineer_notification(&input.event, &input.data)?;
    Ok(Created(DataResponse::new(notification)))
}

/// POST /notifications/manufacturer-reps
pub async fn notify_manufacturer_rep(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ManufacturerRepNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state
        .notifications
        .create_manufacturer_rep_notification(&input.event, &input.data)?;
    Ok(Created(DataResponse::new(notification)))
}

/// POST /notifications/large-opportunity
///
/// Returns the emitted team notifications; empty below the threshold.
pub async fn notify_large_opportunity(
    State(state): State<Arc<AppState>>,
    Json(input): Json<LargeOpportunityData>,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = state.notifications.notify_large_opportunity_team(&input)?;
    Ok(Json(DataResponse::new(notifications)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::test_support::{send, TestApp};

    #[tokio::test]
    async fn test_high_value_opportunity() {
        let app = TestApp::new();
        let (status, body) = send(
            &app.router,
            Method::POST,
            "/notifications/opportunities",
            Some(json!({
                "event": {"type": "high_value"},
                "data": {
                    "opportunity_id": "opp-42",
                    "project_name": "Riverside Medical Center",
                    "customer_name": "Riverside Health",
                    "estimated_value": 1250000,
                    "market_segment": "healthcare"
                }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["priority"], json!("urgent"));
        assert_eq!(body["data"]["category"], json!("opportunity"));
        assert_eq!(body["data"]["action_url"], json!("/commercial/opportunities/opp-42"));
        assert_eq!(body["data"]["metadata"]["estimated_value"], json!(1250000.0));
        assert!(body["data"]["message"]
            .as_str()
            .unwrap()
            .contains("$1,250,000"));
    }

    #[tokio::test]
    async fn test_engineer_and_rep_events() {
        let app = TestApp::new();
        let (status, body) = send(
            &app.router,
            Method::POST,
            "/notifications/engineers",
            Some(json!({
                "event": {"type": "follow_up_due", "due_date": "2024-07-01"},
                "data": {"engineer_id": "eng-7", "name": "Dana Ruiz", "firm": "Ruiz MEP"}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["priority"], json!("high"));
        assert_eq!(body["data"]["category"], json!("engineer"));

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/notifications/manufacturer-reps",
            Some(json!({
                "event": {"type": "territory_change", "previous_territory": "North", "new_territory": "Metro"},
                "data": {"rep_id": "rep-3", "name": "Sam Okafor"}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["priority"], json!("medium"));
        assert_eq!(body["data"]["category"], json!("manufacturer_rep"));
    }

    #[tokio::test]
    async fn test_event_missing_required_fields_is_rejected() {
        let app = TestApp::new();
        let (status, _) = send(
            &app.router,
            Method::POST,
            "/notifications/opportunities",
            Some(json!({
                "event": {"type": "phase_changed"},
                "data": {"opportunity_id": "opp-1", "project_name": "Depot retrofit"}
            })),
        )
        .await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn test_large_opportunity_fan_out() {
        let app = TestApp::new();
        let (_, body) = send(
            &app.router,
            Method::POST,
            "/notifications/large-opportunity",
            Some(json!({"opportunity_id": "opp-9", "project_name": "Airport T2", "estimated_value": 249999})),
        )
        .await;
        assert_eq!(body["data"], json!([]));

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/notifications/large-opportunity",
            Some(json!({"opportunity_id": "opp-9", "project_name": "Airport T2", "estimated_value": 250000})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let emitted = body["data"].as_array().unwrap();
        assert_eq!(emitted.len(), 3);
        assert!(emitted.iter().all(|n| n["priority"] == json!("urgent")));
        assert!(emitted.iter().all(|n| n["metadata"]["team_notification"] == json!(true)));
    }
}
