//! Escalation rule and job routes

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::domain::escalation::{
    CreateEscalationRuleRequest, EscalationJobQuery, UpdateEscalationRuleRequest,
};
use crate::error::ApiError;

/// GET /escalation-rules
pub async fn list_rules(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(DataResponse::new(state.notifications.get_escalation_rules()))
}

/// POST /escalation-rules
///
/// Step numbers are assigned from list order.
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateEscalationRuleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rule = state.notifications.create_escalation_rule(input)?;
    Ok(Created(DataResponse::new(rule)))
}

/// GET /escalation-rules/:id
pub async fn get_rule(
    State(state): State<Arc<AppState>>,
    Path(rule_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let rule = state.notifications.get_escalation_rule(rule_id)?;
    Ok(Json(DataResponse::new(rule)))
}

/// PATCH /escalation-rules/:id
///
/// Deactivating a rule cancels its pending escalation jobs. Replacement steps
/// keep pending jobs when they carry the `id` of an existing step; jobs of steps
/// that are no longer present are cancelled. `"description": null` clears it.
pub async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(rule_id): Path<Uuid>,
    Json(input): Json<UpdateEscalationRuleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rule = state.notifications.update_escalation_rule(rule_id, input)?;
    Ok(Json(DataResponse::new(rule)))
}

/// DELETE /escalation-rules/:id
pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(rule_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.notifications.delete_escalation_rule(rule_id)?;
    Ok(NoContent)
}

/// DELETE /escalation-rules/:id/steps/:step_number
///
/// Returns the rule with its remaining steps renumbered from 1.
pub async fn remove_step(
    State(state): State<Arc<AppState>>,
    Path((rule_id, step_number)): Path<(Uuid, u32)>,
) -> Result<impl IntoResponse, ApiError> {
    let rule = state.notifications.remove_escalation_step(rule_id, step_number)?;
    Ok(Json(DataResponse::new(rule)))
}

/// GET /escalation-jobs
///
/// Optional `status` and `rule_id` filters.
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EscalationJobQuery>,
) -> impl IntoResponse {
    Json(DataResponse::new(state.notifications.get_escalation_jobs(&query)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::routes::test_support::{send, TestApp};

    fn rule_body() -> Value {
        json!({
            "name": "Healthcare follow-up",
            "category": "opportunity",
            "conditions": {"value_threshold": 500000, "market_segment": ["healthcare"]},
            "escalation_steps": [
                {"delay_minutes": 30, "recipients": ["sales-manager"], "notification_methods": ["email"], "template": "a", "conditions": {"still_unread": true}},
                {"delay_minutes": 60, "recipients": ["regional-director"], "notification_methods": ["sms"], "template": "b"},
                {"delay_minutes": 240, "recipients": ["vp-sales"], "notification_methods": ["email", "push"], "template": "c"}
            ]
        })
    }

    #[tokio::test]
    async fn test_rule_crud() {
        let app = TestApp::new();
        let (status, body) =
            send(&app.router, Method::POST, "/escalation-rules", Some(rule_body())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["is_active"], json!(true));
        let id = body["data"]["id"].as_str().unwrap().to_string();
        let created_updated_at = body["data"]["updated_at"].clone();

        let (_, body) = send(&app.router, Method::GET, "/escalation-rules", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        app.clock.advance_minutes(1);
        let uri = format!("/escalation-rules/{}", id);
        let (status, body) = send(
            &app.router,
            Method::PATCH,
            &uri,
            Some(json!({"is_active": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["is_active"], json!(false));
        assert_ne!(body["data"]["updated_at"], created_updated_at);

        let (status, body) = send(&app.router, Method::DELETE, &format!("{}/steps/2", uri), None).await;
        assert_eq!(status, StatusCode::OK);
        let steps = body["data"]["escalation_steps"].as_array().unwrap();
        let numbers: Vec<u64> = steps.iter().map(|s| s["step_number"].as_u64().unwrap()).collect();
        let delays: Vec<u64> = steps.iter().map(|s| s["delay_minutes"].as_u64().unwrap()).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(delays, vec![30, 240]);

        let (status, _) = send(&app.router, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app.router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_unknown_rule_is_not_found() {
        let app = TestApp::new();
        let uri = format!("/escalation-rules/{}", uuid::Uuid::new_v4());
        let (status, _) = send(&app.router, Method::PATCH, &uri, Some(json!({"is_active": false}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rule_without_steps_rejected() {
        let app = TestApp::new();
        let mut body = rule_body();
        body["escalation_steps"] = json!([]);
        let (status, _) = send(&app.router, Method::POST, "/escalation-rules", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_jobs_are_listed_and_fired() {
        let app = TestApp::new();
        send(&app.router, Method::POST, "/escalation-rules", Some(rule_body())).await;
        send(
            &app.router,
            Method::POST,
            "/notifications",
            Some(json!({
                "title": "St. Luke's expansion",
                "category": "opportunity",
                "metadata": {"estimated_value": 820000, "market_segment": "Healthcare"}
            })),
        )
        .await;

        let (_, body) = send(&app.router, Method::GET, "/escalation-jobs?status=pending", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 3);

        app.clock.advance_minutes(60);
        app.state.notifications.process_due_escalations();

        let (_, body) = send(&app.router, Method::GET, "/escalation-jobs?status=fired", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (_, body) = send(&app.router, Method::GET, "/notifications?priorities=urgent", None).await;
        let titles: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Escalation: St. Luke's expansion"; 2]);
    }

    #[tokio::test]
    async fn test_reordered_steps_keep_their_pending_jobs() {
        let app = TestApp::new();
        let mut rule = rule_body();
        rule["description"] = json!("Hospital work");
        let (_, body) = send(&app.router, Method::POST, "/escalation-rules", Some(rule)).await;
        let uri = format!("/escalation-rules/{}", body["data"]["id"].as_str().unwrap());
        send(
            &app.router,
            Method::POST,
            "/notifications",
            Some(json!({
                "title": "Mercy West tower",
                "category": "opportunity",
                "metadata": {"estimated_value": 900000, "market_segment": "healthcare"}
            })),
        )
        .await;

        let mut steps = body["data"]["escalation_steps"].as_array().unwrap().clone();
        steps.rotate_right(1);
        let (status, body) = send(
            &app.router,
            Method::PATCH,
            &uri,
            Some(json!({"escalation_steps": steps, "description": null})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["description"], Value::Null);
        assert_eq!(body["data"]["escalation_steps"][0]["delay_minutes"], json!(240));

        let (status, _) = send(&app.router, Method::DELETE, &format!("{}/steps/1", uri), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app.router, Method::GET, "/escalation-jobs?status=pending", None).await;
        let pending: Vec<(u64, u64)> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|j| {
                (
                    j["step"]["delay_minutes"].as_u64().unwrap(),
                    j["step"]["step_number"].as_u64().unwrap(),
                )
            })
            .collect();
        assert_eq!(pending, vec![(30, 1), (60, 2)]);

        let (_, body) = send(&app.router, Method::GET, "/escalation-jobs?status=cancelled", None).await;
        let cancelled = body["data"].as_array().unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0]["step"]["delay_minutes"], json!(240));
    }
}
