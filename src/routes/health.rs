use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub escalation: EscalationHealth,
}

#[derive(Serialize)]
pub struct EscalationHealth {
    pub active_rules: usize,
    pub pending_jobs: usize,
}

/// Health check endpoint - public
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let service = &state.notifications;
    let active_rules = service
        .get_escalation_rules()
        .iter()
        .filter(|r| r.is_active)
        .count();
    let pending_jobs = service.pending_escalation_count();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        escalation: EscalationHealth {
            active_rules,
            pending_jobs,
        },
    })
}
