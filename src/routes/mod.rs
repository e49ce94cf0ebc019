pub mod commercial;
pub mod escalation;
pub mod health;
pub mod notifications;
pub mod preferences;
pub mod templates;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        // Notifications
        .route(
            "/notifications",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route(
            "/notifications/unread-count",
            get(notifications::get_unread_count),
        )
        .route("/notifications/read-all", put(notifications::mark_all_read))
        .route(
            "/notifications/:id",
            get(notifications::get_notification).delete(notifications::delete_notification),
        )
        .route(
            "/notifications/:id/read",
            put(notifications::mark_notification_read),
        )
        .route(
            "/notifications/:id/archive",
            put(notifications::archive_notification),
        )
        // Commercial events
        .route(
            "/notifications/opportunities",
            post(commercial::notify_opportunity),
        )
        .route("/notifications/engineers", post(commercial::notify_engineer))
        .route(
            "/notifications/manufacturer-reps",
            post(commercial::notify_manufacturer_rep),
        )
        .route(
            "/notifications/large-opportunity",
            post(commercial::notify_large_opportunity),
        )
        // Preferences
        .route(
            "/preferences",
            get(preferences::get_preferences).put(preferences::update_preferences),
        )
        // Escalation
        .route(
            "/escalation-rules",
            get(escalation::list_rules).post(escalation::create_rule),
        )
        .route(
            "/escalation-rules/:id",
            get(escalation::get_rule)
                .patch(escalation::update_rule)
                .delete(escalation::delete_rule),
        )
        .route(
            "/escalation-rules/:id/steps/:step_number",
            delete(escalation::remove_step),
        )
        .route("/escalation-jobs", get(escalation::list_jobs))
        // Templates
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/templates/:id",
            get(templates::get_template)
                .put(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/templates/:id/preview", post(templates::preview_template))
}
