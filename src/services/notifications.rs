//! Notification service
//!
//! Owns the in-memory notification store, the preference record, the template store
//! and the escalation engine. Every created notification is offered to the escalation
//! engine; due escalation jobs are resolved by [`NotificationService::process_due_escalations`].
//!
//! Locks are never held across calls into another component.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::clock::Clock;
use crate::domain::commercial::{
    self, format_currency, EngineerData, EngineerEvent, LargeOpportunityData, ManufacturerRepData,
    ManufacturerRepEvent, OpportunityData, OpportunityEvent,
};
use crate::domain::escalation::{
    CreateEscalationRuleRequest, EscalationJob, EscalationJobQuery, EscalationRule, JobStatus,
    MissingMetadataPolicy, UpdateEscalationRuleRequest,
};
use crate::domain::notifications::{
    keys, CreateNotificationRequest, Notification, NotificationFilter, NotificationPriority,
    NotificationType,
};
use crate::domain::preferences::{NotificationPreferences, UpdatePreferencesRequest};
use crate::domain::templates::{
    CreateTemplateRequest, NotificationTemplate, RenderedTemplate, UpdateTemplateRequest,
};
use crate::error::{ServiceError, ServiceResult};

use super::dispatch::{plan_deliveries, Dispatcher};
use super::escalation::{default_rules, EscalationEngine};
use super::templates::{default_templates, TemplateStore};

const ENTITY: &str = "notification";

/// Tunables for the notification service
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    pub missing_metadata: MissingMetadataPolicy,
    /// Minimum estimated value for the large-opportunity team fan-out
    pub team_notification_threshold: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            missing_metadata: MissingMetadataPolicy::Permissive,
            team_notification_threshold: 250_000.0,
        }
    }
}

/// Outcome of one escalation sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub fired: usize,
    pub suppressed: usize,
}

pub struct NotificationService {
    clock: Arc<dyn Clock>,
    dispatcher: Arc<dyn Dispatcher>,
    config: ServiceConfig,
    /// Newest first
    notifications: RwLock<Vec<Notification>>,
    preferences: RwLock<Option<NotificationPreferences>>,
    templates: TemplateStore,
    escalation: EscalationEngine,
    sweep_lock: Mutex<()>,
}

impl NotificationService {
    pub fn new(clock: Arc<dyn Clock>, dispatcher: Arc<dyn Dispatcher>, config: ServiceConfig) -> Self {
        Self {
            clock,
            dispatcher,
            config,
            notifications: RwLock::new(Vec::new()),
            preferences: RwLock::new(None),
            templates: TemplateStore::new(),
            escalation: EscalationEngine::new(config.missing_metadata),
            sweep_lock: Mutex::new(()),
        }
    }

    /// Install the default templates and escalation rules
    pub fn seed_defaults(&self) -> ServiceResult<()> {
        let now = self.clock.now();
        for template in default_templates() {
            self.templates.create(template, now)?;
        }
        for rule in default_rules() {
            self.escalation.create_rule(rule, now)?;
        }
        tracing::info!(
            templates = self.templates.list().len(),
            rules = self.escalation.list_rules().len(),
            "Seeded default templates and escalation rules"
        );
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    /// Matching notifications, newest first
    pub fn get_notifications(&self, filter: &NotificationFilter) -> Vec<Notification> {
        self.notifications
            .read()
            .iter()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect()
    }

    pub fn get_notification(&self, id: Uuid) -> ServiceResult<Notification> {
        self.notifications
            .read()
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(ENTITY, id))
    }

    pub fn get_unread_count(&self) -> usize {
        self.notifications.read().iter().filter(|n| n.is_unread()).count()
    }

    pub fn mark_as_read(&self, id: Uuid) -> ServiceResult<Notification> {
        self.mutate(id, |n| {
            let changed = !n.read;
            n.read = true;
            changed
        })
    }

    /// Mark every unread, non-archived notification read; returns how many changed
    pub fn mark_all_as_read(&self) -> usize {
        let now = self.clock.now();
        let mut marked = 0;
        for n in self.notifications.write().iter_mut().filter(|n| n.is_unread()) {
            n.read = true;
            n.updated_at = now;
            marked += 1;
        }
        tracing::info!(marked, "Marked all notifications as read");
        marked
    }

    pub fn archive_notification(&self, id: Uuid) -> ServiceResult<Notification> {
        self.mutate(id, |n| {
            let changed = !n.archived;
            n.archived = true;
            changed
        })
    }

    pub fn delete_notification(&self, id: Uuid) -> ServiceResult<()> {
        let mut notifications = self.notifications.write();
        let before = notifications.len();
        notifications.retain(|n| n.id != id);
        if notifications.len() == before {
            return Err(ServiceError::not_found(ENTITY, id));
        }
        tracing::info!(notification_id = %id, "Notification deleted");
        Ok(())
    }

    /// Store a notification and schedule any matching escalation steps
    pub fn create_notification(&self, req: CreateNotificationRequest) -> ServiceResult<Notification> {
        if req.title.trim().is_empty() {
            return Err(ServiceError::Validation("title is required".into()));
        }
        let notification = self.insert(Uuid::new_v4(), req, false);
        self.escalation.schedule_for(&notification, self.clock.now());
        Ok(notification)
    }

    fn mutate(&self, id: Uuid, apply: impl FnOnce(&mut Notification) -> bool) -> ServiceResult<Notification> {
        let now = self.clock.now();
        let mut notifications = self.notifications.write();
        let n = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| ServiceError::not_found(ENTITY, id))?;
        if apply(n) {
            n.updated_at = now;
            tracing::info!(notification_id = %id, read = n.read, archived = n.archived, "Notification updated");
        }
        Ok(n.clone())
    }

    fn insert(&self, id: Uuid, req: CreateNotificationRequest, is_escalation: bool) -> Notification {
        let mut notifications = self.notifications.write();

        let mut created_at = self.clock.now();
        if let Some(newest) = notifications.first() {
            if created_at <= newest.created_at {
                created_at = newest.created_at + Duration::microseconds(1);
            }
        }

        let notification = Notification {
            id,
            title: req.title,
            message: req.message,
            notification_type: req.notification_type,
            category: req.category,
            priority: req.priority,
            read: false,
            archived: false,
            is_escalation,
            action_url: req.action_url,
            action_label: req.action_label,
            metadata: req.metadata,
            created_at,
            updated_at: created_at,
        };
        notifications.insert(0, notification.clone());

        tracing::info!(
            notification_id = %notification.id,
            category = %notification.category,
            priority = %notification.priority,
            is_escalation,
            "Notification created"
        );

        notification
    }

    // ------------------------------------------------------------------------
    // Commercial events
    // ------------------------------------------------------------------------

    pub fn create_opportunity_notification(
        &self,
        event: &OpportunityEvent,
        data: &OpportunityData,
    ) -> ServiceResult<Notification> {
        self.create_notification(commercial::opportunity_notification(event, data))
    }

    pub fn create_engineer_notification(
        &self,
        event: &EngineerEvent,
        data: &EngineerData,
    ) -> ServiceResult<Notification> {
        self.create_notification(commercial::engineer_notification(event, data))
    }

    pub fn create_manufacturer_rep_notification(
        &self,
        event: &ManufacturerRepEvent,
        data: &ManufacturerRepData,
    ) -> ServiceResult<Notification> {
        self.create_notification(commercial::manufacturer_rep_notification(event, data))
    }

    /// One urgent notification per team when the opportunity clears the threshold
    pub fn notify_large_opportunity_team(
        &self,
        data: &LargeOpportunityData,
    ) -> ServiceResult<Vec<Notification>> {
        let requests = commercial::team_notifications(data, self.config.team_notification_threshold);
        if requests.is_empty() {
            tracing::debug!(
                opportunity_id = %data.opportunity_id,
                estimated_value = ?data.estimated_value,
                "Opportunity below team notification threshold"
            );
        }
        requests
            .into_iter()
            .map(|req| self.create_notification(req))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Preferences
    // ------------------------------------------------------------------------

    pub fn get_preferences(&self) -> Option<NotificationPreferences> {
        self.preferences.read().clone()
    }

    /// Stored preferences, or the defaults when none were saved
    pub fn effective_preferences(&self) -> NotificationPreferences {
        self.get_preferences()
            .unwrap_or_else(|| NotificationPreferences::defaults(self.clock.now()))
    }

    pub fn update_preferences(&self, req: UpdatePreferencesRequest) -> ServiceResult<NotificationPreferences> {
        let now = self.clock.now();
        let mut preferences = self.preferences.write();
        let base = preferences
            .clone()
            .unwrap_or_else(|| NotificationPreferences::defaults(now));
        let updated = req.apply(base, now).map_err(ServiceError::Validation)?;
        *preferences = Some(updated.clone());
        tracing::info!("Notification preferences updated");
        Ok(updated)
    }

    // ------------------------------------------------------------------------
    // Escalation rules and jobs
    // ------------------------------------------------------------------------

    pub fn get_escalation_rules(&self) -> Vec<EscalationRule> {
        self.escalation.list_rules()
    }

    pub fn get_escalation_rule(&self, id: Uuid) -> ServiceResult<EscalationRule> {
        self.escalation.get_rule(id)
    }

    pub fn create_escalation_rule(&self, req: CreateEscalationRuleRequest) -> ServiceResult<EscalationRule> {
        self.escalation.create_rule(req, self.clock.now())
    }

    pub fn update_escalation_rule(
        &self,
        id: Uuid,
        req: UpdateEscalationRuleRequest,
    ) -> ServiceResult<EscalationRule> {
        self.escalation.update_rule(id, req, self.clock.now())
    }

    pub fn delete_escalation_rule(&self, id: Uuid) -> ServiceResult<()> {
        self.escalation.delete_rule(id, self.clock.now())
    }

    pub fn remove_escalation_step(&self, id: Uuid, step_number: u32) -> ServiceResult<EscalationRule> {
        self.escalation.remove_step(id, step_number, self.clock.now())
    }

    pub fn pending_escalation_count(&self) -> usize {
        self.escalation.pending_count()
    }

    pub fn get_escalation_jobs(&self, query: &EscalationJobQuery) -> Vec<EscalationJob> {
        self.escalation.list_jobs(query)
    }

    // ------------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------------

    pub fn get_notification_templates(&self) -> Vec<NotificationTemplate> {
        self.templates.list()
    }

    pub fn get_notification_template(&self, id: Uuid) -> ServiceResult<NotificationTemplate> {
        self.templates.get(id)
    }

    pub fn create_notification_template(&self, req: CreateTemplateRequest) -> ServiceResult<NotificationTemplate> {
        self.templates.create(req, self.clock.now())
    }

    pub fn update_notification_template(
        &self,
        id: Uuid,
        req: UpdateTemplateRequest,
    ) -> ServiceResult<NotificationTemplate> {
        self.templates.update(id, req, self.clock.now())
    }

    pub fn delete_notification_template(&self, id: Uuid) -> ServiceResult<()> {
        self.templates.delete(id)
    }

    pub fn preview_template(&self, id: Uuid, variables: &Map<String, Value>) -> ServiceResult<RenderedTemplate> {
        self.templates.preview(id, variables)
    }

    // ------------------------------------------------------------------------
    // Escalation sweep
    // ------------------------------------------------------------------------

    /// Resolve every pending escalation job that is due
    pub fn process_due_escalations(&self) -> SweepReport {
        let _sweep = self.sweep_lock.lock();
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for job in self.escalation.due_jobs(now) {
            let original = self
                .notifications
                .read()
                .iter()
                .find(|n| n.id == job.notification_id)
                .cloned();

            let Some(original) = original else {
                if self.escalation.resolve(job.id, JobStatus::Suppressed, None, now) {
                    tracing::info!(job_id = %job.id, notification_id = %job.notification_id, "Escalation suppressed, original notification deleted");
                    report.suppressed += 1;
                }
                continue;
            };

            if job.step.conditions.still_unread && original.read {
                if self.escalation.resolve(job.id, JobStatus::Suppressed, None, now) {
                    tracing::info!(job_id = %job.id, notification_id = %original.id, "Escalation suppressed, notification already read");
                    report.suppressed += 1;
                }
                continue;
            }

            let escalation_id = Uuid::new_v4();
            if !self
                .escalation
                .resolve(job.id, JobStatus::Fired, Some(escalation_id), now)
            {
                continue;
            }

            let escalation = self.insert(escalation_id, escalation_request(&job, &original), true);
            tracing::info!(
                job_id = %job.id,
                rule_id = %job.rule_id,
                step = job.step.step_number,
                notification_id = %original.id,
                escalation_id = %escalation.id,
                "Escalation fired"
            );
            self.deliver(&job, &original, &escalation, now);
            report.fired += 1;
        }

        report
    }

    fn deliver(&self, job: &EscalationJob, original: &Notification, escalation: &Notification, now: DateTime<Utc>) {
        let (subject, body) = match self.render_step(job, original) {
            Ok(rendered) => (rendered.subject, rendered.body),
            Err(reason) => {
                tracing::warn!(
                    job_id = %job.id,
                    template = %job.step.template,
                    reason = %reason,
                    "Escalation template unavailable, delivering notification text"
                );
                (escalation.title.clone(), escalation.message.clone())
            }
        };

        let preferences = self.effective_preferences();
        let (deliveries, held) = plan_deliveries(escalation, &job.step, &preferences, &subject, &body, now);
        if held > 0 {
            tracing::info!(escalation_id = %escalation.id, held, "Deliveries held back by preferences");
        }
        for delivery in &deliveries {
            self.dispatcher.deliver(delivery);
        }
    }

    fn render_step(&self, job: &EscalationJob, original: &Notification) -> Result<RenderedTemplate, String> {
        let template = self
            .templates
            .find_active(&job.step.template)
            .ok_or_else(|| "no active template with that name".to_string())?;
        template
            .render(&template_variables(job, original))
            .map_err(|e| e.to_string())
    }
}

fn escalation_request(job: &EscalationJob, original: &Notification) -> CreateNotificationRequest {
    let mut req = CreateNotificationRequest::new(
        original.category,
        format!("Escalation: {}", original.title),
        format!(
            "Rule \"{}\" step {}: {}",
            job.rule_name, job.step.step_number, original.message
        ),
    )
    .with_priority(NotificationPriority::Urgent)
    .with_type(NotificationType::Warning);

    req.action_url = original.action_url.clone();
    req.action_label = original.action_label.clone();
    req.metadata = original.metadata.clone();
    req.metadata
        .insert(keys::ESCALATION_RULE_ID.into(), Value::String(job.rule_id.to_string()));
    req.metadata
        .insert(keys::ESCALATION_STEP.into(), Value::from(job.step.step_number));
    req.metadata.insert(
        keys::ORIGINAL_NOTIFICATION_ID.into(),
        Value::String(original.id.to_string()),
    );
    req
}

/// Variables available to escalation templates
fn template_variables(job: &EscalationJob, original: &Notification) -> Map<String, Value> {
    let mut vars: Map<String, Value> = original
        .metadata
        .iter()
        .filter(|(_, v)| !v.is_object() && !v.is_array() && !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if let Some(value) = original.metadata_f64(keys::ESTIMATED_VALUE) {
        vars.insert(keys::ESTIMATED_VALUE.into(), Value::String(format_currency(value)));
    }
    vars.insert("title".into(), Value::String(original.title.clone()));
    vars.insert("message".into(), Value::String(original.message.clone()));
    vars.insert("rule_name".into(), Value::String(job.rule_name.clone()));
    vars.insert("step_number".into(), Value::from(job.step.step_number));
    vars
}
