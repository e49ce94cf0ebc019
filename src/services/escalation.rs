//! Escalation engine
//!
//! Holds escalation rules and the schedule of pending escalation jobs. New
//! notifications are matched against active rules; each step of a matching rule
//! becomes an independent job due `delay_minutes` after the notification was
//! created. The notification service sweeps due jobs and decides whether they fire.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::escalation::{
    renumber_steps, validate_steps, CreateEscalationRuleRequest, EscalationConditions,
    EscalationJob, EscalationJobQuery, EscalationRule, EscalationStep, JobStatus,
    MissingMetadataPolicy, StepConditions, UpdateEscalationRuleRequest,
};
use crate::domain::notifications::{Notification, NotificationCategory};
use crate::domain::preferences::NotificationMethod;
use crate::error::{ServiceError, ServiceResult};

const ENTITY: &str = "escalation rule";

#[derive(Debug)]
pub struct EscalationEngine {
    policy: MissingMetadataPolicy,
    rules: RwLock<Vec<EscalationRule>>,
    jobs: RwLock<Vec<EscalationJob>>,
}

impl EscalationEngine {
    pub fn new(policy: MissingMetadataPolicy) -> Self {
        Self {
            policy,
            rules: RwLock::new(Vec::new()),
            jobs: RwLock::new(Vec::new()),
        }
    }

    // ------------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------------

    pub fn list_rules(&self) -> Vec<EscalationRule> {
        self.rules.read().clone()
    }

    pub fn get_rule(&self, id: Uuid) -> ServiceResult<EscalationRule> {
        self.rules
            .read()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(ENTITY, id))
    }

    pub fn create_rule(
        &self,
        req: CreateEscalationRuleRequest,
        now: DateTime<Utc>,
    ) -> ServiceResult<EscalationRule> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::Validation("rule name is required".into()));
        }
        validate_steps(&req.escalation_steps).map_err(ServiceError::Validation)?;

        let mut steps = req.escalation_steps;
        renumber_steps(&mut steps);

        let rule = EscalationRule {
            id: Uuid::new_v4(),
            name,
            description: req.description,
            category: req.category,
            conditions: req.conditions,
            escalation_steps: steps,
            is_active: req.is_active,
            created_at: now,
            updated_at: now,
        };
        self.rules.write().push(rule.clone());

        tracing::info!(
            rule_id = %rule.id,
            name = %rule.name,
            category = %rule.category,
            steps = rule.escalation_steps.len(),
            "Escalation rule created"
        );

        Ok(rule)
    }

    pub fn update_rule(
        &self,
        id: Uuid,
        req: UpdateEscalationRuleRequest,
        now: DateTime<Utc>,
    ) -> ServiceResult<EscalationRule> {
        let mut steps_changed = false;
        let updated = {
            let mut rules = self.rules.write();
            let rule = rules
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| ServiceError::not_found(ENTITY, id))?;

            let mut updated = rule.clone();
            if let Some(name) = req.name {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(ServiceError::Validation("rule name is required".into()));
                }
                updated.name = name;
            }
            if let Some(description) = req.description {
                updated.description = description;
            }
            if let Some(category) = req.category {
                updated.category = category;
            }
            if let Some(conditions) = req.conditions {
                updated.conditions = conditions;
            }
            if let Some(mut steps) = req.escalation_steps {
                validate_steps(&steps).map_err(ServiceError::Validation)?;
                renumber_steps(&mut steps);
                updated.escalation_steps = steps;
                steps_changed = true;
            }
            if let Some(is_active) = req.is_active {
                updated.is_active = is_active;
            }
            updated.updated_at = now;

            *rule = updated.clone();
            updated
        };

        tracing::info!(rule_id = %id, is_active = updated.is_active, "Escalation rule updated");

        if !updated.is_active {
            self.cancel_pending(id, now);
        } else if steps_changed {
            self.reconcile_pending(&updated, now);
        }

        Ok(updated)
    }

    pub fn delete_rule(&self, id: Uuid, now: DateTime<Utc>) -> ServiceResult<()> {
        {
            let mut rules = self.rules.write();
            let before = rules.len();
            rules.retain(|r| r.id != id);
            if rules.len() == before {
                return Err(ServiceError::not_found(ENTITY, id));
            }
        }
        let cancelled = self.cancel_pending(id, now);
        tracing::info!(rule_id = %id, cancelled_jobs = cancelled, "Escalation rule deleted");
        Ok(())
    }

    /// Remove one step and renumber the rest
    pub fn remove_step(
        &self,
        id: Uuid,
        step_number: u32,
        now: DateTime<Utc>,
    ) -> ServiceResult<EscalationRule> {
        let updated = {
            let mut rules = self.rules.write();
            let rule = rules
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| ServiceError::not_found(ENTITY, id))?;
            if rule.escalation_steps.len() == 1
                && rule.escalation_steps[0].step_number == step_number
            {
                return Err(ServiceError::Validation(
                    "cannot remove the only step of a rule".into(),
                ));
            }
            rule.remove_step(step_number)
                .ok_or_else(|| ServiceError::not_found("escalation step", step_number))?;
            rule.updated_at = now;
            rule.clone()
        };

        self.reconcile_pending(&updated, now);
        tracing::info!(rule_id = %id, step_number, "Escalation step removed");
        Ok(updated)
    }

    // ------------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------------

    /// Schedule one job per step of every active rule matching `notification`
    pub fn schedule_for(&self, notification: &Notification, now: DateTime<Utc>) -> Vec<EscalationJob> {
        if notification.is_escalation {
            return Vec::new();
        }

        let scheduled: Vec<EscalationJob> = self
            .rules
            .read()
            .iter()
            .filter(|rule| rule.applies_to(notification, self.policy))
            .flat_map(|rule| {
                rule.escalation_steps.iter().map(move |step| EscalationJob {
                    id: Uuid::new_v4(),
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    notification_id: notification.id,
                    step: step.clone(),
                    fire_at: notification.created_at
                        + Duration::minutes(i64::from(step.delay_minutes)),
                    status: JobStatus::Pending,
                    scheduled_at: now,
                    resolved_at: None,
                    escalation_notification_id: None,
                })
            })
            .collect();

        for job in &scheduled {
            tracing::info!(
                job_id = %job.id,
                rule_id = %job.rule_id,
                notification_id = %job.notification_id,
                step = job.step.step_number,
                fire_at = %job.fire_at,
                "Escalation step scheduled"
            );
        }

        self.jobs.write().extend(scheduled.iter().cloned());
        scheduled
    }

    /// Pending jobs due at `now`, earliest first
    pub fn due_jobs(&self, now: DateTime<Utc>) -> Vec<EscalationJob> {
        let mut due: Vec<EscalationJob> = self
            .jobs
            .read()
            .iter()
            .filter(|j| j.status == JobStatus::Pending && j.fire_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|j| j.fire_at);
        due
    }

    /// Record the outcome of a pending job; returns false if it was no longer pending
    pub fn resolve(
        &self,
        job_id: Uuid,
        status: JobStatus,
        escalation_notification_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> bool {
        let mut jobs = self.jobs.write();
        match jobs
            .iter_mut()
            .find(|j| j.id == job_id && j.status == JobStatus::Pending)
        {
            Some(job) => {
                job.status = status;
                job.resolved_at = Some(now);
                job.escalation_notification_id = escalation_notification_id;
                true
            }
            None => false,
        }
    }

    /// Cancel every pending job of a rule
    pub fn cancel_pending(&self, rule_id: Uuid, now: DateTime<Utc>) -> usize {
        let mut cancelled = 0;
        for job in self
            .jobs
            .write()
            .iter_mut()
            .filter(|j| j.rule_id == rule_id && j.status == JobStatus::Pending)
        {
            job.status = JobStatus::Cancelled;
            job.resolved_at = Some(now);
            cancelled += 1;
        }
        if cancelled > 0 {
            tracing::info!(rule_id = %rule_id, cancelled, "Pending escalation jobs cancelled");
        }
        cancelled
    }

    /// Follow step edits on pending jobs of `rule`: jobs take their step's current
    /// number, and jobs whose step left the rule are cancelled
    fn reconcile_pending(&self, rule: &EscalationRule, now: DateTime<Utc>) -> usize {
        let mut cancelled = 0;
        for job in self
            .jobs
            .write()
            .iter_mut()
            .filter(|j| j.rule_id == rule.id && j.status == JobStatus::Pending)
        {
            match rule.step_number_of(job.step.id) {
                Some(number) => job.step.step_number = number,
                None => {
                    job.status = JobStatus::Cancelled;
                    job.resolved_at = Some(now);
                    cancelled += 1;
                }
            }
        }
        if cancelled > 0 {
            tracing::info!(rule_id = %rule.id, cancelled, "Pending jobs of removed escalation steps cancelled");
        }
        cancelled
    }

    pub fn pending_count(&self) -> usize {
        self.jobs
            .read()
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .count()
    }

    pub fn list_jobs(&self, query: &EscalationJobQuery) -> Vec<EscalationJob> {
        let mut jobs: Vec<EscalationJob> = self
            .jobs
            .read()
            .iter()
            .filter(|j| query.status.map_or(true, |s| j.status == s))
            .filter(|j| query.rule_id.map_or(true, |id| j.rule_id == id))
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.fire_at);
        jobs
    }
}

/// Rules available out of the box; template names match `default_templates`
pub fn default_rules() -> Vec<CreateEscalationRuleRequest> {
    vec![
        CreateEscalationRuleRequest {
            name: "High-Value Opportunity Follow-up".into(),
            description: Some(
                "Escalate unread opportunity alerts above $500,000 to sales leadership".into(),
            ),
            category: NotificationCategory::Opportunity,
            conditions: EscalationConditions {
                value_threshold: Some(500_000.0),
                ..Default::default()
            },
            escalation_steps: vec![
                EscalationStep {
                    id: Uuid::new_v4(),
                    step_number: 1,
                    delay_minutes: 30,
                    recipients: vec!["sales-manager".into()],
                    notification_methods: vec![NotificationMethod::Email, NotificationMethod::Push],
                    template: "high-value-follow-up".into(),
                    conditions: StepConditions { still_unread: true },
                },
                EscalationStep {
                    id: Uuid::new_v4(),
                    step_number: 2,
                    delay_minutes: 120,
                    recipients: vec!["regional-director".into(), "sales-manager".into()],
                    notification_methods: vec![NotificationMethod::Email, NotificationMethod::Sms],
                    template: "high-value-director-escalation".into(),
                    conditions: StepConditions { still_unread: true },
                },
            ],
            is_active: true,
        },
        CreateEscalationRuleRequest {
            name: "Engineer Follow-up Overdue".into(),
            description: Some("Remind the account owner when an engineer follow-up is ignored".into()),
            category: NotificationCategory::Engineer,
            conditions: EscalationConditions::default(),
            escalation_steps: vec![EscalationStep {
                id: Uuid::new_v4(),
                step_number: 1,
                delay_minutes: 24 * 60,
                recipients: vec!["account-owner".into()],
                notification_methods: vec![NotificationMethod::Email],
                template: "engineer-follow-up-reminder".into(),
                conditions: StepConditions { still_unread: true },
            }],
            is_active: true,
        },
    ]
}
