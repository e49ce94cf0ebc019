//! Escalation rule domain types
//!
//! A rule binds a notification category and trigger conditions to an ordered list
//! of escalation steps. Each matched step becomes a scheduled job that fires after
//! the step's delay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::notifications::{keys, Notification, NotificationCategory, NotificationPriority};
use super::preferences::NotificationMethod;

/// How a rule condition behaves when the notification lacks the metadata it inspects
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingMetadataPolicy {
    /// Absent metadata never blocks a rule
    #[default]
    Permissive,
    /// Absent metadata fails any condition that needs it
    Strict,
}

impl std::str::FromStr for MissingMetadataPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown missing-metadata policy '{}'", other)),
        }
    }
}

/// Trigger conditions; an absent field places no constraint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EscalationConditions {
    /// Minimum `estimated_value` in metadata
    #[serde(default)]
    pub value_threshold: Option<f64>,
    #[serde(default)]
    pub priority_level: Option<NotificationPriority>,
    /// Minutes; carried for display, not evaluated at match time
    #[serde(default)]
    pub time_threshold: Option<u32>,
    #[serde(default)]
    pub market_segment: Option<Vec<String>>,
    #[serde(default)]
    pub sales_phase: Option<Vec<String>>,
}

impl EscalationConditions {
    pub fn matches(&self, n: &Notification, policy: MissingMetadataPolicy) -> bool {
        let missing_passes = policy == MissingMetadataPolicy::Permissive;

        if let Some(threshold) = self.value_threshold {
            match n.metadata_f64(keys::ESTIMATED_VALUE) {
                Some(value) if value < threshold => return false,
                None if !missing_passes => return false,
                _ => {}
            }
        }

        if let Some(level) = self.priority_level {
            if n.priority != level {
                return false;
            }
        }

        let allowed = |list: &Option<Vec<String>>, key: &str| -> bool {
            let Some(list) = list else {
                return true;
            };
            match n.metadata_str(key) {
                Some(value) => list.iter().any(|v| v.eq_ignore_ascii_case(value)),
                None => missing_passes,
            }
        };

        allowed(&self.sales_phase, keys::SALES_PHASE)
            && allowed(&self.market_segment, keys::MARKET_SEGMENT)
    }
}

/// Guard evaluated when a step fires
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StepConditions {
    /// Only fire if the originating notification is still unread
    #[serde(default)]
    pub still_unread: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscalationStep {
    /// Stable across reorders; pending jobs follow their step by this id
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// 1-based; reassigned from list order on every write
    #[serde(default)]
    pub step_number: u32,
    /// Minutes after the triggering notification's creation
    pub delay_minutes: u32,
    pub recipients: Vec<String>,
    pub notification_methods: Vec<NotificationMethod>,
    /// Name of a notification template
    pub template: String,
    #[serde(default)]
    pub conditions: StepConditions,
}

/// Escalation rule entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EscalationRule {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: NotificationCategory,
    pub conditions: EscalationConditions,
    pub escalation_steps: Vec<EscalationStep>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EscalationRule {
    /// Whether this rule should schedule steps for `n`
    pub fn applies_to(&self, n: &Notification, policy: MissingMetadataPolicy) -> bool {
        self.is_active
            && !n.is_escalation
            && self.category == n.category
            && self.conditions.matches(n, policy)
    }

    /// Current number of the step with `step_id`, if it is still part of the rule
    pub fn step_number_of(&self, step_id: Uuid) -> Option<u32> {
        self.escalation_steps
            .iter()
            .find(|s| s.id == step_id)
            .map(|s| s.step_number)
    }

    /// Remove a step by number and close the gap
    pub fn remove_step(&mut self, step_number: u32) -> Option<EscalationStep> {
        let index = self
            .escalation_steps
            .iter()
            .position(|s| s.step_number == step_number)?;
        let removed = self.escalation_steps.remove(index);
        renumber_steps(&mut self.escalation_steps);
        Some(removed)
    }
}

/// Assign contiguous step numbers starting at 1, keeping list order
pub fn renumber_steps(steps: &mut [EscalationStep]) {
    for (i, step) in steps.iter_mut().enumerate() {
        step.step_number = i as u32 + 1;
    }
}

pub fn validate_steps(steps: &[EscalationStep]) -> Result<(), String> {
    if steps.is_empty() {
        return Err("a rule needs at least one escalation step".to_string());
    }
    for (i, step) in steps.iter().enumerate() {
        if step.recipients.iter().all(|r| r.trim().is_empty()) {
            return Err(format!("step {} has no recipients", i + 1));
        }
        if step.notification_methods.is_empty() {
            return Err(format!("step {} has no notification methods", i + 1));
        }
        if step.template.trim().is_empty() {
            return Err(format!("step {} has no template", i + 1));
        }
        if steps[..i].iter().any(|s| s.id == step.id) {
            return Err(format!("step {} repeats the id of an earlier step", i + 1));
        }
    }
    Ok(())
}

/// Request DTO for creating a rule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateEscalationRuleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: NotificationCategory,
    #[serde(default)]
    pub conditions: EscalationConditions,
    pub escalation_steps: Vec<EscalationStep>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Request DTO for updating a rule
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct UpdateEscalationRuleRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// Absent leaves the description alone; `null` clears it
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<NotificationCategory>,
    #[serde(default)]
    pub conditions: Option<EscalationConditions>,
    #[serde(default)]
    pub escalation_steps: Option<Vec<EscalationStep>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Lifecycle of a scheduled escalation step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    /// Escalation notification emitted
    Fired,
    /// Guard failed at fire time or the original notification is gone
    Suppressed,
    /// Rule deleted, deactivated or step removed before firing
    Cancelled,
}

/// One scheduled escalation step for one notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EscalationJob {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub rule_name: String,
    pub notification_id: Uuid,
    /// Step as configured when the job was scheduled
    pub step: EscalationStep,
    pub fire_at: DateTime<Utc>,
    pub status: JobStatus,
    pub scheduled_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Id of the emitted escalation notification, once fired
    pub escalation_notification_id: Option<Uuid>,
}

/// Query params for listing jobs
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EscalationJobQuery {
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub rule_id: Option<Uuid>,
}
