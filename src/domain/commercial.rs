//! Commercial sales event types and notification construction
//!
//! Each event kind is a tagged variant carrying the fields its message needs;
//! fields shared across kinds live in the entity payload and are optional where the
//! portal may not know them yet.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::notifications::{
    keys, CreateNotificationRequest, NotificationCategory, NotificationPriority, NotificationType,
};

/// Recipient groups for large-opportunity fan-out
pub const TEAM_RECIPIENTS: [&str; 3] = ["sales-team", "engineering-support", "management"];

const NOT_PROVIDED: &str = "not provided";

/// Opportunity fields shared by all opportunity events
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpportunityData {
    pub opportunity_id: String,
    pub project_name: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub estimated_value: Option<f64>,
    #[serde(default)]
    pub sales_phase: Option<String>,
    #[serde(default)]
    pub market_segment: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpportunityEvent {
    Created,
    Updated {
        #[serde(default)]
        changes: Vec<String>,
    },
    PhaseChanged {
        previous_phase: String,
        new_phase: String,
    },
    HighValue,
    QuoteReceived {
        manufacturer: String,
        quote_amount: f64,
    },
}

impl OpportunityEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated { .. } => "updated",
            Self::PhaseChanged { .. } => "phase_changed",
            Self::HighValue => "high_value",
            Self::QuoteReceived { .. } => "quote_received",
        }
    }

    pub fn priority(&self) -> NotificationPriority {
        match self {
            Self::HighValue => NotificationPriority::Urgent,
            Self::PhaseChanged { .. } => NotificationPriority::High,
            _ => NotificationPriority::Medium,
        }
    }

    fn notification_type(&self) -> NotificationType {
        match self {
            Self::HighValue | Self::QuoteReceived { .. } => NotificationType::Success,
            _ => NotificationType::Info,
        }
    }
}

/// Engineer contact fields shared by all engineer events
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineerData {
    pub engineer_id: String,
    pub name: String,
    #[serde(default)]
    pub firm: Option<String>,
    #[serde(default)]
    pub market_segment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineerEvent {
    RatingChanged {
        previous_rating: u8,
        new_rating: u8,
    },
    FollowUpDue {
        due_date: String,
    },
    InteractionLogged {
        interaction_type: String,
        #[serde(default)]
        summary: Option<String>,
    },
    OpportunityAssociated {
        opportunity_id: String,
        project_name: String,
    },
}

impl EngineerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RatingChanged { .. } => "rating_changed",
            Self::FollowUpDue { .. } => "follow_up_due",
            Self::InteractionLogged { .. } => "interaction_logged",
            Self::OpportunityAssociated { .. } => "opportunity_associated",
        }
    }

    pub fn priority(&self) -> NotificationPriority {
        match self {
            Self::FollowUpDue { .. } => NotificationPriority::High,
            _ => NotificationPriority::Medium,
        }
    }
}

/// Manufacturer rep fields shared by all rep events
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ManufacturerRepData {
    pub rep_id: String,
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub territory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManufacturerRepEvent {
    QuotaAlert {
        /// Percent of quota reached
        quota_attainment: f64,
    },
    PerformanceUpdate {
        summary: String,
    },
    TerritoryChange {
        previous_territory: String,
        new_territory: String,
    },
    OpportunityAssigned {
        opportunity_id: String,
        project_name: String,
    },
}

impl ManufacturerRepEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuotaAlert { .. } => "quota_alert",
            Self::PerformanceUpdate { .. } => "performance_update",
            Self::TerritoryChange { .. } => "territory_change",
            Self::OpportunityAssigned { .. } => "opportunity_assigned",
        }
    }

    pub fn priority(&self) -> NotificationPriority {
        match self {
            Self::QuotaAlert { .. } => NotificationPriority::High,
            _ => NotificationPriority::Medium,
        }
    }
}

/// Payload for the large-opportunity team fan-out
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LargeOpportunityData {
    pub opportunity_id: String,
    pub project_name: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub estimated_value: Option<f64>,
    #[serde(default)]
    pub market_segment: Option<String>,
}

/// Request body for opportunity notifications
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpportunityNotificationRequest {
    pub event: OpportunityEvent,
    pub data: OpportunityData,
}

/// Request body for engineer contact notifications
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineerNotificationRequest {
    pub event: EngineerEvent,
    pub data: EngineerData,
}

/// Request body for manufacturer rep notifications
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManufacturerRepNotificationRequest {
    pub event: ManufacturerRepEvent,
    pub data: ManufacturerRepData,
}

/// Format a dollar amount with thousands separators, e.g. `$1,250,000`
pub fn format_currency(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

fn currency_or_missing(amount: Option<f64>) -> String {
    amount
        .map(format_currency)
        .unwrap_or_else(|| NOT_PROVIDED.to_string())
}

fn insert_opt(request: &mut CreateNotificationRequest, key: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        request.metadata.insert(key.to_string(), value.into());
    }
}

pub fn opportunity_notification(
    event: &OpportunityEvent,
    data: &OpportunityData,
) -> CreateNotificationRequest {
    let customer = data.customer_name.as_deref().unwrap_or(NOT_PROVIDED);
    let value = currency_or_missing(data.estimated_value);

    let (title, message) = match event {
        OpportunityEvent::Created => (
            "New Commercial Opportunity".to_string(),
            format!(
                "{} for {} has been created with an estimated value of {}",
                data.project_name, customer, value
            ),
        ),
        OpportunityEvent::Updated { changes } => {
            let detail = if changes.is_empty() {
                String::new()
            } else {
                format!(": {}", changes.join(", "))
            };
            (
                "Opportunity Updated".to_string(),
                format!("{} has been updated{}", data.project_name, detail),
            )
        }
        OpportunityEvent::PhaseChanged {
            previous_phase,
            new_phase,
        } => (
            "Opportunity Phase Changed".to_string(),
            format!(
                "{} moved from {} to {}",
                data.project_name, previous_phase, new_phase
            ),
        ),
        OpportunityEvent::HighValue => (
            "High-Value Opportunity Alert".to_string(),
            format!(
                "{} for {} is valued at {} and needs immediate attention",
                data.project_name, customer, value
            ),
        ),
        OpportunityEvent::QuoteReceived {
            manufacturer,
            quote_amount,
        } => (
            "Quote Received".to_string(),
            format!(
                "{} submitted a quote of {} for {}",
                manufacturer,
                format_currency(*quote_amount),
                data.project_name
            ),
        ),
    };

    let mut request = CreateNotificationRequest::new(NotificationCategory::Opportunity, title, message)
        .with_priority(event.priority())
        .with_type(event.notification_type())
        .with_metadata(keys::EVENT_TYPE, event.as_str())
        .with_metadata("opportunity_id", data.opportunity_id.as_str())
        .with_metadata("project_name", data.project_name.as_str());
    request.action_url = Some(format!("/commercial/opportunities/{}", data.opportunity_id));
    request.action_label = Some("View Opportunity".to_string());

    insert_opt(&mut request, "customer_name", data.customer_name.clone());
    insert_opt(&mut request, keys::ESTIMATED_VALUE, data.estimated_value);
    insert_opt(&mut request, keys::MARKET_SEGMENT, data.market_segment.clone());
    insert_opt(&mut request, "assigned_to", data.assigned_to.clone());

    let phase = match event {
        OpportunityEvent::PhaseChanged { new_phase, .. } => Some(new_phase.clone()),
        _ => data.sales_phase.clone(),
    };
    insert_opt(&mut request, keys::SALES_PHASE, phase);

    match event {
        OpportunityEvent::PhaseChanged { previous_phase, .. } => {
            insert_opt(&mut request, "previous_phase", Some(previous_phase.clone()));
        }
        OpportunityEvent::QuoteReceived {
            manufacturer,
            quote_amount,
        } => {
            insert_opt(&mut request, "manufacturer", Some(manufacturer.clone()));
            insert_opt(&mut request, "quote_amount", Some(*quote_amount));
        }
        _ => {}
    }

    request
}

pub fn engineer_notification(event: &EngineerEvent, data: &EngineerData) -> CreateNotificationRequest {
    let who = match &data.firm {
        Some(firm) => format!("{} ({})", data.name, firm),
        None => data.name.clone(),
    };

    let (title, message, notification_type) = match event {
        EngineerEvent::RatingChanged {
            previous_rating,
            new_rating,
        } => (
            "Engineer Rating Changed",
            format!(
                "{} rating changed from {} to {}",
                who, previous_rating, new_rating
            ),
            NotificationType::Info,
        ),
        EngineerEvent::FollowUpDue { due_date } => (
            "Engineer Follow-up Due",
            format!("Follow-up with {} is due on {}", who, due_date),
            NotificationType::Warning,
        ),
        EngineerEvent::InteractionLogged {
            interaction_type,
            summary,
        } => (
            "Engineer Interaction Logged",
            match summary {
                Some(summary) => format!("{} with {}: {}", interaction_type, who, summary),
                None => format!("{} with {} was logged", interaction_type, who),
            },
            NotificationType::Info,
        ),
        EngineerEvent::OpportunityAssociated { project_name, .. } => (
            "Engineer Linked to Opportunity",
            format!("{} is now associated with {}", who, project_name),
            NotificationType::Success,
        ),
    };

    let mut request = CreateNotificationRequest::new(NotificationCategory::Engineer, title, message)
        .with_priority(event.priority())
        .with_type(notification_type)
        .with_metadata(keys::EVENT_TYPE, event.as_str())
        .with_metadata("engineer_id", data.engineer_id.as_str())
        .with_metadata("engineer_name", data.name.as_str());
    request.action_url = Some(format!("/commercial/engineers/{}", data.engineer_id));
    request.action_label = Some("View Engineer".to_string());

    insert_opt(&mut request, "firm", data.firm.clone());
    insert_opt(&mut request, keys::MARKET_SEGMENT, data.market_segment.clone());
    match event {
        EngineerEvent::RatingChanged { new_rating, .. } => {
            insert_opt(&mut request, "rating", Some(*new_rating));
        }
        EngineerEvent::FollowUpDue { due_date } => {
            insert_opt(&mut request, "due_date", Some(due_date.clone()));
        }
        EngineerEvent::OpportunityAssociated { opportunity_id, .. } => {
            insert_opt(&mut request, "opportunity_id", Some(opportunity_id.clone()));
        }
        EngineerEvent::InteractionLogged { .. } => {}
    }

    request
}

pub fn manufacturer_rep_notification(
    event: &ManufacturerRepEvent,
    data: &ManufacturerRepData,
) -> CreateNotificationRequest {
    let who = match &data.company {
        Some(company) => format!("{} ({})", data.name, company),
        None => data.name.clone(),
    };

    let (title, message, notification_type) = match event {
        ManufacturerRepEvent::QuotaAlert { quota_attainment } => (
            "Rep Quota Alert",
            format!("{} is at {:.0}% of quota", who, quota_attainment),
            NotificationType::Warning,
        ),
        ManufacturerRepEvent::PerformanceUpdate { summary } => (
            "Rep Performance Update",
            format!("{}: {}", who, summary),
            NotificationType::Info,
        ),
        ManufacturerRepEvent::TerritoryChange {
            previous_territory,
            new_territory,
        } => (
            "Rep Territory Change",
            format!(
                "{} moved from {} to {}",
                who, previous_territory, new_territory
            ),
            NotificationType::Info,
        ),
        ManufacturerRepEvent::OpportunityAssigned { project_name, .. } => (
            "Opportunity Assigned to Rep",
            format!("{} has been assigned to {}", project_name, who),
            NotificationType::Success,
        ),
    };

    let mut request =
        CreateNotificationRequest::new(NotificationCategory::ManufacturerRep, title, message)
            .with_priority(event.priority())
            .with_type(notification_type)
            .with_metadata(keys::EVENT_TYPE, event.as_str())
            .with_metadata("rep_id", data.rep_id.as_str())
            .with_metadata("rep_name", data.name.as_str());
    request.action_url = Some(format!("/commercial/manufacturer-reps/{}", data.rep_id));
    request.action_label = Some("View Rep".to_string());

    insert_opt(&mut request, "company", data.company.clone());
    let territory = match event {
        ManufacturerRepEvent::TerritoryChange { new_territory, .. } => Some(new_territory.clone()),
        _ => data.territory.clone(),
    };
    insert_opt(&mut request, "territory", territory);
    match event {
        ManufacturerRepEvent::QuotaAlert { quota_attainment } => {
            insert_opt(&mut request, "quota_attainment", Some(*quota_attainment));
        }
        ManufacturerRepEvent::OpportunityAssigned { opportunity_id, .. } => {
            insert_opt(&mut request, "opportunity_id", Some(opportunity_id.clone()));
        }
        _ => {}
    }

    request
}

/// One urgent notification per recipient group, or none below `threshold`
pub fn team_notifications(
    data: &LargeOpportunityData,
    threshold: f64,
) -> Vec<CreateNotificationRequest> {
    let Some(value) = data.estimated_value else {
        return Vec::new();
    };
    if value < threshold {
        return Vec::new();
    }

    TEAM_RECIPIENTS
        .iter()
        .map(|team| {
            let mut request = CreateNotificationRequest::new(
                NotificationCategory::Opportunity,
                format!("Large Opportunity: {}", data.project_name),
                format!(
                    "{} ({}) is valued at {}. Action required from {}.",
                    data.project_name,
                    data.customer_name.as_deref().unwrap_or(NOT_PROVIDED),
                    format_currency(value),
                    team
                ),
            )
            .with_priority(NotificationPriority::Urgent)
            .with_type(NotificationType::Warning)
            .with_metadata(keys::TEAM_NOTIFICATION, true)
            .with_metadata(keys::TARGET_TEAM, *team)
            .with_metadata("opportunity_id", data.opportunity_id.as_str())
            .with_metadata("project_name", data.project_name.as_str())
            .with_metadata(keys::ESTIMATED_VALUE, value);
            insert_opt(&mut request, keys::MARKET_SEGMENT, data.market_segment.clone());
            request.action_url = Some(format!("/commercial/opportunities/{}", data.opportunity_id));
            request.action_label = Some("View Opportunity".to_string());
            request
        })
        .collect()
}
