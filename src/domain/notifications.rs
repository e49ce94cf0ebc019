//! Notification domain types
//!
//! In-app notifications raised by commercial events, team fan-out and escalations.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Well-known metadata keys shared by the factory, the escalation engine and fan-out
pub mod keys {
    pub const ESTIMATED_VALUE: &str = "estimated_value";
    pub const SALES_PHASE: &str = "sales_phase";
    pub const MARKET_SEGMENT: &str = "market_segment";
    pub const EVENT_TYPE: &str = "event_type";
    pub const ESCALATION_RULE_ID: &str = "escalation_rule_id";
    pub const ESCALATION_STEP: &str = "escalation_step";
    pub const ORIGINAL_NOTIFICATION_ID: &str = "original_notification_id";
    pub const TEAM_NOTIFICATION: &str = "team_notification";
    pub const TARGET_TEAM: &str = "target_team";
}

/// Visual severity of a notification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    #[default]
    Info,
    Warning,
    Error,
    Success,
}

/// Business area a notification belongs to; escalation rules bind to one category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Opportunity,
    Engineer,
    ManufacturerRep,
    Quote,
    Order,
    Inventory,
    System,
}

impl NotificationCategory {
    pub const ALL: [NotificationCategory; 7] = [
        Self::Opportunity,
        Self::Engineer,
        Self::ManufacturerRep,
        Self::Quote,
        Self::Order,
        Self::Inventory,
        Self::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opportunity => "opportunity",
            Self::Engineer => "engineer",
            Self::ManufacturerRep => "manufacturer_rep",
            Self::Quote => "quote",
            Self::Order => "order",
            Self::Inventory => "inventory",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification priority, ordered from least to most pressing
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        };
        f.write_str(s)
    }
}

/// Notification entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    pub read: bool,
    pub archived: bool,
    /// Set on notifications emitted by the escalation engine; these never match rules
    pub is_escalation: bool,
    pub action_url: Option<String>,
    pub action_label: Option<String>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        !self.read && !self.archived
    }

    /// Numeric metadata value; numeric strings are accepted too
    pub fn metadata_f64(&self, key: &str) -> Option<f64> {
        match self.metadata.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key)?.as_str()
    }
}

/// Request to create a notification
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateNotificationRequest {
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub notification_type: NotificationType,
    pub category: NotificationCategory,
    #[serde(default)]
    pub priority: NotificationPriority,
    #[serde(default)]
    pub action_url: Option<String>,
    #[serde(default)]
    pub action_label: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl CreateNotificationRequest {
    pub fn new(
        category: NotificationCategory,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            notification_type: NotificationType::default(),
            category,
            priority: NotificationPriority::default(),
            action_url: None,
            action_label: None,
            metadata: Map::new(),
        }
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_type(mut self, notification_type: NotificationType) -> Self {
        self.notification_type = notification_type;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Filter for listing notifications; every absent field matches everything
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub categories: Option<Vec<NotificationCategory>>,
    pub types: Option<Vec<NotificationType>>,
    pub priorities: Option<Vec<NotificationPriority>>,
    pub read: Option<bool>,
    pub archived: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl NotificationFilter {
    pub fn matches(&self, n: &Notification) -> bool {
        if let Some(categories) = &self.categories {
            if !categories.contains(&n.category) {
                return false;
            }
        }
        if let Some(types) = &self.types {
            if !types.contains(&n.notification_type) {
                return false;
            }
        }
        if let Some(priorities) = &self.priorities {
            if !priorities.contains(&n.priority) {
                return false;
            }
        }
        if self.read.is_some_and(|read| read != n.read) {
            return false;
        }
        if self.archived.is_some_and(|archived| archived != n.archived) {
            return false;
        }
        if self.from.is_some_and(|from| n.created_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| n.created_at > to) {
            return false;
        }
        true
    }
}

/// Query params for listing notifications (sets are comma separated)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotificationQuery {
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub types: Option<String>,
    #[serde(default)]
    pub priorities: Option<String>,
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub archived: Option<bool>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationQuery> for NotificationFilter {
    type Error = String;

    fn try_from(q: NotificationQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            categories: parse_list(q.categories.as_deref())?,
            types: parse_list(q.types.as_deref())?,
            priorities: parse_list(q.priorities.as_deref())?,
            read: q.read,
            archived: q.archived,
            from: q.from,
            to: q.to,
        })
    }
}

fn parse_list<T: DeserializeOwned>(raw: Option<&str>) -> Result<Option<Vec<T>>, String> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            serde_json::from_value(Value::String(s.to_string()))
                .map_err(|_| format!("unknown filter value '{}'", s))
        })
        .collect::<Result<Vec<T>, String>>()
        .map(Some)
}

/// Unread count response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: usize,
}

/// Mark-all-read response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    pub marked_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(category: NotificationCategory) -> Notification {
        let now = Utc::now();
        Notification {
            id: Uuid::new_v4(),
            title: "t".into(),
            message: "m".into(),
            notification_type: NotificationType::Info,
            category,
            priority: NotificationPriority::Medium,
            read: false,
            archived: false,
            is_escalation: false,
            action_url: None,
            action_label: None,
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let n = sample(NotificationCategory::Quote);
        assert!(NotificationFilter::default().matches(&n));
    }

    #[test]
    fn test_filter_by_category_and_read() {
        let mut n = sample(NotificationCategory::Opportunity);
        let filter = NotificationFilter {
            categories: Some(vec![NotificationCategory::Opportunity]),
            read: Some(false),
            ..Default::default()
        };
        assert!(filter.matches(&n));
        n.read = true;
        assert!(!filter.matches(&n));
        n.category = NotificationCategory::Order;
        n.read = false;
        assert!(!filter.matches(&n));
    }

    #[test]
    fn test_filter_date_range_is_inclusive() {
        let n = sample(NotificationCategory::System);
        let filter = NotificationFilter {
            from: Some(n.created_at),
            to: Some(n.created_at),
            ..Default::default()
        };
        assert!(filter.matches(&n));
        let later = NotificationFilter {
            from: Some(n.created_at + Duration::seconds(1)),
            ..Default::default()
        };
        assert!(!later.matches(&n));
    }

    #[test]
    fn test_query_parses_comma_lists() {
        let query = NotificationQuery {
            categories: Some("opportunity, manufacturer_rep".into()),
            priorities: Some("urgent".into()),
            ..Default::default()
        };
        let filter = NotificationFilter::try_from(query).unwrap();
        assert_eq!(
            filter.categories,
            Some(vec![
                NotificationCategory::Opportunity,
                NotificationCategory::ManufacturerRep
            ])
        );
        assert_eq!(filter.priorities, Some(vec![NotificationPriority::Urgent]));
        assert!(filter.types.is_none());
    }

    #[test]
    fn test_query_rejects_unknown_values() {
        let query = NotificationQuery {
            types: Some("info,bogus".into()),
            ..Default::default()
        };
        let err = NotificationFilter::try_from(query).unwrap_err();
        assert!(err.contains("bogus"));
    }

    #[test]
    fn test_metadata_accessors() {
        let mut n = sample(NotificationCategory::Opportunity);
        n.metadata
            .insert(keys::ESTIMATED_VALUE.into(), Value::from(750_000));
        n.metadata
            .insert(keys::SALES_PHASE.into(), Value::from("proposal"));
        assert_eq!(n.metadata_f64(keys::ESTIMATED_VALUE), Some(750_000.0));
        assert_eq!(n.metadata_str(keys::SALES_PHASE), Some("proposal"));
        assert_eq!(n.metadata_f64(keys::MARKET_SEGMENT), None);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(NotificationPriority::Urgent > NotificationPriority::High);
        assert!(NotificationPriority::Low < NotificationPriority::Medium);
    }
}
