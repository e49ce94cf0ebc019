//! Notification preference domain types
//!
//! Per-user delivery preferences: global channel toggles, per-category settings,
//! quiet hours and delivery frequency.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::notifications::{NotificationCategory, NotificationPriority};

/// External channel a notification can be delivered through
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationMethod {
    Email,
    Push,
    Sms,
}

impl std::fmt::Display for NotificationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Email => "email",
            Self::Push => "push",
            Self::Sms => "sms",
        };
        f.write_str(s)
    }
}

/// Delivery frequency; only immediate delivery is implemented
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFrequency {
    #[default]
    Immediate,
    Batched,
}

/// Settings for one notification category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryPreference {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub email: bool,
    #[serde(default = "default_true")]
    pub push: bool,
    /// Minimum priority that is delivered outside the app
    #[serde(default = "default_min_priority")]
    pub priority: NotificationPriority,
}

impl Default for CategoryPreference {
    fn default() -> Self {
        Self {
            enabled: true,
            email: true,
            push: true,
            priority: default_min_priority(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_priority() -> NotificationPriority {
    NotificationPriority::Low
}

/// Window during which push and sms deliveries are held back
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuietHours {
    #[serde(default)]
    pub enabled: bool,
    /// "HH:MM", UTC
    pub start_time: String,
    /// "HH:MM", UTC; may be earlier than start_time to wrap past midnight
    pub end_time: String,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start_time: "22:00".to_string(),
            end_time: "07:00".to_string(),
        }
    }
}

impl QuietHours {
    fn bounds(&self) -> Result<(NaiveTime, NaiveTime), String> {
        let parse = |s: &str| {
            NaiveTime::parse_from_str(s, "%H:%M")
                .map_err(|_| format!("invalid quiet hours time '{}', expected HH:MM", s))
        };
        Ok((parse(&self.start_time)?, parse(&self.end_time)?))
    }

    pub fn validate(&self) -> Result<(), String> {
        self.bounds().map(|_| ())
    }

    /// Whether `time` falls inside the window (start inclusive, end exclusive)
    pub fn contains(&self, time: NaiveTime) -> bool {
        if !self.enabled {
            return false;
        }
        let Ok((start, end)) = self.bounds() else {
            return false;
        };
        if start <= end {
            time >= start && time < end
        } else {
            time >= start || time < end
        }
    }
}

/// Per-user notification preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationPreferences {
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub categories: BTreeMap<NotificationCategory, CategoryPreference>,
    pub quiet_hours: QuietHours,
    pub frequency: DeliveryFrequency,
    pub updated_at: DateTime<Utc>,
}

impl NotificationPreferences {
    pub fn defaults(now: DateTime<Utc>) -> Self {
        Self {
            email_notifications: true,
            push_notifications: true,
            categories: NotificationCategory::ALL
                .iter()
                .map(|c| (*c, CategoryPreference::default()))
                .collect(),
            quiet_hours: QuietHours::default(),
            frequency: DeliveryFrequency::Immediate,
            updated_at: now,
        }
    }

    pub fn category(&self, category: NotificationCategory) -> CategoryPreference {
        self.categories.get(&category).cloned().unwrap_or_default()
    }

    /// Whether a notification may go out through `method` at the given instant
    pub fn allows(
        &self,
        category: NotificationCategory,
        priority: NotificationPriority,
        method: NotificationMethod,
        at: DateTime<Utc>,
    ) -> bool {
        let pref = self.category(category);
        if !pref.enabled || priority < pref.priority {
            return false;
        }
        let quiet = self.quiet_hours.contains(at.time());
        match method {
            NotificationMethod::Email => self.email_notifications && pref.email,
            NotificationMethod::Push => self.push_notifications && pref.push && !quiet,
            NotificationMethod::Sms => !quiet,
        }
    }
}

/// Partial update for preferences; category entries replace by key
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct UpdatePreferencesRequest {
    #[serde(default)]
    pub email_notifications: Option<bool>,
    #[serde(default)]
    pub push_notifications: Option<bool>,
    #[serde(default)]
    pub categories: Option<BTreeMap<NotificationCategory, CategoryPreference>>,
    #[serde(default)]
    pub quiet_hours: Option<QuietHours>,
    #[serde(default)]
    pub frequency: Option<DeliveryFrequency>,
}

impl UpdatePreferencesRequest {
    /// Merge onto `base`, validating the result
    pub fn apply(
        self,
        mut base: NotificationPreferences,
        now: DateTime<Utc>,
    ) -> Result<NotificationPreferences, String> {
        if let Some(v) = self.email_notifications {
            base.email_notifications = v;
        }
        if let Some(v) = self.push_notifications {
            base.push_notifications = v;
        }
        if let Some(categories) = self.categories {
            base.categories.extend(categories);
        }
        if let Some(quiet_hours) = self.quiet_hours {
            quiet_hours.validate()?;
            base.quiet_hours = quiet_hours;
        }
        if let Some(frequency) = self.frequency {
            if frequency == DeliveryFrequency::Batched {
                return Err("batched delivery is not supported".to_string());
            }
            base.frequency = frequency;
        }
        base.updated_at = now;
        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_quiet_hours_wrap_midnight() {
        let quiet = QuietHours {
            enabled: true,
            start_time: "22:00".into(),
            end_time: "07:00".into(),
        };
        assert!(quiet.contains(at(23, 30).time()));
        assert!(quiet.contains(at(3, 0).time()));
        assert!(!quiet.contains(at(7, 0).time()));
        assert!(!quiet.contains(at(12, 0).time()));
    }

    #[test]
    fn test_quiet_hours_same_day_window() {
        let quiet = QuietHours {
            enabled: true,
            start_time: "12:00".into(),
            end_time: "13:00".into(),
        };
        assert!(quiet.contains(at(12, 30).time()));
        assert!(!quiet.contains(at(13, 0).time()));
    }

    #[test]
    fn test_disabled_quiet_hours_never_apply() {
        let quiet = QuietHours::default();
        assert!(!quiet.contains(at(23, 0).time()));
    }

    #[test]
    fn test_allows_respects_toggles_and_quiet_hours() {
        let mut prefs = NotificationPreferences::defaults(at(0, 0));
        let urgent = NotificationPriority::Urgent;
        let cat = NotificationCategory::Opportunity;

        assert!(prefs.allows(cat, urgent, NotificationMethod::Email, at(10, 0)));
        assert!(prefs.allows(cat, urgent, NotificationMethod::Push, at(10, 0)));

        prefs.email_notifications = false;
        assert!(!prefs.allows(cat, urgent, NotificationMethod::Email, at(10, 0)));

        prefs.quiet_hours.enabled = true;
        assert!(!prefs.allows(cat, urgent, NotificationMethod::Push, at(23, 0)));
        assert!(!prefs.allows(cat, urgent, NotificationMethod::Sms, at(23, 0)));
        assert!(prefs.allows(cat, urgent, NotificationMethod::Sms, at(10, 0)));
    }

    #[test]
    fn test_category_minimum_priority() {
        let mut prefs = NotificationPreferences::defaults(at(0, 0));
        prefs.categories.insert(
            NotificationCategory::Order,
            CategoryPreference {
                priority: NotificationPriority::High,
                ..Default::default()
            },
        );
        let cat = NotificationCategory::Order;
        assert!(!prefs.allows(cat, NotificationPriority::Medium, NotificationMethod::Email, at(9, 0)));
        assert!(prefs.allows(cat, NotificationPriority::Urgent, NotificationMethod::Email, at(9, 0)));
    }

    #[test]
    fn test_apply_merges_and_validates() {
        let base = NotificationPreferences::defaults(at(0, 0));
        let update = UpdatePreferencesRequest {
            push_notifications: Some(false),
            categories: Some(BTreeMap::from([(
                NotificationCategory::Quote,
                CategoryPreference {
                    enabled: false,
                    ..Default::default()
                },
            )])),
            ..Default::default()
        };
        let merged = update.apply(base, at(1, 0)).unwrap();
        assert!(!merged.push_notifications);
        assert!(merged.email_notifications);
        assert!(!merged.category(NotificationCategory::Quote).enabled);
        assert!(merged.category(NotificationCategory::Opportunity).enabled);
        assert_eq!(merged.updated_at, at(1, 0));
    }

    #[test]
    fn test_apply_rejects_bad_input() {
        let base = NotificationPreferences::defaults(at(0, 0));
        let bad_time = UpdatePreferencesRequest {
            quiet_hours: Some(QuietHours {
                enabled: true,
                start_time: "25:00".into(),
                end_time: "07:00".into(),
            }),
            ..Default::default()
        };
        assert!(bad_time.apply(base.clone(), at(1, 0)).is_err());

        let batched = UpdatePreferencesRequest {
            frequency: Some(DeliveryFrequency::Batched),
            ..Default::default()
        };
        assert!(batched.apply(base, at(1, 0)).is_err());
    }

    #[test]
    fn test_category_map_serializes_with_snake_case_keys() {
        let prefs = NotificationPreferences::defaults(at(0, 0));
        let json = serde_json::to_value(&prefs).unwrap();
        assert!(json["categories"]["manufacturer_rep"]["enabled"]
            .as_bool()
            .unwrap());
    }
}
