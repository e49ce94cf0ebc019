//! External delivery of fired escalation steps
//!
//! A fired step fans out to every recipient × method pair the current preferences
//! allow. Real email/SMS/push gateways live behind [`Dispatcher`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::escalation::EscalationStep;
use crate::domain::notifications::Notification;
use crate::domain::preferences::{NotificationMethod, NotificationPreferences};

/// One message to one recipient over one channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
    pub notification_id: Uuid,
    pub recipient: String,
    pub method: NotificationMethod,
    pub subject: String,
    pub body: String,
}

/// Sink for outbound deliveries
pub trait Dispatcher: Send + Sync {
    fn deliver(&self, delivery: &Delivery);
}

/// Logs deliveries instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDispatcher;

impl Dispatcher for TracingDispatcher {
    fn deliver(&self, delivery: &Delivery) {
        tracing::info!(
            notification_id = %delivery.notification_id,
            recipient = %delivery.recipient,
            method = %delivery.method,
            subject = %delivery.subject,
            "Escalation delivered"
        );
    }
}

/// Deliveries allowed for `escalation` under `prefs`, plus how many were held back
pub fn plan_deliveries(
    escalation: &Notification,
    step: &EscalationStep,
    prefs: &NotificationPreferences,
    subject: &str,
    body: &str,
    at: DateTime<Utc>,
) -> (Vec<Delivery>, usize) {
    let mut deliveries = Vec::new();
    let mut held = 0;

    for recipient in step.recipients.iter().filter(|r| !r.trim().is_empty()) {
        for &method in &step.notification_methods {
            if !prefs.allows(escalation.category, escalation.priority, method, at) {
                held += 1;
                continue;
            }
            deliveries.push(Delivery {
                notification_id: escalation.id,
                recipient: recipient.clone(),
                method,
                subject: subject.to_string(),
                body: body.to_string(),
            });
        }
    }

    (deliveries, held)
}
