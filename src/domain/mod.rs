//! Domain types and DTOs
//!
//! Plain data and pure logic for notifications, preferences, templates,
//! escalation rules and commercial events. Accessed by module path, e.g.
//! `crate::domain::escalation::EscalationRule`.

pub mod commercial;
pub mod escalation;
pub mod notifications;
pub mod preferences;
pub mod templates;
