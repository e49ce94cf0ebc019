//! Stateful services: the notification store, escalation scheduling and delivery.

pub mod dispatch;
pub mod escalation;
pub mod notifications;
pub mod sweeper;
pub mod templates;

pub use dispatch::{Dispatcher, TracingDispatcher};
pub use notifications::{NotificationService, ServiceConfig};
pub use sweeper::spawn_escalation_sweeper;
