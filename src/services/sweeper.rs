//! Background escalation sweeper
//!
//! Periodically resolves due escalation jobs until shutdown is signalled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::notifications::NotificationService;

pub fn spawn_escalation_sweeper(
    service: Arc<NotificationService>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_secs = every.as_secs(), "Escalation sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = service.process_due_escalations();
                    if report.fired > 0 || report.suppressed > 0 {
                        tracing::info!(
                            fired = report.fired,
                            suppressed = report.suppressed,
                            "Escalation sweep complete"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Escalation sweeper stopped");
    })
}
