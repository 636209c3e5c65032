// libs/appointment-cell/src/services/reminder.rs
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, instrument};

use notification_cell::services::{deliver, templates};
use notification_cell::NotificationDispatcher;

use crate::clock::Clock;
use crate::models::{AppointmentError, AppointmentQuery, SweepReport};
use crate::services::store::ClinicStore;
use crate::services::ClinicContext;

/// Emails every patient with a Pending appointment tomorrow. Keeps no record
/// of what was sent, so a second run on the same day sends again.
pub struct ReminderSweepService {
    store: Arc<dyn ClinicStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
}

impl ReminderSweepService {
    pub fn new(context: &ClinicContext) -> Self {
        Self {
            store: Arc::clone(&context.store),
            dispatcher: Arc::clone(&context.dispatcher),
            clock: Arc::clone(&context.clock),
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<SweepReport, AppointmentError> {
        let target = self.clock
            .today()
            .succ_opt()
            .ok_or_else(|| AppointmentError::Validation("No day after the current date".to_string()))?;

        let records = self.store
            .list_appointments(&AppointmentQuery::pending_on(target))
            .await?;

        let sends = records.iter().map(|record| {
            let message = record
                .notice()
                .map(|notice| templates::appointment_reminder(&notice));
            deliver(self.dispatcher.as_ref(), message)
        });
        let outcomes = join_all(sends).await;

        let sent = outcomes.iter().filter(|o| o.is_sent()).count();
        let failed = outcomes.iter().filter(|o| o.is_failed()).count();
        let report = SweepReport {
            date: target,
            candidates: records.len(),
            sent,
            skipped: outcomes.len() - sent - failed,
            failed,
        };

        info!(
            "Reminder sweep for {}: {} sent, {} skipped, {} failed",
            report.date, report.sent, report.skipped, report.failed
        );
        Ok(report)
    }
}
