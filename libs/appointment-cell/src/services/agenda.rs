// libs/appointment-cell/src/services/agenda.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{
    Appointment, AppointmentError, AppointmentQuery, AppointmentRecord, AppointmentStatus,
    DaySummary,
};
use crate::services::store::ClinicStore;
use crate::services::ClinicContext;

/// Read side used by the calendar, the dentist agenda and the dashboard.
pub struct AgendaService {
    store: Arc<dyn ClinicStore>,
}

impl AgendaService {
    pub fn new(context: &ClinicContext) -> Self {
        Self {
            store: Arc::clone(&context.store),
        }
    }

    pub async fn get_appointment(&self, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        self.store
            .find_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    pub async fn list_appointments(
        &self,
        query: &AppointmentQuery,
    ) -> Result<Vec<AppointmentRecord>, AppointmentError> {
        self.store.list_appointments(query).await
    }

    pub async fn day_summary(&self, date: NaiveDate) -> Result<DaySummary, AppointmentError> {
        let query = AppointmentQuery {
            date: Some(date),
            ..AppointmentQuery::default()
        };
        let records = self.store.list_appointments(&query).await?;

        let count = |status: AppointmentStatus| {
            records.iter().filter(|r| r.appointment.status == status).count()
        };

        let summary = DaySummary {
            date,
            pending: count(AppointmentStatus::Pending),
            completed: count(AppointmentStatus::Completed),
            cancelled: count(AppointmentStatus::Cancelled),
            absent: count(AppointmentStatus::Absent),
        };
        debug!("Summary for {}: {:?}", date, summary);
        Ok(summary)
    }
}
