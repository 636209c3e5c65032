// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use notification_cell::services::{deliver, templates};
use notification_cell::NotificationDispatcher;

use crate::clock::Clock;
use crate::models::{
    AppointmentError, AppointmentQuery, AppointmentStatus, BookAppointmentRequest,
    BookingOutcome, NewAppointment, SchedulingConfig,
};
use crate::services::calendar::is_offerable_date;
use crate::services::duration::compute_end;
use crate::services::store::ClinicStore;
use crate::services::ClinicContext;

pub struct BookingService {
    store: Arc<dyn ClinicStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    scheduling: SchedulingConfig,
}

impl BookingService {
    pub fn new(context: &ClinicContext) -> Self {
        Self {
            store: Arc::clone(&context.store),
            dispatcher: Arc::clone(&context.dispatcher),
            clock: Arc::clone(&context.clock),
            scheduling: context.scheduling.clone(),
        }
    }

    /// Validates and stores a new Pending appointment, then emails the
    /// patient a confirmation. The email result never undoes the booking.
    #[instrument(skip(self, request), fields(dentist = %request.dentist_id, date = %request.date))]
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<BookingOutcome, AppointmentError> {
        let patient_id = request.patient_id.trim();
        if patient_id.is_empty() {
            return Err(AppointmentError::IneligiblePatient("No patient selected".to_string()));
        }

        let patient = self.store
            .find_patient(patient_id)
            .await?
            .ok_or_else(|| {
                AppointmentError::IneligiblePatient(format!("Patient {} is not registered", patient_id))
            })?;

        if !patient.has_enrollment_report {
            warn!("Booking refused for patient {} without enrollment report", patient.id);
            return Err(AppointmentError::IneligiblePatient(format!(
                "Patient {} has no enrollment report on file",
                patient.id
            )));
        }

        let dentist_id = request.dentist_id.trim();
        if dentist_id.is_empty() {
            return Err(AppointmentError::DentistRequired);
        }

        if !self.scheduling.is_grid_slot(request.start_time) {
            return Err(AppointmentError::InvalidSlot(request.start_time.format("%H:%M").to_string()));
        }

        if !is_offerable_date(request.date, self.clock.today()) {
            return Err(AppointmentError::InvalidDate(request.date));
        }

        let end_time = compute_end(&self.scheduling, request.start_time, request.appointment_type)
            .ok_or_else(|| AppointmentError::InvalidSlot(request.start_time.format("%H:%M").to_string()))?;

        let pending = self.store
            .list_appointments(&AppointmentQuery::pending_for(dentist_id, request.date))
            .await?;

        if pending.iter().any(|r| r.appointment.start_time == request.start_time) {
            debug!("Slot {} on {} already pending", request.start_time, request.date);
            return Err(AppointmentError::SlotTaken);
        }

        let new_appointment = NewAppointment {
            date: request.date,
            start_time: request.start_time,
            end_time,
            appointment_type: request.appointment_type,
            status: AppointmentStatus::Pending,
            patient_id: patient.id.clone(),
            dentist_id: dentist_id.to_string(),
            notes: request.notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            emergency: request.appointment_type.is_emergency(),
        };

        let appointment = self.store.insert_appointment(&new_appointment).await?;
        info!("Appointment {} booked for patient {} at {} {}",
              appointment.id, appointment.patient_id, appointment.date, appointment.start_time);

        let message = patient
            .summary()
            .notice_for(&appointment)
            .map(|notice| templates::booking_confirmation(&notice));
        let notification = deliver(self.dispatcher.as_ref(), message).await;

        Ok(BookingOutcome { appointment, notification })
    }
}
