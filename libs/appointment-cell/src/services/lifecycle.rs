// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use notification_cell::services::{deliver, templates};
use notification_cell::{NotificationDispatcher, NotificationOutcome};

use crate::clock::Clock;
use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, ClinicalDetail, LifecycleOutcome,
    NewTreatment,
};
use crate::services::store::ClinicStore;
use crate::services::ClinicContext;

/// Pending → Completed | Cancelled | Absent. Every other move is refused.
pub struct LifecycleService {
    store: Arc<dyn ClinicStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
}

impl LifecycleService {
    pub fn new(context: &ClinicContext) -> Self {
        Self {
            store: Arc::clone(&context.store),
            dispatcher: Arc::clone(&context.dispatcher),
            clock: Arc::clone(&context.clock),
        }
    }

    #[instrument(skip(self))]
    pub async fn cancel_appointment(&self, appointment_id: i64) -> Result<LifecycleOutcome, AppointmentError> {
        self.load_for_transition(appointment_id, AppointmentStatus::Cancelled).await?;
        let appointment = self.apply(appointment_id, AppointmentStatus::Cancelled).await?;
        info!("Appointment {} cancelled", appointment_id);

        let notification = self.notify_cancellation(&appointment).await;

        Ok(LifecycleOutcome {
            appointment,
            treatment: None,
            notification: Some(notification),
        })
    }

    /// Writes the treatment record, then marks the appointment Completed. A
    /// failed record write leaves the appointment Pending; a status write that
    /// loses to another transition removes the record again.
    #[instrument(skip(self, detail))]
    pub async fn complete_appointment(
        &self,
        appointment_id: i64,
        detail: ClinicalDetail,
    ) -> Result<LifecycleOutcome, AppointmentError> {
        let medications = detail.medications.trim();
        if medications.is_empty() {
            return Err(AppointmentError::Validation("Medications are required to complete an appointment".to_string()));
        }

        let current = self.load_for_transition(appointment_id, AppointmentStatus::Completed).await?;

        let new_treatment = NewTreatment {
            appointment_id,
            patient_id: current.patient_id.clone(),
            dentist_id: current.dentist_id.clone(),
            medications: medications.to_string(),
            notes: detail.notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            assigned_date: detail.assigned_date.unwrap_or_else(|| self.clock.today()),
        };
        let treatment = self.store.insert_treatment(&new_treatment).await?;

        let appointment = match self.apply(appointment_id, AppointmentStatus::Completed).await {
            Ok(appointment) => appointment,
            Err(e) => {
                warn!("Appointment {} did not complete, removing treatment {}", appointment_id, treatment.id);
                if let Err(cleanup) = self.store.delete_treatment(treatment.id).await {
                    error!("Treatment {} left without a completed appointment: {}", treatment.id, cleanup);
                }
                return Err(e);
            }
        };
        info!("Appointment {} completed with treatment {}", appointment_id, treatment.id);

        Ok(LifecycleOutcome {
            appointment,
            treatment: Some(treatment),
            notification: None,
        })
    }

    #[instrument(skip(self))]
    pub async fn mark_absent(&self, appointment_id: i64) -> Result<LifecycleOutcome, AppointmentError> {
        self.load_for_transition(appointment_id, AppointmentStatus::Absent).await?;
        let appointment = self.apply(appointment_id, AppointmentStatus::Absent).await?;
        info!("Appointment {} marked absent", appointment_id);

        Ok(LifecycleOutcome {
            appointment,
            treatment: None,
            notification: None,
        })
    }

    async fn load_for_transition(
        &self,
        appointment_id: i64,
        target: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.store
            .find_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        if !appointment.status.can_transition_to(target) {
            warn!("Refused transition {} -> {} for appointment {}", appointment.status, target, appointment_id);
            return Err(AppointmentError::InvalidTransition {
                from: appointment.status,
                to: target,
            });
        }

        Ok(appointment)
    }

    /// Conditional write; losing a race to another transition reports the
    /// status that won.
    async fn apply(
        &self,
        appointment_id: i64,
        target: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        if let Some(updated) = self.store
            .transition_status(appointment_id, AppointmentStatus::Pending, target)
            .await?
        {
            return Ok(updated);
        }

        match self.store.find_appointment(appointment_id).await? {
            Some(current) => {
                warn!("Appointment {} changed to {} before {} was applied", appointment_id, current.status, target);
                Err(AppointmentError::InvalidTransition { from: current.status, to: target })
            }
            None => Err(AppointmentError::NotFound(appointment_id)),
        }
    }

    async fn notify_cancellation(&self, appointment: &Appointment) -> NotificationOutcome {
        let patient = match self.store.find_patient(&appointment.patient_id).await {
            Ok(patient) => patient,
            Err(e) => {
                warn!("Could not load patient {} for cancellation notice: {}", appointment.patient_id, e);
                return NotificationOutcome::Failed { error: e.to_string() };
            }
        };

        let message = patient
            .and_then(|p| p.summary().notice_for(appointment))
            .map(|notice| templates::cancellation_notice(&notice));

        deliver(self.dispatcher.as_ref(), message).await
    }
}
