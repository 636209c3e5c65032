//! In-memory collaborators for exercising the appointment services without a
//! database or an email relay.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use tokio::sync::Mutex;

use notification_cell::{EmailMessage, NotificationDispatcher, NotificationError};

use crate::clock::FixedClock;
use crate::models::{
    Appointment, AppointmentError, AppointmentQuery, AppointmentRecord, AppointmentStatus,
    AppointmentType, NewAppointment, NewTreatment, Patient, PersonSummary, SchedulingConfig,
    Treatment,
};
use crate::services::store::ClinicStore;
use crate::services::ClinicContext;

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

#[derive(Default)]
struct StoreState {
    patients: HashMap<String, Patient>,
    dentists: HashMap<String, PersonSummary>,
    appointments: Vec<Appointment>,
    treatments: Vec<Treatment>,
    next_appointment_id: i64,
    next_treatment_id: i64,
}

/// Store that enforces the pending-slot uniqueness rule under one lock, the
/// way the partial unique index does in the database.
#[derive(Default)]
pub struct InMemoryClinicStore {
    state: Mutex<StoreState>,
    fail_treatment_writes: AtomicBool,
    unavailable: AtomicBool,
}

impl InMemoryClinicStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_patient(&self, patient: Patient) {
        self.state.lock().await.patients.insert(patient.id.clone(), patient);
    }

    pub async fn add_dentist(&self, dentist: PersonSummary) {
        self.state.lock().await.dentists.insert(dentist.id.clone(), dentist);
    }

    /// Stores `appointment` as-is and returns its assigned id.
    pub async fn seed_appointment(&self, appointment: NewAppointment) -> i64 {
        let mut state = self.state.lock().await;
        state.next_appointment_id += 1;
        let id = state.next_appointment_id;
        state.appointments.push(appointment.into_appointment(id));
        id
    }

    pub async fn appointments(&self) -> Vec<Appointment> {
        self.state.lock().await.appointments.clone()
    }

    pub async fn treatments(&self) -> Vec<Treatment> {
        self.state.lock().await.treatments.clone()
    }

    pub fn fail_treatment_writes(&self) {
        self.fail_treatment_writes.store(true, Ordering::SeqCst);
    }

    /// Every call fails with `StoreUnavailable` from now on.
    pub fn go_offline(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), AppointmentError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(AppointmentError::StoreUnavailable("store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ClinicStore for InMemoryClinicStore {
    async fn find_patient(&self, patient_id: &str) -> Result<Option<Patient>, AppointmentError> {
        self.check_online()?;
        Ok(self.state.lock().await.patients.get(patient_id).cloned())
    }

    async fn find_appointment(&self, appointment_id: i64) -> Result<Option<Appointment>, AppointmentError> {
        self.check_online()?;
        let state = self.state.lock().await;
        Ok(state.appointments.iter().find(|a| a.id == appointment_id).cloned())
    }

    async fn list_appointments(&self, query: &AppointmentQuery) -> Result<Vec<AppointmentRecord>, AppointmentError> {
        self.check_online()?;
        let state = self.state.lock().await;

        let mut records: Vec<AppointmentRecord> = state.appointments
            .iter()
            .filter(|a| query.matches(a))
            .map(|a| AppointmentRecord {
                appointment: a.clone(),
                patient: state.patients.get(&a.patient_id).map(Patient::summary),
                dentist: state.dentists.get(&a.dentist_id).cloned(),
            })
            .collect();

        records.sort_by_key(|r| (r.appointment.date, r.appointment.start_time));
        Ok(records)
    }

    async fn insert_appointment(&self, appointment: &NewAppointment) -> Result<Appointment, AppointmentError> {
        self.check_online()?;
        let mut state = self.state.lock().await;

        let taken = appointment.status == AppointmentStatus::Pending
            && state.appointments.iter().any(|a| {
                a.status == AppointmentStatus::Pending
                    && a.dentist_id == appointment.dentist_id
                    && a.date == appointment.date
                    && a.start_time == appointment.start_time
            });
        if taken {
            return Err(AppointmentError::SlotTaken);
        }

        state.next_appointment_id += 1;
        let stored = appointment.clone().into_appointment(state.next_appointment_id);
        state.appointments.push(stored.clone());
        Ok(stored)
    }

    async fn transition_status(
        &self,
        appointment_id: i64,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppointmentError> {
        self.check_online()?;
        let mut state = self.state.lock().await;

        Ok(state.appointments
            .iter_mut()
            .find(|a| a.id == appointment_id && a.status == from)
            .map(|a| {
                a.status = to;
                a.clone()
            }))
    }

    async fn insert_treatment(&self, treatment: &NewTreatment) -> Result<Treatment, AppointmentError> {
        self.check_online()?;
        if self.fail_treatment_writes.load(Ordering::SeqCst) {
            return Err(AppointmentError::StoreUnavailable("treatment write rejected".to_string()));
        }

        let mut state = self.state.lock().await;
        state.next_treatment_id += 1;
        let stored = treatment.clone().into_treatment(state.next_treatment_id);
        state.treatments.push(stored.clone());
        Ok(stored)
    }

    async fn delete_treatment(&self, treatment_id: i64) -> Result<(), AppointmentError> {
        self.check_online()?;
        self.state.lock().await.treatments.retain(|t| t.id != treatment_id);
        Ok(())
    }
}

// ==============================================================================
// RECORDING DISPATCHER
// ==============================================================================

/// Keeps every accepted message; addresses marked failing are rejected.
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<EmailMessage>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_for(&self, address: &str) {
        self.failing.lock().await.insert(address.to_string());
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        if self.failing.lock().await.contains(&message.to) {
            return Err(NotificationError::Rejected {
                status: 500,
                message: format!("mailbox {} unavailable", message.to),
            });
        }
        self.sent.lock().await.push(message);
        Ok(())
    }
}

// ==============================================================================
// FIXTURES
// ==============================================================================

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
}

pub fn patient(cedula: &str, email: Option<&str>, has_report: bool) -> Patient {
    Patient {
        id: cedula.to_string(),
        first_name: "Ana".to_string(),
        last_name: "Solís Mora".to_string(),
        email: email.map(str::to_string),
        student_card: Some("B90001".to_string()),
        program: Some("Odontología".to_string()),
        scholarship: None,
        has_enrollment_report: has_report,
    }
}

pub fn pending_appointment(
    patient_id: &str,
    dentist_id: &str,
    date: NaiveDate,
    start_time: NaiveTime,
    appointment_type: AppointmentType,
) -> NewAppointment {
    let minutes = if appointment_type == AppointmentType::Revision { 30 } else { 60 };
    NewAppointment {
        date,
        start_time,
        end_time: start_time + chrono::Duration::minutes(minutes),
        appointment_type,
        status: AppointmentStatus::Pending,
        patient_id: patient_id.to_string(),
        dentist_id: dentist_id.to_string(),
        notes: None,
        emergency: appointment_type.is_emergency(),
    }
}

/// Context over the given doubles with the clinic date pinned to `today`.
pub fn fixed_context(
    store: Arc<InMemoryClinicStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    today: NaiveDate,
) -> ClinicContext {
    ClinicContext::new(store, dispatcher, Arc::new(FixedClock(today)), SchedulingConfig::default())
}
