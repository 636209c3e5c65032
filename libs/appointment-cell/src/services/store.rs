// libs/appointment-cell/src/services/store.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, error, info};

use shared_config::AppConfig;
use shared_database::{DatabaseError, SupabaseClient};

use crate::models::{
    Appointment, AppointmentError, AppointmentQuery, AppointmentRecord, AppointmentStatus,
    NewAppointment, NewTreatment, Patient, Treatment,
};

/// Embedded columns returned with every appointment listing.
const RECORD_SELECT: &str = "*,patient:paciente(cedula,nombre,apellidos,correo),dentist:odontologo(cedula,nombre,apellidos,correo)";

/// Persistence for appointments, patients and treatment records.
///
/// `insert_appointment` must reject a second Pending appointment for the same
/// dentist, date and start time with `SlotTaken`. `transition_status` only
/// writes when the stored status still equals `from` and returns `None`
/// otherwise. `delete_treatment` removes a record whose completion did not
/// go through.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn find_patient(&self, patient_id: &str) -> Result<Option<Patient>, AppointmentError>;

    async fn find_appointment(&self, appointment_id: i64) -> Result<Option<Appointment>, AppointmentError>;

    async fn list_appointments(&self, query: &AppointmentQuery) -> Result<Vec<AppointmentRecord>, AppointmentError>;

    async fn insert_appointment(&self, appointment: &NewAppointment) -> Result<Appointment, AppointmentError>;

    async fn transition_status(
        &self,
        appointment_id: i64,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppointmentError>;

    async fn insert_treatment(&self, treatment: &NewTreatment) -> Result<Treatment, AppointmentError>;

    async fn delete_treatment(&self, treatment_id: i64) -> Result<(), AppointmentError>;
}

// ==============================================================================
// SUPABASE / POSTGREST STORE
// ==============================================================================

pub struct SupabaseClinicStore {
    supabase: Arc<SupabaseClient>,
    auth_token: Option<String>,
}

impl SupabaseClinicStore {
    /// Store acting with the caller's token, so row level security applies.
    pub fn new(config: &AppConfig, auth_token: &str) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            auth_token: Some(auth_token.to_string()),
        }
    }

    /// Store for jobs without a user session.
    pub fn background(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::with_api_key(config, config.background_key())),
            auth_token: None,
        }
    }

    fn token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    fn listing_path(query: &AppointmentQuery) -> String {
        let mut path = format!("/rest/v1/citas?select={}", RECORD_SELECT);

        if let Some(date) = query.date {
            path.push_str(&format!("&fecha=eq.{}", date));
        }
        if let Some(dentist_id) = &query.dentist_id {
            path.push_str(&format!("&odontologo=eq.{}", urlencoding::encode(dentist_id)));
        }
        if let Some(patient_id) = &query.patient_id {
            path.push_str(&format!("&paciente=eq.{}", urlencoding::encode(patient_id)));
        }
        if let Some(status) = query.status {
            path.push_str(&format!("&estado=eq.{}", status.as_str()));
        }

        path.push_str("&order=fecha.asc,hora_inicio.asc");
        path
    }
}

fn store_error(e: DatabaseError) -> AppointmentError {
    error!("Clinic store request failed: {}", e);
    AppointmentError::StoreUnavailable(e.to_string())
}

#[async_trait]
impl ClinicStore for SupabaseClinicStore {
    async fn find_patient(&self, patient_id: &str) -> Result<Option<Patient>, AppointmentError> {
        let path = format!("/rest/v1/paciente?cedula=eq.{}", urlencoding::encode(patient_id));

        let rows: Vec<Patient> = self.supabase
            .request(Method::GET, &path, self.token(), None)
            .await
            .map_err(store_error)?;

        Ok(rows.into_iter().next())
    }

    async fn find_appointment(&self, appointment_id: i64) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/citas?id=eq.{}", appointment_id);

        let rows: Vec<Appointment> = self.supabase
            .request(Method::GET, &path, self.token(), None)
            .await
            .map_err(store_error)?;

        Ok(rows.into_iter().next())
    }

    async fn list_appointments(&self, query: &AppointmentQuery) -> Result<Vec<AppointmentRecord>, AppointmentError> {
        let path = Self::listing_path(query);

        let rows: Vec<AppointmentRecord> = self.supabase
            .request(Method::GET, &path, self.token(), None)
            .await
            .map_err(store_error)?;

        debug!("Fetched {} appointments", rows.len());
        Ok(rows)
    }

    async fn insert_appointment(&self, appointment: &NewAppointment) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(appointment)
            .map_err(|e| AppointmentError::Validation(e.to_string()))?;

        let rows: Vec<Appointment> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/citas",
                self.token(),
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    info!("Slot {} {} already held for dentist {}",
                          appointment.date, appointment.start_time, appointment.dentist_id);
                    AppointmentError::SlotTaken
                } else {
                    store_error(e)
                }
            })?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AppointmentError::StoreUnavailable("Insert returned no appointment".to_string()))
    }

    async fn transition_status(
        &self,
        appointment_id: i64,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/citas?id=eq.{}&estado=eq.{}", appointment_id, from.as_str());

        let rows: Vec<Appointment> = self.supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                self.token(),
                Some(json!({ "estado": to })),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(store_error)?;

        Ok(rows.into_iter().next())
    }

    async fn insert_treatment(&self, treatment: &NewTreatment) -> Result<Treatment, AppointmentError> {
        let body = serde_json::to_value(treatment)
            .map_err(|e| AppointmentError::Validation(e.to_string()))?;

        let rows: Vec<Treatment> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/tratamientos",
                self.token(),
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(store_error)?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AppointmentError::StoreUnavailable("Insert returned no treatment".to_string()))
    }

    async fn delete_treatment(&self, treatment_id: i64) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/tratamientos?id=eq.{}", treatment_id);

        let rows: Vec<Treatment> = self.supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                self.token(),
                None,
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(store_error)?;

        debug!("Deleted {} treatment rows for id {}", rows.len(), treatment_id);
        Ok(())
    }
}
