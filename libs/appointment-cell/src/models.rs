// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use notification_cell::{AppointmentNotice, NotificationOutcome};
use shared_database::relation;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A row of `citas`. Column names stay in the clinic's schema language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "hora_inicio", with = "wall_clock")]
    pub start_time: NaiveTime,
    #[serde(rename = "hora_final", with = "wall_clock")]
    pub end_time: NaiveTime,
    #[serde(rename = "tipo")]
    pub appointment_type: AppointmentType,
    #[serde(rename = "estado")]
    pub status: AppointmentStatus,
    #[serde(rename = "paciente")]
    pub patient_id: String,
    #[serde(rename = "odontologo")]
    pub dentist_id: String,
    #[serde(rename = "notas", default)]
    pub notes: Option<String>,
    #[serde(rename = "emergencia", default)]
    pub emergency: bool,
}

/// Insert payload for `citas`; the store assigns the id.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "hora_inicio", with = "wall_clock")]
    pub start_time: NaiveTime,
    #[serde(rename = "hora_final", with = "wall_clock")]
    pub end_time: NaiveTime,
    #[serde(rename = "tipo")]
    pub appointment_type: AppointmentType,
    #[serde(rename = "estado")]
    pub status: AppointmentStatus,
    #[serde(rename = "paciente")]
    pub patient_id: String,
    #[serde(rename = "odontologo")]
    pub dentist_id: String,
    #[serde(rename = "notas")]
    pub notes: Option<String>,
    #[serde(rename = "emergencia")]
    pub emergency: bool,
}

impl NewAppointment {
    pub fn into_appointment(self, id: i64) -> Appointment {
        Appointment {
            id,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            appointment_type: self.appointment_type,
            status: self.status,
            patient_id: self.patient_id,
            dentist_id: self.dentist_id,
            notes: self.notes,
            emergency: self.emergency,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentType {
    Urgent,
    Revision,
    Operative,
    #[serde(alias = "preventive")]
    Treatment,
}

impl AppointmentType {
    pub fn is_emergency(&self) -> bool {
        matches!(self, AppointmentType::Urgent)
    }
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppointmentType::Urgent => "urgent",
            AppointmentType::Revision => "revision",
            AppointmentType::Operative => "operative",
            AppointmentType::Treatment => "treatment",
        };
        write!(f, "{}", name)
    }
}

/// Stored values are the clinic's Spanish labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    #[serde(rename = "Pendiente")]
    Pending,
    #[serde(rename = "Completada")]
    Completed,
    #[serde(rename = "Cancelada")]
    Cancelled,
    #[serde(rename = "Ausente")]
    Absent,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pendiente",
            AppointmentStatus::Completed => "Completada",
            AppointmentStatus::Cancelled => "Cancelada",
            AppointmentStatus::Absent => "Ausente",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Pending)
    }

    /// Pending moves to any terminal state; terminal states never move.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(self, AppointmentStatus::Pending) && next.is_terminal()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==============================================================================
// PEOPLE
// ==============================================================================

/// A row of `paciente`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(rename = "cedula")]
    pub id: String,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellidos", default)]
    pub last_name: String,
    #[serde(rename = "correo", default)]
    pub email: Option<String>,
    #[serde(rename = "carnet", default)]
    pub student_card: Option<String>,
    #[serde(rename = "carrera", default)]
    pub program: Option<String>,
    #[serde(rename = "beca", default)]
    pub scholarship: Option<String>,
    /// Enrollment report on file. Only patients with one can be booked.
    #[serde(rename = "informe", default)]
    pub has_enrollment_report: bool,
}

impl Patient {
    pub fn summary(&self) -> PersonSummary {
        PersonSummary {
            id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Embedded patient or dentist columns returned alongside appointments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonSummary {
    #[serde(rename = "cedula", default)]
    pub id: String,
    #[serde(rename = "nombre", default)]
    pub first_name: String,
    #[serde(rename = "apellidos", default)]
    pub last_name: String,
    #[serde(rename = "correo", default)]
    pub email: Option<String>,
}

impl PersonSummary {
    /// Notice for `appointment`, or `None` when there is no usable address.
    pub fn notice_for(&self, appointment: &Appointment) -> Option<AppointmentNotice> {
        let email = self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())?;
        Some(AppointmentNotice {
            email: email.to_string(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            date: appointment.date,
            start_time: appointment.start_time,
            end_time: appointment.end_time,
        })
    }
}

/// Appointment with its embedded patient and dentist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    #[serde(flatten)]
    pub appointment: Appointment,
    #[serde(default, deserialize_with = "relation::one_or_many")]
    pub patient: Option<PersonSummary>,
    #[serde(default, deserialize_with = "relation::one_or_many")]
    pub dentist: Option<PersonSummary>,
}

impl AppointmentRecord {
    pub fn notice(&self) -> Option<AppointmentNotice> {
        self.patient.as_ref()?.notice_for(&self.appointment)
    }
}

// ==============================================================================
// TREATMENT RECORDS
// ==============================================================================

/// A row of `tratamientos`, written when an appointment is completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub id: i64,
    #[serde(rename = "cita")]
    pub appointment_id: i64,
    #[serde(rename = "paciente")]
    pub patient_id: String,
    #[serde(rename = "odontologo")]
    pub dentist_id: String,
    #[serde(rename = "medicamentos")]
    pub medications: String,
    #[serde(rename = "notas", default)]
    pub notes: Option<String>,
    #[serde(rename = "fecha_asignacion")]
    pub assigned_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTreatment {
    #[serde(rename = "cita")]
    pub appointment_id: i64,
    #[serde(rename = "paciente")]
    pub patient_id: String,
    #[serde(rename = "odontologo")]
    pub dentist_id: String,
    #[serde(rename = "medicamentos")]
    pub medications: String,
    #[serde(rename = "notas")]
    pub notes: Option<String>,
    #[serde(rename = "fecha_asignacion")]
    pub assigned_date: NaiveDate,
}

impl NewTreatment {
    pub fn into_treatment(self, id: i64) -> Treatment {
        Treatment {
            id,
            appointment_id: self.appointment_id,
            patient_id: self.patient_id,
            dentist_id: self.dentist_id,
            medications: self.medications,
            notes: self.notes,
            assigned_date: self.assigned_date,
        }
    }
}

/// Clinical detail captured when a dentist completes an appointment.
#[derive(Debug, Clone, Deserialize)]
pub struct ClinicalDetail {
    pub medications: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Defaults to the clinic's current date.
    #[serde(default)]
    pub assigned_date: Option<NaiveDate>,
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub dentist_id: String,
    pub date: NaiveDate,
    #[serde(with = "wall_clock")]
    pub start_time: NaiveTime,
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingOutcome {
    pub appointment: Appointment,
    pub notification: NotificationOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct LifecycleOutcome {
    pub appointment: Appointment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment: Option<Treatment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationOutcome>,
}

/// Filters for appointment listings. Unset fields do not filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentQuery {
    pub date: Option<NaiveDate>,
    pub dentist_id: Option<String>,
    pub patient_id: Option<String>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentQuery {
    /// Pending appointments of one dentist on one day.
    pub fn pending_for(dentist_id: &str, date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            dentist_id: Some(dentist_id.to_string()),
            patient_id: None,
            status: Some(AppointmentStatus::Pending),
        }
    }

    /// Pending appointments of every dentist on one day.
    pub fn pending_on(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            status: Some(AppointmentStatus::Pending),
            ..Self::default()
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.date.map_or(true, |d| appointment.date == d)
            && self.dentist_id.as_deref().map_or(true, |d| appointment.dentist_id == d)
            && self.patient_id.as_deref().map_or(true, |p| appointment.patient_id == p)
            && self.status.map_or(true, |s| appointment.status == s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub pending: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub absent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub date: NaiveDate,
    pub candidates: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

// ==============================================================================
// SLOT CALENDAR MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPeriod {
    Morning,
    Afternoon,
}

impl DayPeriod {
    pub fn of(time: NaiveTime) -> Self {
        if time.hour() < 12 {
            DayPeriod::Morning
        } else {
            DayPeriod::Afternoon
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    #[serde(with = "wall_clock")]
    pub start: NaiveTime,
    pub period: DayPeriod,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    pub dentist_id: String,
    pub date: NaiveDate,
    pub slots: Vec<SlotAvailability>,
}

impl DaySchedule {
    pub fn free_slots(&self) -> impl Iterator<Item = NaiveTime> + '_ {
        self.slots.iter().filter(|s| s.available).map(|s| s.start)
    }
}

// ==============================================================================
// SCHEDULING CONFIGURATION
// ==============================================================================

/// One bookable window of the day, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    pub first: NaiveTime,
    pub last: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulingConfig {
    pub windows: Vec<SlotWindow>,
    pub interval_minutes: i64,
    pub revision_minutes: i64,
    pub standard_minutes: i64,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Patient is not eligible for booking: {0}")]
    IneligiblePatient(String),

    #[error("{0} is not a bookable slot")]
    InvalidSlot(String),

    #[error("{0} is not an offerable date")]
    InvalidDate(NaiveDate),

    #[error("Appointment slot is already taken")]
    SlotTaken,

    #[error("A dentist must be selected")]
    DentistRequired,

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Appointment {0} not found")]
    NotFound(i64),

    #[error("Appointment store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

// ==============================================================================
// WALL-CLOCK TIME FORMAT
// ==============================================================================

/// Reads a stored wall-clock time. Accepts `HH:MM`, `H:MM` and `HH:MM:SS`.
pub fn parse_wall_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Serde adapter writing `HH:MM`.
pub mod wall_clock {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_wall_clock(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid time of day '{}'", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn wall_clock_accepts_stored_variants() {
        assert_eq!(parse_wall_clock("09:30"), Some(time(9, 30)));
        assert_eq!(parse_wall_clock("9:30"), Some(time(9, 30)));
        assert_eq!(parse_wall_clock("13:00:00"), Some(time(13, 0)));
        assert_eq!(parse_wall_clock("noon"), None);
    }

    #[test]
    fn appointment_reads_store_row() {
        let row = json!({
            "id": 12,
            "fecha": "2026-10-20",
            "hora_inicio": "09:00:00",
            "hora_final": "09:30:00",
            "tipo": "preventive",
            "estado": "Pendiente",
            "paciente": "1-1111-1111",
            "odontologo": "2-0222-0222",
            "notas": null,
            "emergencia": false
        });

        let appointment: Appointment = serde_json::from_value(row).unwrap();
        assert_eq!(appointment.appointment_type, AppointmentType::Treatment);
        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(appointment.start_time, time(9, 0));

        let written = serde_json::to_value(&appointment).unwrap();
        assert_eq!(written["hora_inicio"], "09:00");
        assert_eq!(written["tipo"], "treatment");
    }

    #[test]
    fn record_accepts_embedded_patient_as_array() {
        let row = json!({
            "id": 3,
            "fecha": "2026-10-20",
            "hora_inicio": "10:00",
            "hora_final": "11:00",
            "tipo": "operative",
            "estado": "Pendiente",
            "paciente": "1-1111-1111",
            "odontologo": "2-0222-0222",
            "patient": [{ "cedula": "1-1111-1111", "nombre": "Ana", "apellidos": "Solís", "correo": "ana@uni.ac.cr" }]
        });

        let record: AppointmentRecord = serde_json::from_value(row).unwrap();
        let notice = record.notice().unwrap();
        assert_eq!(notice.email, "ana@uni.ac.cr");
        assert!(record.dentist.is_none());
    }

    #[test]
    fn blank_email_gives_no_notice() {
        let record = AppointmentRecord {
            appointment: Appointment {
                id: 1,
                date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
                start_time: time(8, 0),
                end_time: time(8, 30),
                appointment_type: AppointmentType::Revision,
                status: AppointmentStatus::Pending,
                patient_id: "p".into(),
                dentist_id: "d".into(),
                notes: None,
                emergency: false,
            },
            patient: Some(PersonSummary {
                id: "p".into(),
                first_name: "Ana".into(),
                last_name: String::new(),
                email: Some("  ".into()),
            }),
            dentist: None,
        };
        assert!(record.notice().is_none());
    }

    #[test]
    fn only_pending_transitions() {
        use AppointmentStatus::*;
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Absent));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Absent.can_transition_to(Cancelled));
    }

    #[test]
    fn periods_split_at_noon() {
        assert_eq!(DayPeriod::of(time(11, 30)), DayPeriod::Morning);
        assert_eq!(DayPeriod::of(time(13, 0)), DayPeriod::Afternoon);
    }
}
