// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::HeaderMap,
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_staff;

use crate::models::{AppointmentError, AppointmentQuery, BookAppointmentRequest, ClinicalDetail};
use crate::services::agenda::AgendaService;
use crate::services::booking::BookingService;
use crate::services::calendar::SlotCalendarService;
use crate::services::lifecycle::LifecycleService;
use crate::services::reminder::ReminderSweepService;
use crate::services::ClinicContext;

const DEFAULT_DATE_COUNT: usize = 10;
const MAX_DATE_COUNT: usize = 60;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    #[serde(default)]
    pub dentist_id: String,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct DatesQuery {
    pub days: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub date: Option<NaiveDate>,
}

pub fn to_app_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::IneligiblePatient(_)
        | AppointmentError::InvalidSlot(_)
        | AppointmentError::InvalidDate(_)
        | AppointmentError::DentistRequired => AppError::BadRequest(e.to_string()),
        AppointmentError::Validation(_) => AppError::ValidationError(e.to_string()),
        AppointmentError::SlotTaken | AppointmentError::InvalidTransition { .. } => {
            AppError::Conflict(e.to_string())
        }
        AppointmentError::NotFound(_) => AppError::NotFound(e.to_string()),
        AppointmentError::StoreUnavailable(_) => AppError::ServiceUnavailable(e.to_string()),
    }
}

// ==============================================================================
// SLOT CALENDAR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let context = ClinicContext::for_user(&state, auth.token());
    let calendar = SlotCalendarService::new(&context);

    let schedule = calendar.available_slots(&params.dentist_id, params.date).await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "ok": true,
        "schedule": schedule
    })))
}

#[axum::debug_handler]
pub async fn get_offerable_dates(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<DatesQuery>,
) -> Result<Json<Value>, AppError> {
    let count = params.days.unwrap_or(DEFAULT_DATE_COUNT).min(MAX_DATE_COUNT);

    let context = ClinicContext::for_user(&state, auth.token());
    let dates = SlotCalendarService::new(&context).offerable_dates(count);

    Ok(Json(json!({
        "ok": true,
        "dates": dates
    })))
}

// ==============================================================================
// BOOKING AND READ HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let context = ClinicContext::for_user(&state, auth.token());
    let booking_service = BookingService::new(&context);

    let outcome = booking_service.book_appointment(request).await
        .map_err(|e| {
            if matches!(e, AppointmentError::IneligiblePatient(_)) {
                warn!("User {} tried to book for an ineligible patient: {}", user.id, e);
            }
            to_app_error(e)
        })?;

    Ok(Json(json!({
        "ok": true,
        "appointment": outcome.appointment,
        "notification": outcome.notification
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let context = ClinicContext::for_user(&state, auth.token());

    let appointment = AgendaService::new(&context)
        .get_appointment(appointment_id)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "ok": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    let context = ClinicContext::for_user(&state, auth.token());

    let appointments = AgendaService::new(&context)
        .list_appointments(&query)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "ok": true,
        "total": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_day_summary(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let context = ClinicContext::for_user(&state, auth.token());
    let date = params.date.unwrap_or_else(|| context.clock.today());

    let summary = AgendaService::new(&context)
        .day_summary(date)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "ok": true,
        "summary": summary
    })))
}

// ==============================================================================
// LIFECYCLE HANDLERS (STAFF ONLY)
// ==============================================================================

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let context = ClinicContext::for_user(&state, auth.token());
    let outcome = LifecycleService::new(&context)
        .cancel_appointment(appointment_id)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "ok": true,
        "appointment": outcome.appointment,
        "notification": outcome.notification
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
    Json(detail): Json<ClinicalDetail>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let context = ClinicContext::for_user(&state, auth.token());
    let outcome = LifecycleService::new(&context)
        .complete_appointment(appointment_id, detail)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "ok": true,
        "appointment": outcome.appointment,
        "treatment": outcome.treatment
    })))
}

#[axum::debug_handler]
pub async fn mark_absent(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let context = ClinicContext::for_user(&state, auth.token());
    let outcome = LifecycleService::new(&context)
        .mark_absent(appointment_id)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "ok": true,
        "appointment": outcome.appointment
    })))
}

// ==============================================================================
// REMINDER CRON
// ==============================================================================

/// Trigger for the daily reminder sweep. When `CRON_SECRET` is set the caller
/// must present it as a bearer token.
#[axum::debug_handler]
pub async fn run_reminder_sweep(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    if let Some(secret) = state.cron_secret.as_deref() {
        let presented = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);

        if presented != Some(secret) {
            warn!("Reminder sweep called without a valid cron secret");
            return Err(AppError::Auth("Invalid cron credentials".to_string()));
        }
    }

    let context = ClinicContext::for_background(&state);
    let report = ReminderSweepService::new(&context).run().await
        .map_err(|e| {
            error!("Reminder sweep failed: {}", e);
            AppError::Internal(e.to_string())
        })?;

    Ok(Json(json!({
        "ok": true,
        "enviados": report.sent,
        "skipped": report.skipped,
        "failed": report.failed,
        "date": report.date
    })))
}
