// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment).get(handlers::list_appointments))
        .route("/slots", get(handlers::get_available_slots))
        .route("/dates", get(handlers::get_offerable_dates))
        .route("/summary", get(handlers::get_day_summary)) // Staff only
        .route("/{appointment_id}", get(handlers::get_appointment))

        // Lifecycle transitions, staff only
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        .route("/{appointment_id}/absent", post(handlers::mark_absent))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

/// Scheduler-facing routes. Authenticated by `CRON_SECRET`, not a user token.
pub fn reminder_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/reminder-cron", post(handlers::run_reminder_sweep))
        .with_state(state)
}
