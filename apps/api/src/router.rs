use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::{appointment_routes, reminder_routes};
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Dental clinic API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .merge(reminder_routes(state))
}
