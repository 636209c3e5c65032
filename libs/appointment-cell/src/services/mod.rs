pub mod agenda;
pub mod booking;
pub mod calendar;
pub mod duration;
pub mod lifecycle;
pub mod reminder;
pub mod store;

use std::sync::Arc;

use notification_cell::{HttpEmailDispatcher, NotificationDispatcher};
use shared_config::AppConfig;

use crate::clock::{Clock, SystemClock};
use crate::models::SchedulingConfig;
use store::{ClinicStore, SupabaseClinicStore};

/// Collaborators shared by the appointment services.
#[derive(Clone)]
pub struct ClinicContext {
    pub store: Arc<dyn ClinicStore>,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub clock: Arc<dyn Clock>,
    pub scheduling: SchedulingConfig,
}

impl ClinicContext {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        scheduling: SchedulingConfig,
    ) -> Self {
        Self { store, dispatcher, clock, scheduling }
    }

    /// Context for a request made on behalf of a signed-in user.
    pub fn for_user(config: &AppConfig, auth_token: &str) -> Self {
        Self::new(
            Arc::new(SupabaseClinicStore::new(config, auth_token)),
            Arc::new(HttpEmailDispatcher::new(config)),
            Arc::new(SystemClock),
            SchedulingConfig::from_app_config(config),
        )
    }

    /// Context for scheduled jobs.
    pub fn for_background(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(SupabaseClinicStore::background(config)),
            Arc::new(HttpEmailDispatcher::new(config)),
            Arc::new(SystemClock),
            SchedulingConfig::from_app_config(config),
        )
    }
}
