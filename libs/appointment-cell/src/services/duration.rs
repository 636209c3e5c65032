// libs/appointment-cell/src/services/duration.rs
use chrono::{Duration, NaiveTime};

use crate::models::{AppointmentType, SchedulingConfig};

pub fn duration_minutes(config: &SchedulingConfig, appointment_type: AppointmentType) -> i64 {
    match appointment_type {
        AppointmentType::Revision => config.revision_minutes,
        AppointmentType::Urgent | AppointmentType::Operative | AppointmentType::Treatment => {
            config.standard_minutes
        }
    }
}

/// End time for an appointment starting at `start`. `None` when the end would
/// fall on the next day.
pub fn compute_end(
    config: &SchedulingConfig,
    start: NaiveTime,
    appointment_type: AppointmentType,
) -> Option<NaiveTime> {
    let minutes = duration_minutes(config, appointment_type);
    if minutes <= 0 {
        return None;
    }

    let (end, wrapped_secs) = start.overflowing_add_signed(Duration::minutes(minutes));
    (wrapped_secs == 0).then_some(end)
}
