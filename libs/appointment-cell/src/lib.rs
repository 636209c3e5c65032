pub mod clock;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod test_utils;

pub use clock::{Clock, FixedClock, SystemClock};
pub use models::{AppointmentError, SchedulingConfig};
pub use services::ClinicContext;
