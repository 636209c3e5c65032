pub mod models;
pub mod services;

pub use models::{AppointmentNotice, EmailMessage, NotificationError, NotificationOutcome};
pub use services::{HttpEmailDispatcher, NotificationDispatcher};
