use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload accepted by the clinic's email relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// What a template needs to know about an appointment and its patient.
#[derive(Debug, Clone)]
pub struct AppointmentNotice {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl AppointmentNotice {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Email service is not configured")]
    NotConfigured,

    #[error("Email relay rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Email relay unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Result of the best-effort email that follows a state change. Reported next
/// to the operation result, never instead of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Sent,
    Skipped { reason: String },
    Failed { error: String },
}

impl NotificationOutcome {
    pub fn no_email() -> Self {
        NotificationOutcome::Skipped { reason: "patient has no email on file".to_string() }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, NotificationOutcome::Sent)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, NotificationOutcome::Failed { .. })
    }
}
