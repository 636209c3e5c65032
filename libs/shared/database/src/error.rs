use serde::Deserialize;
use thiserror::Error;

/// Postgres error code PostgREST forwards for unique constraint violations.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl DatabaseError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, DatabaseError::Conflict(_))
    }

    /// Failures a caller may retry for idempotent reads.
    pub fn is_transient(&self) -> bool {
        match self {
            DatabaseError::Transport(_) => true,
            DatabaseError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub(crate) fn from_status(status: u16, body: &str) -> Self {
        let detail: Option<PostgrestErrorBody> = serde_json::from_str(body).ok();
        let message = detail
            .as_ref()
            .and_then(|d| d.message.clone())
            .unwrap_or_else(|| body.to_string());

        match status {
            401 | 403 => DatabaseError::Auth(message),
            404 => DatabaseError::NotFound(message),
            409 if detail.as_ref().and_then(|d| d.code.as_deref()) == Some(UNIQUE_VIOLATION) => {
                DatabaseError::Conflict(message)
            }
            _ => DatabaseError::Api { status, message },
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn unique_violation_maps_to_conflict() {
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint \"citas_pending_slot_uniq\"","details":null,"hint":null}"#;
        let err = DatabaseError::from_status(409, body);
        assert!(err.is_conflict());
    }

    #[test]
    fn foreign_key_violation_is_not_a_slot_conflict() {
        let body = r#"{"code":"23503","message":"insert or update violates foreign key constraint"}"#;
        assert_matches!(DatabaseError::from_status(409, body), DatabaseError::Api { status: 409, .. });
    }

    #[test]
    fn server_errors_are_transient() {
        assert!(DatabaseError::from_status(503, "upstream down").is_transient());
        assert!(!DatabaseError::from_status(400, "bad filter").is_transient());
        assert_matches!(DatabaseError::from_status(401, "{}"), DatabaseError::Auth(_));
    }
}
