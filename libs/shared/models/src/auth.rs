use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

impl JwtClaims {
    /// Clinic role granted by the auth provider. `app_metadata.role` wins over
    /// `user_metadata.role`, which wins over the top-level claim.
    pub fn clinic_role(&self) -> Option<String> {
        let from_metadata = |meta: &Option<serde_json::Value>| {
            meta.as_ref()
                .and_then(|m| m.get("role"))
                .and_then(|r| r.as_str())
                .map(str::to_string)
        };

        from_metadata(&self.app_metadata)
            .or_else(|| from_metadata(&self.user_metadata))
            .or_else(|| self.role.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn clinic_role(&self) -> Option<ClinicRole> {
        self.role.as_deref().and_then(ClinicRole::parse)
    }

    /// Assistants and administrators run the appointment lifecycle.
    pub fn is_staff(&self) -> bool {
        matches!(
            self.clinic_role(),
            Some(ClinicRole::Assistant) | Some(ClinicRole::Administrator)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClinicRole {
    #[serde(rename = "estudiante")]
    Student,
    #[serde(rename = "asistente")]
    Assistant,
    #[serde(rename = "administrador")]
    Administrator,
}

impl ClinicRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "estudiante" | "student" => Some(ClinicRole::Student),
            "asistente" | "assistant" => Some(ClinicRole::Assistant),
            "administrador" | "admin" | "administrator" => Some(ClinicRole::Administrator),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicRole::Student => "estudiante",
            ClinicRole::Assistant => "asistente",
            ClinicRole::Administrator => "administrador",
        }
    }
}

impl fmt::Display for ClinicRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
