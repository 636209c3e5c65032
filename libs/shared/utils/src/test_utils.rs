use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub email_service_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            email_service_url: "http://localhost:54322".to_string(),
        }
    }
}

impl TestConfig {
    /// Points both the store and the email service at one mock server.
    pub fn with_mock_server(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            email_service_url: uri.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            email_service_url: self.email_service_url.clone(),
            http_timeout_secs: 5,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: format!("user-{}", email.split('@').next().unwrap_or(email)),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn student(email: &str) -> Self {
        Self::new(email, "estudiante")
    }

    pub fn assistant(email: &str) -> Self {
        Self::new(email, "asistente")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "administrador")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "app_metadata": { "role": user.role },
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Rows shaped like the clinic's PostgREST tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn patient_row(cedula: &str, correo: Option<&str>, informe: bool) -> Value {
        json!({
            "cedula": cedula,
            "nombre": "Ana",
            "apellidos": "Solís Mora",
            "correo": correo,
            "carnet": "B90001",
            "carrera": "Odontología",
            "beca": null,
            "informe": informe,
            "created_at": "2025-02-01T00:00:00Z",
            "updated_at": "2025-02-01T00:00:00Z"
        })
    }

    pub fn dentist_row(cedula: &str) -> Value {
        json!({
            "cedula": cedula,
            "nombre": "Laura",
            "apellidos": "Vargas",
            "correo": "lvargas@clinica.ac.cr",
            "telefono": "2511-0000"
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn appointment_row(
        id: i64,
        fecha: &str,
        hora_inicio: &str,
        hora_final: &str,
        tipo: &str,
        estado: &str,
        paciente: &str,
        odontologo: &str,
    ) -> Value {
        json!({
            "id": id,
            "fecha": fecha,
            "hora_inicio": hora_inicio,
            "hora_final": hora_final,
            "tipo": tipo,
            "estado": estado,
            "paciente": paciente,
            "odontologo": odontologo,
            "notas": null,
            "emergencia": tipo == "urgent"
        })
    }

    /// Appointment row with the embedded patient contact used by the
    /// reminder sweep. `as_array` mimics relations PostgREST returns as lists.
    pub fn appointment_with_contact(
        id: i64,
        fecha: &str,
        hora_inicio: &str,
        correo: Option<&str>,
        as_array: bool,
    ) -> Value {
        let contact = json!({
            "cedula": format!("1-000{}-0000", id),
            "nombre": "Ana",
            "apellidos": "Solís Mora",
            "correo": correo
        });
        let mut row = Self::appointment_row(
            id, fecha, hora_inicio, "10:00", "revision", "Pendiente",
            &format!("1-000{}-0000", id), "2-0222-0222",
        );
        row["patient"] = if as_array { json!([contact]) } else { contact };
        row
    }

    pub fn treatment_row(id: i64, cita: i64, paciente: &str, odontologo: &str) -> Value {
        json!({
            "id": id,
            "cita": cita,
            "paciente": paciente,
            "odontologo": odontologo,
            "medicamentos": "Ibuprofeno 400mg c/8h",
            "notas": null,
            "fecha_asignacion": "2026-10-20"
        })
    }

    pub fn unique_violation() -> Value {
        json!({
            "code": "23505",
            "details": null,
            "hint": null,
            "message": "duplicate key value violates unique constraint \"citas_pending_slot_uniq\""
        })
    }
}
