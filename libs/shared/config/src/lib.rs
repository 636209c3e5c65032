use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub supabase_service_role_key: String,
    pub email_service_url: String,
    pub cron_secret: Option<String>,
    pub http_timeout_secs: u64,
    pub server_port: u16,
    pub clinic_slot_grid: Option<String>,
    pub clinic_slot_interval_minutes: Option<i64>,
    pub clinic_revision_minutes: Option<i64>,
    pub clinic_standard_minutes: Option<i64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            supabase_service_role_key: String::new(),
            email_service_url: String::new(),
            cron_secret: None,
            http_timeout_secs: 10,
            server_port: 3000,
            clinic_slot_grid: None,
            clinic_slot_interval_minutes: None,
            clinic_revision_minutes: None,
            clinic_standard_minutes: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, reminder sweep will use the anon key");
                    String::new()
                }),
            email_service_url: env::var("EMAIL_SERVICE_URL")
                .unwrap_or_else(|_| {
                    warn!("EMAIL_SERVICE_URL not set, notifications will fail");
                    String::new()
                }),
            cron_secret: env::var("CRON_SECRET").ok().filter(|s| !s.trim().is_empty()),
            http_timeout_secs: parse_var("HTTP_TIMEOUT_SECS").unwrap_or(defaults.http_timeout_secs),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            clinic_slot_grid: env::var("CLINIC_SLOT_GRID").ok().filter(|s| !s.trim().is_empty()),
            clinic_slot_interval_minutes: parse_var("CLINIC_SLOT_INTERVAL_MINUTES"),
            clinic_revision_minutes: parse_var("CLINIC_REVISION_MINUTES"),
            clinic_standard_minutes: parse_var("CLINIC_STANDARD_MINUTES"),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.email_service_url.is_empty()
    }

    /// Key used by jobs that run without a user session.
    pub fn background_key(&self) -> &str {
        if self.supabase_service_role_key.is_empty() {
            &self.supabase_anon_key
        } else {
            &self.supabase_service_role_key
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("{} has an invalid value '{}', ignoring", name, raw);
            None
        }
    }
}
