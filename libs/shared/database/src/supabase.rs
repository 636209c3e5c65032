use std::time::Duration;

use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::error::DatabaseError;

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_api_key(config, &config.supabase_anon_key)
    }

    /// Client that authenticates with an explicit API key, e.g. the service
    /// role key for jobs that run outside a user session.
    pub fn with_api_key(config: &AppConfig, api_key: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout ({}), using defaults", e);
                Client::new()
            });

        Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, DatabaseError> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| DatabaseError::InvalidRequest("API key is not a valid header value".to_string()))?;
        headers.insert("apikey", api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let bearer = auth_token.unwrap_or(&self.api_key);
        let authorization = HeaderValue::from_str(&format!("Bearer {}", bearer))
            .map_err(|_| DatabaseError::InvalidRequest("Auth token is not a valid header value".to_string()))?;
        headers.insert(AUTHORIZATION, authorization);

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("PostgREST error ({}): {}", status, text);
            return Err(DatabaseError::from_status(status.as_u16(), &text));
        }

        Ok(serde_json::from_str::<T>(&text)?)
    }

    /// Headers asking PostgREST to return the written rows.
    pub fn return_representation() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> AppConfig {
        AppConfig {
            supabase_url: server.uri(),
            supabase_anon_key: "anon-key".to_string(),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn sends_api_key_and_user_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/citas"))
            .and(query_param("id", "eq.7"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 7 }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config_for(&server));
        let rows: Vec<Value> = client
            .request(Method::GET, "/rest/v1/citas?id=eq.7", Some("user-token"), None)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_api_key_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/citas"))
            .and(header("authorization", "Bearer service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = SupabaseClient::with_api_key(&config_for(&server), "service-key");
        let rows: Vec<Value> = client
            .request(Method::GET, "/rest/v1/citas", None, None)
            .await
            .unwrap();

        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn unique_violation_surfaces_as_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/citas"))
            .and(header("prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint"
            })))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config_for(&server));
        let result: Result<Vec<Value>, _> = client
            .request_with_headers(
                Method::POST,
                "/rest/v1/citas",
                Some("token"),
                Some(json!({ "fecha": "2026-10-20" })),
                Some(SupabaseClient::return_representation()),
            )
            .await;

        assert_matches!(result, Err(DatabaseError::Conflict(_)));
    }
}
