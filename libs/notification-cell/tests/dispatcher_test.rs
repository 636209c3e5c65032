use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::services::deliver;
use notification_cell::{
    EmailMessage, HttpEmailDispatcher, NotificationDispatcher, NotificationError, NotificationOutcome,
};
use shared_config::AppConfig;

fn config_for(uri: &str) -> AppConfig {
    AppConfig {
        email_service_url: uri.to_string(),
        http_timeout_secs: 5,
        ..AppConfig::default()
    }
}

fn message() -> EmailMessage {
    EmailMessage {
        to: "ana@uni.ac.cr".to_string(),
        subject: "Recordatorio de cita odontológica".to_string(),
        text: "Hola Ana".to_string(),
        html: Some("<p>Hola Ana</p>".to_string()),
    }
}

#[tokio::test]
async fn relay_accepts_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/reminder-email"))
        .and(body_partial_json(json!({
            "to": "ana@uni.ac.cr",
            "subject": "Recordatorio de cita odontológica"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dispatcher = HttpEmailDispatcher::new(&config_for(&mock_server.uri()));
    let result = dispatcher.send(message()).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn server_error_is_rejection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/reminder-email"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "ok": false, "error": "SMTP down" })))
        .mount(&mock_server)
        .await;

    let dispatcher = HttpEmailDispatcher::new(&config_for(&mock_server.uri()));
    let result = dispatcher.send(message()).await;

    assert_matches!(
        result,
        Err(NotificationError::Rejected { status: 500, ref message }) if message == "SMTP down"
    );
}

#[tokio::test]
async fn ok_false_with_200_is_rejection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/reminder-email"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": false, "error": "bad recipient" })))
        .mount(&mock_server)
        .await;

    let dispatcher = HttpEmailDispatcher::new(&config_for(&mock_server.uri()));
    let result = dispatcher.send(message()).await;

    assert_matches!(result, Err(NotificationError::Rejected { status: 200, .. }));
}

#[tokio::test]
async fn unconfigured_relay_fails_without_request() {
    let dispatcher = HttpEmailDispatcher::new(&AppConfig::default());
    let result = dispatcher.send(message()).await;

    assert_matches!(result, Err(NotificationError::NotConfigured));
}

#[tokio::test]
async fn deliver_folds_results_into_outcomes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/reminder-email"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let dispatcher = HttpEmailDispatcher::new(&config_for(&mock_server.uri()));

    let failed = deliver(&dispatcher, Some(message())).await;
    assert!(failed.is_failed());

    let skipped = deliver(&dispatcher, None).await;
    assert_eq!(skipped, NotificationOutcome::no_email());
}
