use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::*;
use appointment_cell::services::store::{ClinicStore, SupabaseClinicStore};
use appointment_cell::test_utils::{date, pending_appointment, time};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

const TOKEN: &str = "user-token";

#[tokio::test]
async fn insert_conflict_maps_to_slot_taken() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("POST"))
        .and(path("/rest/v1/citas"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({ "estado": "Pendiente", "hora_inicio": "09:00" })))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::unique_violation()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = SupabaseClinicStore::new(&config, TOKEN);
    let slot = pending_appointment("1-1111-1111", "2-0222-0222", date(2026, 10, 20), time(9, 0), AppointmentType::Revision);

    let result = store.insert_appointment(&slot).await;
    assert_matches!(result, Err(AppointmentError::SlotTaken));
}

#[tokio::test]
async fn insert_returns_stored_row() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("POST"))
        .and(path("/rest/v1/citas"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_row(41, "2026-10-20", "09:00:00", "09:30:00", "revision", "Pendiente", "1-1111-1111", "2-0222-0222")
        ])))
        .mount(&mock_server)
        .await;

    let store = SupabaseClinicStore::new(&config, TOKEN);
    let slot = pending_appointment("1-1111-1111", "2-0222-0222", date(2026, 10, 20), time(9, 0), AppointmentType::Revision);

    let stored = store.insert_appointment(&slot).await.unwrap();
    assert_eq!(stored.id, 41);
    assert_eq!(stored.end_time, time(9, 30));
}

#[tokio::test]
async fn transition_is_conditional_on_current_status() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/citas"))
        .and(query_param("id", "eq.7"))
        .and(query_param("estado", "eq.Pendiente"))
        .and(body_partial_json(json!({ "estado": "Cancelada" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = SupabaseClinicStore::new(&config, TOKEN);
    let updated = store
        .transition_status(7, AppointmentStatus::Pending, AppointmentStatus::Cancelled)
        .await
        .unwrap();

    assert!(updated.is_none());
}

#[tokio::test]
async fn listing_normalizes_embedded_patient_shapes() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .and(query_param("fecha", "eq.2026-10-15"))
        .and(query_param("estado", "eq.Pendiente"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_with_contact(1, "2026-10-15", "08:00:00", Some("ana@uni.ac.cr"), false),
            MockSupabaseResponses::appointment_with_contact(2, "2026-10-15", "9:00", Some("luis@uni.ac.cr"), true),
            MockSupabaseResponses::appointment_with_contact(3, "2026-10-15", "09:30", None, true)
        ])))
        .mount(&mock_server)
        .await;

    let store = SupabaseClinicStore::background(&config);
    let records = store
        .list_appointments(&AppointmentQuery::pending_on(date(2026, 10, 15)))
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].notice().unwrap().email, "ana@uni.ac.cr");
    assert_eq!(records[1].notice().unwrap().email, "luis@uni.ac.cr");
    assert_eq!(records[1].appointment.start_time, time(9, 0));
    assert!(records[2].patient.is_some());
    assert!(records[2].notice().is_none());
}

#[tokio::test]
async fn server_errors_are_store_unavailable() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/paciente"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&mock_server)
        .await;

    let store = SupabaseClinicStore::new(&config, TOKEN);
    let result = store.find_patient("1-1111-1111").await;

    assert_matches!(result, Err(AppointmentError::StoreUnavailable(_)));
}

#[tokio::test]
async fn treatment_insert_uses_clinic_columns() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("POST"))
        .and(path("/rest/v1/tratamientos"))
        .and(body_partial_json(json!({ "cita": 7, "medicamentos": "Ibuprofeno 400mg c/8h" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::treatment_row(3, 7, "1-1111-1111", "2-0222-0222")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = SupabaseClinicStore::new(&config, TOKEN);
    let treatment = store
        .insert_treatment(&NewTreatment {
            appointment_id: 7,
            patient_id: "1-1111-1111".to_string(),
            dentist_id: "2-0222-0222".to_string(),
            medications: "Ibuprofeno 400mg c/8h".to_string(),
            notes: None,
            assigned_date: date(2026, 10, 20),
        })
        .await
        .unwrap();

    assert_eq!(treatment.id, 3);
    assert_eq!(treatment.appointment_id, 7);
}

#[tokio::test]
async fn treatment_delete_targets_one_row() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/tratamientos"))
        .and(query_param("id", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::treatment_row(3, 7, "1-1111-1111", "2-0222-0222")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = SupabaseClinicStore::new(&config, TOKEN);
    store.delete_treatment(3).await.unwrap();
}
