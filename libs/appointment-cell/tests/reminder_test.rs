use std::sync::Arc;

use assert_matches::assert_matches;

use appointment_cell::models::*;
use appointment_cell::services::reminder::ReminderSweepService;
use appointment_cell::test_utils::{
    date, fixed_context, patient, pending_appointment, time, InMemoryClinicStore, RecordingDispatcher,
};

const DENTIST: &str = "2-0222-0222";

/// Three Pending appointments tomorrow, two of them for patients with email.
async fn tomorrow_fixture() -> Arc<InMemoryClinicStore> {
    let store = Arc::new(InMemoryClinicStore::new());
    let tomorrow = date(2026, 10, 15);

    store.add_patient(patient("1-0001-0000", Some("ana@uni.ac.cr"), true)).await;
    store.add_patient(patient("1-0002-0000", Some("luis@uni.ac.cr"), true)).await;
    store.add_patient(patient("1-0003-0000", None, true)).await;

    store.seed_appointment(pending_appointment("1-0001-0000", DENTIST, tomorrow, time(8, 0), AppointmentType::Revision)).await;
    store.seed_appointment(pending_appointment("1-0002-0000", DENTIST, tomorrow, time(9, 0), AppointmentType::Operative)).await;
    store.seed_appointment(pending_appointment("1-0003-0000", DENTIST, tomorrow, time(10, 0), AppointmentType::Urgent)).await;

    // Not candidates: other days, or no longer pending.
    store.seed_appointment(pending_appointment("1-0001-0000", DENTIST, date(2026, 10, 14), time(8, 0), AppointmentType::Revision)).await;
    store.seed_appointment(pending_appointment("1-0001-0000", DENTIST, date(2026, 10, 16), time(8, 0), AppointmentType::Revision)).await;
    let mut cancelled = pending_appointment("1-0002-0000", DENTIST, tomorrow, time(13, 0), AppointmentType::Revision);
    cancelled.status = AppointmentStatus::Cancelled;
    store.seed_appointment(cancelled).await;

    store
}

#[tokio::test]
async fn reminds_every_patient_with_email() {
    let store = tomorrow_fixture().await;
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let context = fixed_context(store, dispatcher.clone(), date(2026, 10, 14));

    let report = ReminderSweepService::new(&context).run().await.unwrap();

    assert_eq!(report.date, date(2026, 10, 15));
    assert_eq!(report.candidates, 3);
    assert_eq!(report.sent, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);

    let mut recipients: Vec<String> = dispatcher.sent().await.into_iter().map(|m| m.to).collect();
    recipients.sort();
    assert_eq!(recipients, vec!["ana@uni.ac.cr", "luis@uni.ac.cr"]);

    let sent = dispatcher.sent().await;
    let message = &sent[0];
    assert_eq!(message.subject, "Recordatorio de cita odontológica");
    assert!(message.text.contains("2026-10-15"));
    assert!(message.html.is_some());
}

#[tokio::test]
async fn failed_sends_are_counted_apart() {
    let store = tomorrow_fixture().await;
    let dispatcher = Arc::new(RecordingDispatcher::new());
    dispatcher.fail_for("luis@uni.ac.cr").await;
    let context = fixed_context(store, dispatcher.clone(), date(2026, 10, 14));

    let report = ReminderSweepService::new(&context).run().await.unwrap();

    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn rerun_sends_again() {
    let store = tomorrow_fixture().await;
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let context = fixed_context(store, dispatcher.clone(), date(2026, 10, 14));
    let sweep = ReminderSweepService::new(&context);

    sweep.run().await.unwrap();
    sweep.run().await.unwrap();

    assert_eq!(dispatcher.sent().await.len(), 4);
}

#[tokio::test]
async fn friday_sweep_targets_saturday() {
    let store = tomorrow_fixture().await;
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let context = fixed_context(store, dispatcher.clone(), date(2026, 10, 16));

    let report = ReminderSweepService::new(&context).run().await.unwrap();

    assert_eq!(report.date, date(2026, 10, 17));
    assert_eq!(report.candidates, 0);
    assert!(dispatcher.sent().await.is_empty());
}

#[tokio::test]
async fn fetch_failure_aborts_the_sweep() {
    let store = tomorrow_fixture().await;
    store.go_offline();
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let context = fixed_context(store, dispatcher.clone(), date(2026, 10, 14));

    let result = ReminderSweepService::new(&context).run().await;

    assert_matches!(result, Err(AppointmentError::StoreUnavailable(_)));
    assert!(dispatcher.sent().await.is_empty());
}
