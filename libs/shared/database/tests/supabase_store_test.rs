// libs/shared/database/tests/supabase_store_test.rs

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_database::{BookingLedger, CapacitySource, ScheduleStore, StorageError, SupabaseStore};
use shared_models::scheduling::AppointmentStatus;
use shared_utils::test_utils::{date, scheduled_appointment, time, MockSupabaseResponses, TestConfig};

fn store(mock_server: &MockServer) -> SupabaseStore {
    SupabaseStore::new(&TestConfig::with_supabase_url(&mock_server.uri()).to_app_config())
}

#[tokio::test]
async fn test_weekly_rules_from_rule_rows() {
    let mock_server = MockServer::start().await;
    let doctor = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_weekly_rules"))
        .and(query_param("doctor_id", format!("eq.{}", doctor)))
        .and(header("apikey", "test-anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::weekly_rule_row(doctor, 0, true, "09:00:00", "12:00:00"),
            MockSupabaseResponses::weekly_rule_row(doctor, 2, true, "13:00:00", "17:30:00"),
        ])))
        .mount(&mock_server)
        .await;

    let rules = store(&mock_server).get_weekly_rules(doctor).await.unwrap();

    assert_eq!(rules.len(), 7);
    assert!(rules[0].is_available);
    assert_eq!((rules[0].start_time, rules[0].end_time), (time(9, 0), time(12, 0)));
    assert_eq!((rules[2].start_time, rules[2].end_time), (time(13, 0), time(17, 30)));
    assert!(!rules[1].is_available);
    assert!(!rules[6].is_available);
}

#[tokio::test]
async fn test_weekly_rules_fall_back_to_legacy_profile() {
    let mock_server = MockServer::start().await;
    let doctor = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_weekly_rules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::legacy_profile_schedule(
                json!("Monday, Wednesday"),
                json!({
                    "Monday": {"start_time": "08:00", "end_time": "11:00"},
                    "Wednesday": {"start_time": "bogus", "end_time": "11:00"}
                }),
            )
        ])))
        .mount(&mock_server)
        .await;

    let rules = store(&mock_server).get_weekly_rules(doctor).await.unwrap();

    assert_eq!(rules.len(), 7);
    assert!(rules[0].is_available);
    assert_eq!((rules[0].start_time, rules[0].end_time), (time(8, 0), time(11, 0)));
    assert!(rules[2].is_available);
    assert_eq!((rules[2].start_time, rules[2].end_time), (time(9, 0), time(17, 0)));
    assert!(!rules[1].is_available);
}

#[tokio::test]
async fn test_capacity_parsing() {
    let mock_server = MockServer::start().await;
    let limited = Uuid::new_v4();
    let broken = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", limited)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([MockSupabaseResponses::capacity_row(Some(8), false)])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", broken)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([MockSupabaseResponses::capacity_row(Some(0), true)])),
        )
        .mount(&mock_server)
        .await;

    let store = store(&mock_server);
    let capacity = store.get_capacity(limited).await.unwrap();
    assert_eq!(capacity.daily_patient_limit, Some(8));
    assert!(!capacity.accepting_appointments);

    let capacity = store.get_capacity(broken).await.unwrap();
    assert_eq!(capacity.daily_patient_limit, None);
    assert!(capacity.accepting_appointments);
}

#[tokio::test]
async fn test_capacity_for_unknown_doctor_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = store(&mock_server).get_capacity(Uuid::new_v4()).await;

    assert_matches!(result, Err(StorageError::NotFound(_)));
}

#[tokio::test]
async fn test_exceptions_are_normalized() {
    let mock_server = MockServer::start().await;
    let doctor = Uuid::new_v4();
    let exception_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_exceptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::exception_row(doctor, exception_id, date(2024, 3, 8), "Conference"),
            {"id": "not-a-uuid", "exception_date": "2024-03-09"}
        ])))
        .mount(&mock_server)
        .await;

    let exceptions = store(&mock_server).get_exceptions(doctor).await.unwrap();

    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].id, exception_id);
    assert_eq!(exceptions[0].date, date(2024, 3, 8));
    assert_eq!(exceptions[0].reason, "Conference");
    assert!(!exceptions[0].is_available);
}

#[tokio::test]
async fn test_list_appointments_filters_by_status() {
    let mock_server = MockServer::start().await;
    let doctor = Uuid::new_v4();
    let appointment = scheduled_appointment(doctor, date(2024, 1, 1), 10, 0);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor)))
        .and(query_param("appointment_date", "eq.2024-01-01"))
        .and(query_param("status", "eq.scheduled"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([MockSupabaseResponses::appointment_row(&appointment)])),
        )
        .mount(&mock_server)
        .await;

    let appointments = store(&mock_server)
        .list_appointments(doctor, date(2024, 1, 1), AppointmentStatus::Scheduled)
        .await
        .unwrap();

    assert_eq!(appointments, vec![appointment]);
}

#[tokio::test]
async fn test_insert_conflict_maps_to_duplicate() {
    let mock_server = MockServer::start().await;
    let doctor = Uuid::new_v4();
    let appointment = scheduled_appointment(doctor, date(2024, 1, 1), 10, 0);

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment"))
        .and(body_partial_json(json!({"p_time": "10:00", "p_status": "scheduled"})))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "duplicate key value violates unique constraint \"appointments_one_scheduled_per_slot\"",
            "23505",
        )))
        .mount(&mock_server)
        .await;

    let result = store(&mock_server).insert_appointment(appointment).await;

    assert_matches!(
        result,
        Err(StorageError::Duplicate { practitioner_id, time: t, .. }) if practitioner_id == doctor && t == time(10, 0)
    );
}

#[tokio::test]
async fn test_full_day_maps_to_capacity_exceeded() {
    let mock_server = MockServer::start().await;
    let doctor = Uuid::new_v4();
    let appointment = scheduled_appointment(doctor, date(2024, 1, 1), 11, 0);

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment"))
        .and(body_partial_json(json!({"p_doctor_id": doctor, "p_daily_limit": 2})))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(MockSupabaseResponses::error_response("daily_limit_reached", "PT409")),
        )
        .mount(&mock_server)
        .await;

    let result = store(&mock_server).insert_within_limit(appointment, Some(2)).await;

    assert_matches!(
        result,
        Err(StorageError::CapacityExceeded { practitioner_id, limit: 2, .. }) if practitioner_id == doctor
    );
}

#[tokio::test]
async fn test_insert_returns_stored_row() {
    let mock_server = MockServer::start().await;
    let doctor = Uuid::new_v4();
    let appointment = scheduled_appointment(doctor, date(2024, 1, 1), 10, 30);

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([MockSupabaseResponses::appointment_row(&appointment)])),
        )
        .mount(&mock_server)
        .await;

    let saved = store(&mock_server).insert_appointment(appointment.clone()).await.unwrap();

    assert_eq!(saved, appointment);
}

#[tokio::test]
async fn test_server_errors_surface_as_request_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_exceptions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let result = store(&mock_server).get_exceptions(Uuid::new_v4()).await;

    assert_matches!(result, Err(StorageError::Request(msg)) if msg.contains("500"));
}

#[tokio::test]
async fn test_delete_missing_exception_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/doctor_exceptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = store(&mock_server)
        .delete_exception(Uuid::new_v4(), Uuid::new_v4())
        .await;

    assert_matches!(result, Err(StorageError::NotFound(_)));
}
