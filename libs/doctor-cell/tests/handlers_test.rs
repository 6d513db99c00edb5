// libs/doctor-cell/tests/handlers_test.rs

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, Path, Query, State},
    http::{Request, StatusCode},
    Json,
};
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::handlers::*;
use doctor_cell::models::{DoctorSearchQuery, Specialization, UpdateDoctorRequest};
use doctor_cell::router::doctor_routes;
use shared_models::error::AppError;
use shared_utils::test_utils::{MockRows, TestConfig, TestUser};

async fn mount_doctor(server: &MockServer, doctor: serde_json::Value) {
    let id = doctor["id"].as_str().unwrap().to_string();
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([doctor])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_search_doctors_returns_page_and_total() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("is_active", "eq.true"))
        .and(query_param("specialization", "eq.General Physician"))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "2-3/5")
                .set_body_json(json!([
                    MockRows::doctor(&Uuid::new_v4().to_string(), "Dr. Mehta", 400.0),
                    MockRows::doctor(&Uuid::new_v4().to_string(), "Dr. Iyer", 700.0),
                ])),
        )
        .mount(&mock_server)
        .await;

    let query = DoctorSearchQuery {
        specialization: Some(Specialization::GeneralPhysician),
        page: Some(2),
        limit: Some(2),
        ..Default::default()
    };

    let response = search_doctors(State(config), Query(query)).await.unwrap().0;

    assert_eq!(response["success"], true);
    assert_eq!(response["data"]["doctors"].as_array().unwrap().len(), 2);
    assert_eq!(response["data"]["pagination"]["total"], 5);
    assert_eq!(response["data"]["pagination"]["total_pages"], 3);
    assert!(response["data"]["doctors"][0].get("password_hash").is_none());
}

#[tokio::test]
async fn test_search_rejects_inverted_fee_range() {
    let config = TestConfig::default().to_arc();
    let query = DoctorSearchQuery {
        min_fees: Some(900.0),
        max_fees: Some(100.0),
        ..Default::default()
    };

    let result = search_doctors(State(config), Query(query)).await;

    assert!(matches!(result, Err(AppError::ValidationError(_))));
}

#[tokio::test]
async fn test_get_doctor_not_found() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = get_doctor(State(config), Path(Uuid::new_v4())).await;

    match result {
        Err(AppError::NotFound(msg)) => assert_eq!(msg, "Doctor not found"),
        other => panic!("Expected NotFound, got {:?}", other.map(|j| j.0)),
    }
}

#[tokio::test]
async fn test_inactive_doctor_is_hidden() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();
    let doctor_id = Uuid::new_v4();

    let mut row = MockRows::doctor(&doctor_id.to_string(), "Dr. Retired", 300.0);
    row["is_active"] = json!(false);
    mount_doctor(&mock_server, row).await;

    let result = get_doctor(State(config), Path(doctor_id)).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_slots_flag_booked_start() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();
    let doctor_id = Uuid::new_v4();
    let date = NaiveDate::from_ymd_opt(2030, 5, 6).unwrap();
    let booked_start = Utc.with_ymd_and_hms(2030, 5, 6, 9, 30, 0).unwrap();

    mount_doctor(&mock_server, MockRows::doctor(&doctor_id.to_string(), "Dr. Rao", 500.0)).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("date", "eq.2030-05-06"))
        .and(query_param("status", "neq.Cancelled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "slot_start": booked_start.to_rfc3339() }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = get_available_slots(State(config), Path(doctor_id), Query(SlotQuery { date }))
        .await
        .unwrap()
        .0;

    let slots = response["data"]["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 6);
    let unavailable: Vec<&serde_json::Value> = slots.iter().filter(|s| s["available"] == false).collect();
    assert_eq!(unavailable.len(), 1);
    assert_eq!(unavailable[0]["start"], json!(booked_start));
    assert_eq!(response["data"]["slot_duration_minutes"], 30);
}

#[tokio::test]
async fn test_update_profile_requires_doctor_role() {
    let config = TestConfig::default().to_arc();
    let patient = TestUser::patient("patient@example.com");

    let request = UpdateDoctorRequest {
        fees: Some(900.0),
        ..Default::default()
    };

    let result = update_my_profile(State(config), Extension(patient.to_user()), Json(request)).await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_update_profile_patches_own_row() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();
    let doctor_id = Uuid::new_v4().to_string();
    let doctor = TestUser::doctor("doc@example.com").with_id(&doctor_id);

    let mut updated = MockRows::doctor(&doctor_id, "Dr. Rao", 650.0);
    updated["slot_duration_minutes"] = json!(15);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = UpdateDoctorRequest {
        fees: Some(650.0),
        slot_duration_minutes: Some(15),
        ..Default::default()
    };

    let response = update_my_profile(State(config), Extension(doctor.to_user()), Json(request))
        .await
        .unwrap()
        .0;

    assert_eq!(response["data"]["fees"], 650.0);
    assert_eq!(response["data"]["slot_duration_minutes"], 15);
}

#[tokio::test]
async fn test_router_protects_own_profile() {
    let config = TestConfig::default().to_arc();
    let app = doctor_routes(Arc::clone(&config));

    let response = app
        .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
