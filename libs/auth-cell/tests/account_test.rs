use assert_matches::assert_matches;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::handlers::{change_password, login, me, register};
use auth_cell::models::{ChangePasswordRequest, LoginRequest, RegisterRequest};
use auth_cell::services::PasswordService;
use shared_models::error::AppError;
use shared_utils::jwt::validate_token;
use shared_utils::test_utils::{MockRows, TestConfig, TestUser};

fn account_row(id: &str, email: &str, password: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": "Asha Rao",
        "email": email,
        "password_hash": PasswordService::hash_password(password).unwrap(),
        "is_active": true
    })
}

#[tokio::test]
async fn test_register_patient_issues_token() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();
    let id = Uuid::new_v4().to_string();

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .and(body_partial_json(json!({ "email": "asha@example.com", "name": "Asha Rao" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "id": id, "name": "Asha Rao", "email": "asha@example.com", "password_hash": "$argon2id$stub" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = RegisterRequest {
        name: " Asha Rao ".to_string(),
        email: "Asha@Example.com".to_string(),
        password: "longenough".to_string(),
    };

    let (status, Json(body)) = register(State(config.clone()), Path("patient".to_string()), Json(request))
        .await
        .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["user_type"], "patient");
    let user = validate_token(body["data"]["token"].as_str().unwrap(), &config.jwt_secret).unwrap();
    assert_eq!(user.id, id);
    assert!(user.is_patient());
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockRows::error(
            "23505",
            "duplicate key value violates unique constraint \"doctors_email_key\"",
        )))
        .mount(&mock_server)
        .await;

    let request = RegisterRequest {
        name: "Dr. Rao".to_string(),
        email: "rao@clinic.in".to_string(),
        password: "longenough".to_string(),
    };

    let result = register(State(config), Path("doctor".to_string()), Json(request)).await;

    assert_matches!(result, Err(AppError::Conflict(msg)) if msg.contains("already exists"));
}

#[tokio::test]
async fn test_register_validates_input_before_storage() {
    let config = TestConfig::default().to_arc();

    let short_password = RegisterRequest {
        name: "Asha".to_string(),
        email: "asha@example.com".to_string(),
        password: "short".to_string(),
    };
    let result = register(State(config.clone()), Path("patient".to_string()), Json(short_password)).await;
    assert_matches!(result, Err(AppError::ValidationError(_)));

    let bad_email = RegisterRequest {
        name: "Asha".to_string(),
        email: "asha@".to_string(),
        password: "longenough".to_string(),
    };
    let result = register(State(config.clone()), Path("patient".to_string()), Json(bad_email)).await;
    assert_matches!(result, Err(AppError::ValidationError(_)));

    let admin = RegisterRequest {
        name: "Root".to_string(),
        email: "root@example.com".to_string(),
        password: "longenough".to_string(),
    };
    let result = register(State(config), Path("admin".to_string()), Json(admin)).await;
    assert_matches!(result, Err(AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_login_checks_password() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();
    let id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("email", "eq.asha@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            account_row(&id, "asha@example.com", "right-password")
        ])))
        .mount(&mock_server)
        .await;

    let good = LoginRequest { email: "asha@example.com".to_string(), password: "right-password".to_string() };
    let body = login(State(config.clone()), Path("patient".to_string()), Json(good)).await.unwrap().0;
    assert_eq!(body["data"]["user"]["id"], id);

    let bad = LoginRequest { email: "asha@example.com".to_string(), password: "wrong-password".to_string() };
    let result = login(State(config), Path("patient".to_string()), Json(bad)).await;
    assert_matches!(result, Err(AppError::Auth(msg)) if msg == "Invalid credentials");
}

#[tokio::test]
async fn test_login_unknown_email_is_invalid_credentials() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = LoginRequest { email: "ghost@clinic.in".to_string(), password: "whatever1".to_string() };
    let result = login(State(config), Path("doctor".to_string()), Json(request)).await;

    assert_matches!(result, Err(AppError::Auth(_)));
}

#[tokio::test]
async fn test_inactive_doctor_cannot_login() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    let mut row = account_row(&Uuid::new_v4().to_string(), "rao@clinic.in", "right-password");
    row["is_active"] = json!(false);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    let request = LoginRequest { email: "rao@clinic.in".to_string(), password: "right-password".to_string() };
    let result = login(State(config), Path("doctor".to_string()), Json(request)).await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_me_returns_doctor_profile() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();
    let id = Uuid::new_v4().to_string();
    let doctor = TestUser::doctor("rao@clinic.in").with_id(&id);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::doctor(&id, "Dr. Rao", 500.0)
        ])))
        .mount(&mock_server)
        .await;

    let body = me(State(config), Extension(doctor.to_user())).await.unwrap().0;

    assert_eq!(body["data"]["user_type"], "doctor");
    assert_eq!(body["data"]["profile"]["name"], "Dr. Rao");
}

#[tokio::test]
async fn test_change_password_requires_current_password() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();
    let id = Uuid::new_v4().to_string();
    let patient = TestUser::patient("asha@example.com").with_id(&id);

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            account_row(&id, "asha@example.com", "old-password")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            account_row(&id, "asha@example.com", "new-password")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let wrong = ChangePasswordRequest {
        current_password: "not-the-password".to_string(),
        new_password: "new-password".to_string(),
    };
    let result = change_password(State(config.clone()), Extension(patient.to_user()), Json(wrong)).await;
    assert_matches!(result, Err(AppError::Auth(_)));

    let same = ChangePasswordRequest {
        current_password: "old-password".to_string(),
        new_password: "old-password".to_string(),
    };
    let result = change_password(State(config.clone()), Extension(patient.to_user()), Json(same)).await;
    assert_matches!(result, Err(AppError::ValidationError(_)));

    let good = ChangePasswordRequest {
        current_password: "old-password".to_string(),
        new_password: "new-password".to_string(),
    };
    let body = change_password(State(config), Extension(patient.to_user()), Json(good)).await.unwrap().0;
    assert_eq!(body["success"], true);
}
