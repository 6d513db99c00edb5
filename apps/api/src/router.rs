use std::sync::Arc;

use axum::{
    Json,
    Router,
    routing::get,
};
use chrono::Utc;
use serde_json::{json, Value};

use appointment_cell::appointment_routes;
use auth_cell::auth_routes;
use doctor_cell::router::doctor_routes;
use notification_cell::notification_routes;
use patient_cell::patient_routes;
use payment_cell::payment_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "MediCare API is running!" }))
        .route("/health", get(health))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/payments", payment_routes(state.clone()))
        .nest("/notifications", notification_routes(state))
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "OK",
        "data": { "time": Utc::now().to_rfc3339() }
    }))
}
