use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_doctor;
use shared_utils::response::ok;

use crate::models::{DoctorSearchQuery, UpdateDoctorRequest};
use crate::services::{AvailabilityService, DoctorService};

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn search_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let result = doctor_service.search_doctors(query).await?;

    Ok(ok(result, "Doctors fetched successfully"))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.get_doctor(doctor_id).await?;

    Ok(ok(doctor, "Doctor details fetched successfully"))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let slots = availability_service.get_available_slots(doctor_id, query.date).await?;

    Ok(ok(slots, "Slots fetched successfully"))
}

// ==============================================================================
// DOCTOR-ONLY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_my_profile(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;
    let doctor_id = parse_user_id(&user)?;

    let doctor = DoctorService::new(&state).get_doctor_any(doctor_id).await?;

    Ok(ok(doctor, "Profile fetched successfully"))
}

#[axum::debug_handler]
pub async fn update_my_profile(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;
    let doctor_id = parse_user_id(&user)?;

    let doctor = DoctorService::new(&state).update_profile(doctor_id, request).await?;

    Ok(ok(doctor, "Profile updated successfully"))
}

fn parse_user_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Token subject is not a valid id".to_string()))
}
