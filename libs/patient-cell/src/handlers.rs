use std::sync::Arc;

use axum::{
    extract::{State, Extension},
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_patient;
use shared_utils::response::ok;

use crate::models::UpdatePatientRequest;
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn get_my_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;
    let patient_id = patient_id(&user)?;

    let patient = PatientService::new(&config).get_patient(patient_id).await?;

    Ok(ok(patient, "Profile fetched successfully"))
}

#[axum::debug_handler]
pub async fn update_my_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;
    let patient_id = patient_id(&user)?;

    let patient = PatientService::new(&config).update_patient(patient_id, request).await?;

    Ok(ok(patient, "Profile updated successfully"))
}

fn patient_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Token subject is not a valid id".to_string()))
}
