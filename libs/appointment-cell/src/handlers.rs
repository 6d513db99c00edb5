// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{require_doctor, require_patient};
use shared_utils::response::ok;

use crate::models::{
    AppointmentListQuery, BookAppointmentRequest, BookedSlotsQuery, CancelAppointmentRequest,
    UpdateStatusRequest,
};
use crate::services::booking::AppointmentBookingService;

fn user_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Token subject is not a valid id".to_string()))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_patient(&user)?;
    let patient_id = user_uuid(&user)?;

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.book_appointment(patient_id, request).await?;

    Ok((StatusCode::CREATED, ok(appointment, "Appointment booked successfully")))
}

#[axum::debug_handler]
pub async fn get_booked_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<BookedSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let booked = booking_service.booked_slots(doctor_id, query.date).await?;

    Ok(ok(booked, "Booked slots fetched successfully"))
}

// ==============================================================================
// APPOINTMENT QUERIES
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointments = booking_service.list_appointments(&user, query).await?;

    Ok(ok(json!({
        "appointments": appointments,
        "total": appointments.len(),
    }), "Appointments fetched successfully"))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.get_appointment_for(&user, appointment_id).await?;

    Ok(ok(appointment, "Appointment fetched successfully"))
}

// ==============================================================================
// LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.update_status(&user, appointment_id, request).await?;

    Ok(ok(appointment, "Appointment status updated successfully"))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    request: Option<Json<CancelAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.cancel_appointment(&user, appointment_id, request).await?;

    Ok(ok(appointment, "Appointment cancelled successfully"))
}
