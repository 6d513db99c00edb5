// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::DoctorError;
use shared_database::DatabaseError;
use shared_models::error::AppError;

pub const APPOINTMENT_COLUMNS: &str = "id,doctor_id,patient_id,date,slot_start,slot_end,consultation_type,status,symptoms,consultation_fees,platform_fees,total_amount,payment_status,payment_order_id,payment_id,paid_at,prescription,notes,cancellation_reason,created_at,updated_at";

/// Appointment columns plus the embedded names of both participants.
pub const APPOINTMENT_LISTING_COLUMNS: &str = "id,doctor_id,patient_id,date,slot_start,slot_end,consultation_type,status,symptoms,consultation_fees,platform_fees,total_amount,payment_status,payment_order_id,payment_id,paid_at,prescription,notes,cancellation_reason,created_at,updated_at,doctor:doctors(name),patient:patients(name)";

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub consultation_type: ConsultationType,
    pub status: AppointmentStatus,
    pub symptoms: Option<String>,
    pub consultation_fees: f64,
    pub platform_fees: f64,
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub payment_order_id: Option<String>,
    pub payment_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<Participant>,
}

impl Appointment {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.doctor_id.to_string() == user_id || self.patient_id.to_string() == user_id
    }

    pub fn doctor_name(&self) -> Option<&str> {
        self.doctor.as_ref().map(|p| p.name.as_str())
    }

    pub fn patient_name(&self) -> Option<&str> {
        self.patient.as_ref().map(|p| p.name.as_str())
    }
}

/// Name of the other side of an appointment, embedded by PostgREST.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConsultationType {
    #[serde(rename = "Video Consultation")]
    VideoConsultation,
    #[serde(rename = "Voice Call")]
    VoiceCall,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    Scheduled,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::InProgress => "In Progress",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Refunded => "Refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub consultation_type: ConsultationType,
    pub symptoms: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
    pub prescription: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentScope {
    Upcoming,
    Past,
    #[default]
    All,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<AppointmentStatus>,
    pub scope: Option<AppointmentScope>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedSlotsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedSlotsResponse {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub booked_slots: Vec<DateTime<Utc>>,
}

/// Fee breakdown stored on an appointment at booking time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub consultation_fees: f64,
    pub platform_fees: f64,
    pub total_amount: f64,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor is not accepting appointments")]
    DoctorUnavailable,

    #[error("This slot has already been booked")]
    SlotAlreadyBooked,

    #[error("Requested time is not one of the doctor's slots")]
    SlotNotOffered,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment cannot be cancelled: {0}")]
    CancellationNotAllowed(String),

    #[error("Appointment was modified by another request")]
    StaleStatus,

    #[error("{0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl From<DatabaseError> for AppointmentError {
    fn from(err: DatabaseError) -> Self {
        // The only unique index on appointments is the live-slot index.
        if err.is_unique_violation() {
            AppointmentError::SlotAlreadyBooked
        } else {
            AppointmentError::Database(err)
        }
    }
}

impl From<DoctorError> for AppointmentError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppointmentError::DoctorNotFound,
            DoctorError::Inactive => AppointmentError::DoctorUnavailable,
            DoctorError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            DoctorError::Database(e) => AppointmentError::Database(e),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound | AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::SlotAlreadyBooked | AppointmentError::StaleStatus => AppError::Conflict(err.to_string()),
            AppointmentError::DoctorUnavailable
            | AppointmentError::SlotNotOffered
            | AppointmentError::InvalidTime(_)
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::CancellationNotAllowed(_) => AppError::BadRequest(err.to_string()),
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
