use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::PaymentStatus;
use shared_database::DatabaseError;
use shared_models::error::AppError;

pub const ORDER_CURRENCY: &str = "INR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub appointment_id: Uuid,
}

/// Order handed to the client-side checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentOrder {
    pub order_id: String,
    pub appointment_id: Uuid,
    /// Amount in minor currency units (paise).
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
    pub key_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentReceipt {
    pub appointment_id: Uuid,
    pub order_id: String,
    pub payment_id: String,
    pub payment_status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment gateway is not configured")]
    NotConfigured,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("No appointment is waiting on this order")]
    OrderNotFound,

    #[error("Appointment has already been paid")]
    AlreadyPaid,

    #[error("Cancelled appointments cannot be paid")]
    AppointmentCancelled,

    #[error("Payment verification failed")]
    InvalidSignature,

    #[error("Appointment changed while the payment was being processed")]
    Superseded,

    #[error("{0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotConfigured => AppError::ExternalService(err.to_string()),
            PaymentError::AppointmentNotFound | PaymentError::OrderNotFound => AppError::NotFound(err.to_string()),
            PaymentError::AlreadyPaid
            | PaymentError::AppointmentCancelled
            | PaymentError::InvalidSignature => AppError::BadRequest(err.to_string()),
            PaymentError::Superseded => AppError::Conflict(err.to_string()),
            PaymentError::Forbidden(msg) => AppError::Forbidden(msg),
            PaymentError::ValidationError(msg) => AppError::ValidationError(msg),
            PaymentError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
