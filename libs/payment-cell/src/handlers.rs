use std::sync::Arc;

use axum::{
    extract::{State, Extension},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_patient;
use shared_utils::response::ok;

use crate::models::{CreateOrderRequest, VerifyPaymentRequest};
use crate::services::PaymentService;

#[axum::debug_handler]
pub async fn create_order(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_patient(&user)?;

    let order = PaymentService::new(&config).create_order(&user, request.appointment_id).await?;

    Ok((StatusCode::CREATED, ok(order, "Payment order created")))
}

#[axum::debug_handler]
pub async fn verify_payment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let receipt = PaymentService::new(&config).verify_payment(&user, request).await?;

    Ok(ok(receipt, "Payment verified successfully"))
}
